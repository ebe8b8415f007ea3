//! Pipeline Status Routes

use alert_pipeline::PipelineStatus;
use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;

/// Body of the visibility endpoint
#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub foreground: bool,
}

/// Diagnostic status, including the last fetch error
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<PipelineStatus> {
    Json(state.pipeline.status())
}

/// Pause or resume scheduled polling from the hosting view
pub async fn set_visibility(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VisibilityRequest>,
) -> Json<PipelineStatus> {
    state.pipeline.set_foreground(request.foreground);
    Json(state.pipeline.status())
}
