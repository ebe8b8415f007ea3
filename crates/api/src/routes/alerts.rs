//! Alert Routes

use alerting::DisplayedAlert;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Further cap below the configured maximum
    pub limit: Option<usize>,
}

/// Response for alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub data: Vec<DisplayedAlert>,
    pub count: usize,
    pub max_alerts: usize,
}

/// Get currently visible alerts, oldest first
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertQuery>,
) -> Json<AlertResponse> {
    let max_alerts = state.pipeline.max_alerts();
    let limit = params.limit.unwrap_or(max_alerts).min(max_alerts);

    let mut data = state.pipeline.visible_alerts();
    data.truncate(limit);

    Json(AlertResponse {
        count: data.len(),
        max_alerts,
        data,
    })
}

/// Dismiss a displayed alert
pub async fn dismiss_alert(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.pipeline.dismiss(&alert_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::AlertNotFound(alert_id))
    }
}

/// Server-sent events carrying the visible alert list on every change
pub async fn stream_alerts(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut rx = state.pipeline.subscribe();
    let initial = rx.borrow_and_update().clone();

    let updates = stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let alerts = rx.borrow_and_update().clone();
        Some((alerts, rx))
    });

    let events = stream::once(async move { initial })
        .chain(updates)
        .map(|alerts| Event::default().event("alerts").json_data(alerts));

    Sse::new(events).keep_alive(KeepAlive::default())
}
