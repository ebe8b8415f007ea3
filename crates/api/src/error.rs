//! API Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors returned by API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or wrong `x-api-key`
    #[error("Missing or invalid API key")]
    Unauthorized,

    /// No displayed alert with this id
    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    /// Prometheus recorder was not installed
    #[error("Metrics exporter is not installed")]
    MetricsUnavailable,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::AlertNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MetricsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}
