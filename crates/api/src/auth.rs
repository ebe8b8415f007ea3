//! API Key Guard

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use snapshot_fetcher::API_KEY_HEADER;
use std::sync::Arc;
use tracing::debug;

use crate::{ApiError, AppState};

/// Reject requests without the configured `x-api-key`. No-op when unset.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.api_key.as_deref() {
        let provided = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected) {
            debug!("Rejected request to {}: bad API key", request.uri().path());
            return Err(ApiError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}
