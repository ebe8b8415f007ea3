//! Environmental Alert API Server
//!
//! HTTP boundary of the alert pipeline: visible alerts, dismissal,
//! a live alert stream and diagnostics for the dashboard.

use alert_pipeline::{AlertPipeline, PipelineSettings};
use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod auth;
mod error;
pub mod rate_limit;
mod routes;

pub use error::ApiError;
use rate_limit::{create_governor_config, RateLimitConfig};

/// Application state shared across handlers
pub struct AppState {
    /// The running alert pipeline
    pub pipeline: Arc<AlertPipeline>,
    /// Required inbound `x-api-key`, if any
    pub api_key: Option<String>,
    /// Prometheus handle for `/metrics`
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(pipeline: Arc<AlertPipeline>, api_key: Option<String>) -> Self {
        Self {
            pipeline,
            api_key: api_key.filter(|key| !key.is_empty()),
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub pipeline: ComponentHealth,
    pub fetcher: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub last_activity_ms: Option<u64>,
}

/// Create the application router.
///
/// Rate limiting is applied when `rate_limit` is given; it needs peer
/// addresses, see [`rate_limit::create_governor_config`].
pub fn create_router(state: Arc<AppState>, rate_limit: Option<&RateLimitConfig>) -> Router {
    let protected = Router::new()
        .route("/api/v1/alerts", get(routes::alerts::list_alerts))
        .route("/api/v1/alerts/stream", get(routes::alerts::stream_alerts))
        .route("/api/v1/alerts/:id", delete(routes::alerts::dismiss_alert))
        .route("/api/v1/status", get(routes::status::get_status))
        .route("/api/v1/visibility", post(routes::status::set_visibility))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    let mut router = Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    if let Some(config) = rate_limit.and_then(create_governor_config) {
        router = router.layer(GovernorLayer { config });
    }

    router.with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let status = state.pipeline.status();

    let pipeline_status = if !status.enabled {
        "disabled"
    } else if status.foreground {
        "ok"
    } else {
        "paused"
    };
    let fetcher_status = match status.last_error_kind {
        None => "ok",
        Some(_) => "degraded",
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            pipeline: ComponentHealth {
                status: pipeline_status.to_string(),
                last_activity_ms: None,
            },
            fetcher: ComponentHealth {
                status: fetcher_status.to_string(),
                last_activity_ms: status.last_success_at_ms,
            },
        },
    })
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(ApiError::MetricsUnavailable)
}

/// Initialize logging. `RUST_LOG` overrides the default `info` filter.
pub fn init_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Run the pipeline and the server until Ctrl-C
pub async fn run_server(
    settings: &PipelineSettings,
    metrics: Option<PrometheusHandle>,
) -> std::io::Result<()> {
    let pipeline = AlertPipeline::from_settings(settings)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let pipeline = Arc::new(pipeline);
    let mut state = AppState::new(pipeline.clone(), settings.server.api_key.clone());
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    let poller = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.run().await }
    });

    let rate_limit = RateLimitConfig::from(&settings.server);
    let app = create_router(Arc::new(state), Some(&rate_limit));

    info!("Starting API server on {}", settings.server.bind_addr);
    let listener = tokio::net::TcpListener::bind(&settings.server.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown requested");
    })
    .await?;

    pipeline.shutdown();
    let _ = poller.await;
    Ok(())
}
