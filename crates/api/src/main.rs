//! Environmental Alert Pipeline - Main Entry Point
//!
//! Usage: `environ-alerts [settings.toml]`. Every setting can also be
//! given as `ENVIRON_ALERTS__<FIELD>` in the environment.

use alert_pipeline::PipelineSettings;
use anyhow::Context;
use api::{init_logging, run_server};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("=== Environ Alerts v{} ===", env!("CARGO_PKG_VERSION"));

    let settings_path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = PipelineSettings::load(settings_path.as_deref())
        .context("Failed to load pipeline settings")?;
    info!("Polling {} every {}ms", settings.fetcher.endpoint, settings.interval_ms);

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus recorder not installed: {}", e);
            None
        }
    };

    run_server(&settings, metrics)
        .await
        .context("API server failed")?;

    info!("Shutdown complete");
    Ok(())
}
