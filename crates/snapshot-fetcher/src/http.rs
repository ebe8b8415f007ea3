//! HTTP Snapshot Fetcher

use crate::{parse_snapshot_body, FetchError, SnapshotSource};
use anomaly_detector::SensorSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Header carrying the data source credential
pub const API_KEY_HEADER: &str = "x-api-key";

/// Default request timeout in milliseconds
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Latest-snapshot endpoint URL
    #[serde(default)]
    pub endpoint: String,
    /// Credential sent as `x-api-key`
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Fetches the latest snapshot with a single GET per call
pub struct HttpSnapshotFetcher {
    config: FetcherConfig,
    client: reqwest::Client,
}

impl HttpSnapshotFetcher {
    /// Create a new fetcher. Fails if the HTTP client cannot be built.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        info!("Creating snapshot fetcher for endpoint: {}", config.endpoint);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| FetchError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotFetcher {
    async fn fetch_snapshot(&self) -> Result<SensorSnapshot, FetchError> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(FetchError::Configuration("API key is not set".to_string())),
        };
        if self.config.endpoint.is_empty() {
            return Err(FetchError::Configuration("endpoint is not set".to_string()));
        }

        debug!("Fetching latest snapshot from {}", self.config.endpoint);

        let response = self
            .client
            .get(&self.config.endpoint)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport {
                status: Some(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let body = response.bytes().await?;
        let snapshot = parse_snapshot_body(&body)?;
        debug!(
            timestamp = %snapshot.timestamp,
            metrics = snapshot.metrics.len(),
            "Snapshot received"
        );
        Ok(snapshot)
    }
}
