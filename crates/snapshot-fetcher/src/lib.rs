//! Snapshot Fetcher
//!
//! Retrieves the latest sensor snapshot from an HTTP data source.
//! Each call performs exactly one request: no caching, no retries.

mod error;
mod http;
mod wire;

pub use error::FetchError;
pub use http::{FetcherConfig, HttpSnapshotFetcher, API_KEY_HEADER};
pub use wire::parse_snapshot_body;

use anomaly_detector::SensorSnapshot;
use async_trait::async_trait;

/// Source of the latest sensor reading
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch one snapshot
    async fn fetch_snapshot(&self) -> Result<SensorSnapshot, FetchError>;
}
