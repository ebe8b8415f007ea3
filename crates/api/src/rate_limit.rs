//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-IP rate limiting of the alert API using tower_governor.

use alert_pipeline::ServerSettings;
use governor::middleware::StateInformationMiddleware;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tracing::warn;

/// Governor config keyed by peer IP, with X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Seconds per replenished request
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 1,
            burst_size: 10,
        }
    }
}

impl From<&ServerSettings> for RateLimitConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            per_second: settings.rate_limit_per_second,
            burst_size: settings.rate_limit_burst,
        }
    }
}

/// Build the governor config. `None` when the quota is unusable (zero).
///
/// Requires the service to be served with
/// `into_make_service_with_connect_info::<SocketAddr>()` for IP extraction.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<DefaultGovernorConfig>> {
    let built = GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish();

    if built.is_none() {
        warn!("Rate limiting disabled: invalid quota {:?}", config);
    }
    built.map(Arc::new)
}
