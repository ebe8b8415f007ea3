//! Alert Configuration

use serde::{Deserialize, Serialize};

/// Lower bound for the default dedup retention (one hour)
const MIN_DEFAULT_RETENTION_MS: u64 = 3_600_000;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum time between two alerts sharing metric and severity (ms)
    pub cooldown_ms: u64,
    /// Minimum time between any two alerts (ms)
    pub global_cooldown_ms: u64,
    /// Time a displayed alert stays visible (ms)
    pub auto_hide_delay_ms: u64,
    /// Maximum number of alerts visible at once
    pub max_alerts: usize,
    /// How long exact-duplicate keys are remembered (ms)
    pub dedup_retention_ms: Option<u64>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 180_000,       // 3 minutes
            global_cooldown_ms: 60_000, // 1 minute
            auto_hide_delay_ms: 60_000,
            max_alerts: 3,
            dedup_retention_ms: None,
        }
    }
}

impl AlertConfig {
    /// Effective dedup retention: the configured value, or four times the
    /// longest cooldown with a one hour floor. Never shorter than the
    /// longest cooldown.
    pub fn dedup_retention(&self) -> u64 {
        let longest = self.cooldown_ms.max(self.global_cooldown_ms);
        match self.dedup_retention_ms {
            Some(retention) => retention.max(longest),
            None => longest
                .saturating_mul(4)
                .max(MIN_DEFAULT_RETENTION_MS),
        }
    }
}
