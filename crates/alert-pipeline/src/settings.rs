//! Pipeline Settings
//!
//! Loaded from an optional TOML file, then `ENVIRON_ALERTS__*` environment
//! variables (`__` separates nesting levels, e.g.
//! `ENVIRON_ALERTS__FETCHER__API_KEY`).

use crate::ConfigError;
use alerting::AlertConfig;
use anomaly_detector::{MetricType, ThresholdBand, ThresholdSet};
use serde::{Deserialize, Serialize};
use snapshot_fetcher::FetcherConfig;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ENVIRON_ALERTS";

/// Default settings file name (extension resolved by `config`)
const DEFAULT_FILE: &str = "environ-alerts";

/// HTTP server settings for the presentation boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
    /// Required `x-api-key` for API routes, when set
    pub api_key: Option<String>,
    /// Seconds per replenished request
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            api_key: None,
            rate_limit_per_second: 1,
            rate_limit_burst: 10,
        }
    }
}

/// All pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Poll interval (ms)
    pub interval_ms: u64,
    /// Display time of an alert (ms)
    pub auto_hide_delay_ms: u64,
    pub max_alerts: usize,
    /// Per (metric, severity) cooldown (ms)
    pub cooldown_ms: u64,
    /// Cooldown across all alerts (ms)
    pub global_cooldown_ms: u64,
    /// When false the pipeline never polls
    pub enabled: bool,
    /// Per-metric band overrides keyed by metric name
    pub thresholds: BTreeMap<String, ThresholdBand>,
    pub dedup_retention_ms: Option<u64>,
    pub fetcher: FetcherConfig,
    pub server: ServerSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let alerts = AlertConfig::default();
        Self {
            interval_ms: 60_000,
            auto_hide_delay_ms: alerts.auto_hide_delay_ms,
            max_alerts: alerts.max_alerts,
            cooldown_ms: alerts.cooldown_ms,
            global_cooldown_ms: alerts.global_cooldown_ms,
            enabled: true,
            thresholds: BTreeMap::new(),
            dedup_retention_ms: alerts.dedup_retention_ms,
            fetcher: FetcherConfig::default(),
            server: ServerSettings::default(),
        }
    }
}

impl PipelineSettings {
    /// Load settings from `path` (or `environ-alerts.*` in the working
    /// directory when absent) overlaid with environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_FILE).required(false),
        };

        let settings: PipelineSettings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        info!(
            "Settings loaded: interval {}ms, {} threshold override(s), enabled={}",
            settings.interval_ms,
            settings.thresholds.len(),
            settings.enabled
        );
        Ok(settings)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_alerts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_alerts",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some((metric, _)) = self.thresholds.iter().find(|(_, b)| !b.is_consistent()) {
            return Err(ConfigError::InvalidBand {
                metric: metric.clone(),
            });
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Admission and lifecycle configuration
    pub fn alert_config(&self) -> AlertConfig {
        AlertConfig {
            cooldown_ms: self.cooldown_ms,
            global_cooldown_ms: self.global_cooldown_ms,
            auto_hide_delay_ms: self.auto_hide_delay_ms,
            max_alerts: self.max_alerts,
            dedup_retention_ms: self.dedup_retention_ms,
        }
    }

    /// Default bands with the configured overrides applied
    pub fn threshold_set(&self) -> ThresholdSet {
        ThresholdSet::default().with_overrides(
            self.thresholds
                .iter()
                .map(|(name, band)| (MetricType::from_field(name), *band)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Serializes tests that read the process environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn write_settings(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "environ-alerts-{}-{}.toml",
            name,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.interval_ms, 60_000);
        assert_eq!(settings.auto_hide_delay_ms, 60_000);
        assert_eq!(settings.cooldown_ms, 180_000);
        assert_eq!(settings.global_cooldown_ms, 60_000);
        assert!(settings.enabled);
        assert!(settings.validate().is_ok());
        assert_eq!(settings.threshold_set(), ThresholdSet::default());
    }

    #[test]
    fn test_load_from_file() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let path = write_settings(
            "file",
            r#"
interval_ms = 30000
max_alerts = 5
cooldown_ms = 120000

[thresholds.temperature]
danger_max = 40

[thresholds.co2]
warning_max = 1000
danger_max = 1500

[fetcher]
endpoint = "http://sensors.local/latest"
api_key = "k-123"
"#,
        );

        let settings = PipelineSettings::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.interval_ms, 30_000);
        assert_eq!(settings.max_alerts, 5);
        assert_eq!(settings.alert_config().cooldown_ms, 120_000);
        assert_eq!(settings.global_cooldown_ms, 60_000);
        assert_eq!(settings.fetcher.api_key.as_deref(), Some("k-123"));

        let set = settings.threshold_set();
        assert_eq!(
            set.band(&MetricType::Temperature),
            Some(&ThresholdBand::danger_above(40.0))
        );
        assert_eq!(
            set.band(&MetricType::Other("co2".into()))
                .and_then(|b| b.warning_max),
            Some(1000.0)
        );
    }

    #[test]
    fn test_environment_overrides_file() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let path = write_settings(
            "env",
            r#"
interval_ms = 30000

[fetcher]
endpoint = "http://sensors.local/latest"
api_key = "from-file"
"#,
        );

        std::env::set_var("ENVIRON_ALERTS__FETCHER__API_KEY", "from-env");
        std::env::set_var("ENVIRON_ALERTS__INTERVAL_MS", "45000");
        let loaded = PipelineSettings::load(Some(&path));
        std::env::remove_var("ENVIRON_ALERTS__FETCHER__API_KEY");
        std::env::remove_var("ENVIRON_ALERTS__INTERVAL_MS");
        std::fs::remove_file(&path).ok();

        let settings = loaded.unwrap();
        assert_eq!(settings.fetcher.api_key.as_deref(), Some("from-env"));
        assert_eq!(settings.fetcher.endpoint, "http://sensors.local/latest");
        assert_eq!(settings.interval_ms, 45_000);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let settings = PipelineSettings {
            interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid {
                field: "interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_band() {
        let mut settings = PipelineSettings::default();
        settings.thresholds.insert(
            "humidity".to_string(),
            ThresholdBand {
                warning_max: Some(90.0),
                danger_max: Some(80.0),
                ..Default::default()
            },
        );
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidBand { metric }) if metric == "humidity"
        ));
    }
}
