//! Alert Admission Controller
//!
//! Funnel applied to each classification pass, in order:
//! 1. unchanged-snapshot guard
//! 2. global cooldown
//! 3. exact-duplicate suppression on (metric, severity, timestamp)
//! 4. per-key cooldown on (metric, severity)
//! 5. at most one admission per cycle

use crate::{AlertConfig, DedupWindow};
use anomaly_detector::{AnomalyCandidate, MetricType, Severity};
use std::collections::HashMap;
use tracing::{debug, info};

/// Identity of an alert kind for cooldown tracking
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CooldownKey {
    pub metric_type: MetricType,
    pub severity: Severity,
}

impl From<&AnomalyCandidate> for CooldownKey {
    fn from(candidate: &AnomalyCandidate) -> Self {
        Self {
            metric_type: candidate.metric_type.clone(),
            severity: candidate.severity,
        }
    }
}

/// Identity of one observed event for exact-duplicate suppression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExactKey {
    pub metric_type: MetricType,
    pub severity: Severity,
    pub timestamp: String,
}

impl From<&AnomalyCandidate> for ExactKey {
    fn from(candidate: &AnomalyCandidate) -> Self {
        Self {
            metric_type: candidate.metric_type.clone(),
            severity: candidate.severity,
            timestamp: candidate.timestamp.clone(),
        }
    }
}

/// Outcome of one admission cycle
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    /// This candidate becomes a displayed alert
    Admitted(AnomalyCandidate),
    /// Same timestamp as the last processed snapshot and nothing to report
    SkippedUnchanged,
    /// The snapshot produced no candidates
    NoCandidates,
    /// Another alert was emitted too recently
    GlobalCooldown { remaining_ms: u64 },
    /// Every candidate was a known duplicate or still cooling down
    AllSuppressed { duplicates: usize, cooling_down: usize },
}

impl AdmissionDecision {
    pub fn admitted(&self) -> Option<&AnomalyCandidate> {
        match self {
            AdmissionDecision::Admitted(candidate) => Some(candidate),
            _ => None,
        }
    }

    /// Short label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            AdmissionDecision::Admitted(_) => "admitted",
            AdmissionDecision::SkippedUnchanged => "unchanged",
            AdmissionDecision::NoCandidates => "no_candidates",
            AdmissionDecision::GlobalCooldown { .. } => "global_cooldown",
            AdmissionDecision::AllSuppressed { .. } => "suppressed",
        }
    }
}

/// Admission controller for deduplication and throttling
pub struct AdmissionController {
    /// Configuration
    config: AlertConfig,
    /// Timestamp of the last snapshot that went through the funnel
    last_processed_timestamp: Option<String>,
    /// When the last alert was admitted (epoch ms)
    last_alert_emitted_at: Option<u64>,
    /// Last admission per (metric, severity) (epoch ms)
    last_shown: HashMap<CooldownKey, u64>,
    /// Exact events already shown
    shown: DedupWindow<ExactKey>,
}

impl AdmissionController {
    /// Create a new admission controller
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating admission controller with config: {:?}", config);
        let shown = DedupWindow::new(config.dedup_retention());
        Self {
            config,
            last_processed_timestamp: None,
            last_alert_emitted_at: None,
            last_shown: HashMap::new(),
            shown,
        }
    }

    /// Run one classification pass through the funnel
    pub fn admit_cycle(
        &mut self,
        snapshot_timestamp: &str,
        candidates: &[AnomalyCandidate],
        now_ms: u64,
    ) -> AdmissionDecision {
        if candidates.is_empty()
            && self.last_processed_timestamp.as_deref() == Some(snapshot_timestamp)
        {
            debug!("Cycle skipped: snapshot {} unchanged", snapshot_timestamp);
            return AdmissionDecision::SkippedUnchanged;
        }
        self.last_processed_timestamp = Some(snapshot_timestamp.to_string());

        if candidates.is_empty() {
            return AdmissionDecision::NoCandidates;
        }

        if let Some(last) = self.last_alert_emitted_at {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed < self.config.global_cooldown_ms {
                let remaining_ms = self.config.global_cooldown_ms - elapsed;
                debug!(
                    "Cycle suppressed: global cooldown, {}ms remaining",
                    remaining_ms
                );
                return AdmissionDecision::GlobalCooldown { remaining_ms };
            }
        }

        let mut duplicates = 0;
        let mut cooling_down = 0;

        for candidate in candidates {
            let exact = ExactKey::from(candidate);
            if self.shown.contains(&exact, now_ms) {
                debug!(
                    "Candidate suppressed: {} {} at {} already shown",
                    candidate.metric_type, candidate.severity, candidate.timestamp
                );
                duplicates += 1;
                continue;
            }

            let key = CooldownKey::from(candidate);
            if let Some(&shown_at) = self.last_shown.get(&key) {
                if now_ms.saturating_sub(shown_at) < self.config.cooldown_ms {
                    debug!(
                        "Candidate suppressed: {} {} in cooldown period",
                        candidate.metric_type, candidate.severity
                    );
                    cooling_down += 1;
                    continue;
                }
            }

            self.record_admission(key, exact, now_ms);
            info!(
                "Alert admitted: {} {} (value {}, threshold {})",
                candidate.metric_type, candidate.severity, candidate.value, candidate.threshold
            );
            return AdmissionDecision::Admitted(candidate.clone());
        }

        AdmissionDecision::AllSuppressed {
            duplicates,
            cooling_down,
        }
    }

    fn record_admission(&mut self, key: CooldownKey, exact: ExactKey, now_ms: u64) {
        self.last_alert_emitted_at = Some(now_ms);
        self.last_shown.insert(key, now_ms);
        self.shown.insert(exact, now_ms);
    }

    pub fn last_processed_timestamp(&self) -> Option<&str> {
        self.last_processed_timestamp.as_deref()
    }

    pub fn last_alert_emitted_at(&self) -> Option<u64> {
        self.last_alert_emitted_at
    }

    /// Number of exact-duplicate keys currently remembered
    pub fn remembered_events(&self) -> usize {
        self.shown.len()
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Clear all tracking state
    pub fn reset(&mut self) {
        self.last_processed_timestamp = None;
        self.last_alert_emitted_at = None;
        self.last_shown.clear();
        self.shown.clear();
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(metric: MetricType, severity: Severity, timestamp: &str) -> AnomalyCandidate {
        AnomalyCandidate {
            metric_type: metric,
            severity,
            value: 40.0,
            threshold: 35.0,
            timestamp: timestamp.to_string(),
            location: None,
        }
    }

    fn no_global() -> AlertConfig {
        AlertConfig {
            global_cooldown_ms: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_candidate_admitted() {
        let mut controller = AdmissionController::default();
        let temp = candidate(MetricType::Temperature, Severity::Danger, "t0");
        let hum = candidate(MetricType::Humidity, Severity::Danger, "t0");

        let decision = controller.admit_cycle("t0", &[temp.clone(), hum], 0);
        assert_eq!(decision, AdmissionDecision::Admitted(temp));
        assert_eq!(controller.last_alert_emitted_at(), Some(0));
    }

    #[test]
    fn test_unchanged_snapshot_skipped() {
        let mut controller = AdmissionController::default();

        assert_eq!(
            controller.admit_cycle("t0", &[], 0),
            AdmissionDecision::NoCandidates
        );
        assert_eq!(
            controller.admit_cycle("t0", &[], 1_000),
            AdmissionDecision::SkippedUnchanged
        );

        // Same timestamp but something to report is still processed
        let temp = candidate(MetricType::Temperature, Severity::Danger, "t0");
        assert!(controller
            .admit_cycle("t0", &[temp], 2_000)
            .admitted()
            .is_some());
    }

    #[test]
    fn test_global_cooldown_blocks_other_keys() {
        let mut controller = AdmissionController::default();
        let temp = candidate(MetricType::Temperature, Severity::Danger, "t0");
        let hum = candidate(MetricType::Humidity, Severity::Warning, "t1");

        assert!(controller.admit_cycle("t0", &[temp], 0).admitted().is_some());
        assert_eq!(
            controller.admit_cycle("t1", &[hum.clone()], 59_999),
            AdmissionDecision::GlobalCooldown { remaining_ms: 1 }
        );
        assert_eq!(
            controller.admit_cycle("t1", &[hum.clone()], 60_000),
            AdmissionDecision::Admitted(hum)
        );
    }

    #[test]
    fn test_per_key_cooldown_independent() {
        let mut controller = AdmissionController::new(no_global());
        let temp = candidate(MetricType::Temperature, Severity::Danger, "t0");
        let hum = candidate(MetricType::Humidity, Severity::Danger, "t1");

        assert!(controller.admit_cycle("t0", &[temp], 0).admitted().is_some());
        assert_eq!(
            controller.admit_cycle("t1", &[hum.clone()], 1),
            AdmissionDecision::Admitted(hum)
        );
    }

    #[test]
    fn test_per_key_cooldown_blocks_same_key() {
        let mut controller = AdmissionController::new(no_global());
        let first = candidate(MetricType::Temperature, Severity::Danger, "t0");
        let second = candidate(MetricType::Temperature, Severity::Danger, "t1");

        assert!(controller.admit_cycle("t0", &[first], 0).admitted().is_some());
        assert_eq!(
            controller.admit_cycle("t1", &[second.clone()], 179_999),
            AdmissionDecision::AllSuppressed {
                duplicates: 0,
                cooling_down: 1
            }
        );
        assert_eq!(
            controller.admit_cycle("t1", &[second.clone()], 180_000),
            AdmissionDecision::Admitted(second)
        );
    }

    #[test]
    fn test_severity_is_part_of_key() {
        let mut controller = AdmissionController::new(no_global());
        let warning = candidate(MetricType::Temperature, Severity::Warning, "t0");
        let danger = candidate(MetricType::Temperature, Severity::Danger, "t1");

        assert!(controller.admit_cycle("t0", &[warning], 0).admitted().is_some());
        assert!(controller.admit_cycle("t1", &[danger], 10).admitted().is_some());
    }

    #[test]
    fn test_exact_duplicate_admitted_once() {
        let config = AlertConfig {
            global_cooldown_ms: 0,
            cooldown_ms: 0,
            ..Default::default()
        };
        let mut controller = AdmissionController::new(config);
        let temp = candidate(MetricType::Temperature, Severity::Danger, "t0");

        assert!(controller
            .admit_cycle("t0", &[temp.clone()], 0)
            .admitted()
            .is_some());
        assert_eq!(
            controller.admit_cycle("t0", &[temp.clone()], 10_000),
            AdmissionDecision::AllSuppressed {
                duplicates: 1,
                cooling_down: 0
            }
        );
        assert_eq!(controller.remembered_events(), 1);
    }

    #[test]
    fn test_exact_duplicate_remembered_across_many_events() {
        let config = AlertConfig {
            global_cooldown_ms: 0,
            cooldown_ms: 0,
            ..Default::default()
        };
        let mut controller = AdmissionController::new(config);
        let first = candidate(MetricType::Temperature, Severity::Danger, "t0");
        assert!(controller
            .admit_cycle("t0", &[first.clone()], 0)
            .admitted()
            .is_some());

        for step in 1..5_000u64 {
            let ts = format!("t{}", step);
            let next = candidate(MetricType::Temperature, Severity::Danger, &ts);
            assert!(controller.admit_cycle(&ts, &[next], step).admitted().is_some());
        }

        assert_eq!(
            controller.admit_cycle("t0", &[first], 5_000),
            AdmissionDecision::AllSuppressed {
                duplicates: 1,
                cooling_down: 0
            }
        );
        assert_eq!(controller.remembered_events(), 5_000);
    }

    #[test]
    fn test_suppressed_candidate_falls_through_to_next() {
        let mut controller = AdmissionController::new(no_global());
        let temp0 = candidate(MetricType::Temperature, Severity::Danger, "t0");
        let temp1 = candidate(MetricType::Temperature, Severity::Danger, "t1");
        let gas1 = candidate(MetricType::Gas, Severity::Warning, "t1");

        assert!(controller.admit_cycle("t0", &[temp0], 0).admitted().is_some());
        assert_eq!(
            controller.admit_cycle("t1", &[temp1, gas1.clone()], 1_000),
            AdmissionDecision::Admitted(gas1)
        );
    }

    #[test]
    fn test_reset() {
        let mut controller = AdmissionController::default();
        let temp = candidate(MetricType::Temperature, Severity::Danger, "t0");
        controller.admit_cycle("t0", &[temp.clone()], 0);

        controller.reset();
        assert_eq!(controller.last_processed_timestamp(), None);
        assert_eq!(controller.last_alert_emitted_at(), None);
        assert!(controller.admit_cycle("t0", &[temp], 1).admitted().is_some());
    }
}
