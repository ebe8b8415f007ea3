//! Threshold Classifier

use crate::{MetricType, SensorSnapshot, Severity, ThresholdSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A detected threshold violation, prior to admission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyCandidate {
    pub metric_type: MetricType,
    pub severity: Severity,
    /// Offending reading
    pub value: f64,
    /// The bound that was crossed
    pub threshold: f64,
    /// Copied from the snapshot
    pub timestamp: String,
    pub location: Option<String>,
}

impl AnomalyCandidate {
    /// Human readable summary for display
    pub fn message(&self) -> String {
        let direction = if self.value <= self.threshold {
            "below"
        } else {
            "above"
        };
        let place = self
            .location
            .as_deref()
            .map(|l| format!(" at {}", l))
            .unwrap_or_default();
        format!(
            "{} {}{}: {:.1} is {} threshold {:.1}",
            self.severity, self.metric_type, place, self.value, direction, self.threshold
        )
    }
}

/// Evaluate one snapshot against the configured bands.
///
/// Metrics are visited in threshold-set order; each yields at most one
/// candidate, and danger suppresses warning for the same metric.
pub fn classify(snapshot: &SensorSnapshot, thresholds: &ThresholdSet) -> Vec<AnomalyCandidate> {
    let mut candidates = Vec::new();

    for (metric, band) in thresholds.iter() {
        let Some(value) = snapshot.value_of(metric) else {
            continue;
        };

        if let Some((severity, threshold)) = band.evaluate(value) {
            debug!(
                metric = %metric,
                %severity,
                value,
                threshold,
                "threshold crossed"
            );
            candidates.push(AnomalyCandidate {
                metric_type: metric.clone(),
                severity,
                value,
                threshold,
                timestamp: snapshot.timestamp.clone(),
                location: snapshot.location.clone(),
            });
        }
    }

    candidates
}
