//! Threshold Bands

use crate::MetricType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Danger,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warning and danger bounds for one metric. Absent bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    #[serde(default, alias = "warningMin")]
    pub warning_min: Option<f64>,
    #[serde(default, alias = "warningMax")]
    pub warning_max: Option<f64>,
    #[serde(default, alias = "dangerMin")]
    pub danger_min: Option<f64>,
    #[serde(default, alias = "dangerMax")]
    pub danger_max: Option<f64>,
}

impl ThresholdBand {
    /// Band with only an upper danger bound
    pub fn danger_above(max: f64) -> Self {
        Self {
            danger_max: Some(max),
            ..Default::default()
        }
    }

    /// Classify a single value.
    ///
    /// Danger is checked before warning, and within each level the lower
    /// bound before the upper one. Comparisons are inclusive.
    pub fn evaluate(&self, value: f64) -> Option<(Severity, f64)> {
        crossed(value, self.danger_min, self.danger_max)
            .map(|bound| (Severity::Danger, bound))
            .or_else(|| {
                crossed(value, self.warning_min, self.warning_max)
                    .map(|bound| (Severity::Warning, bound))
            })
    }

    /// Danger must enclose warning on both sides when both are set
    pub fn is_consistent(&self) -> bool {
        let upper_ok = match (self.warning_max, self.danger_max) {
            (Some(warn), Some(danger)) => warn <= danger,
            _ => true,
        };
        let lower_ok = match (self.warning_min, self.danger_min) {
            (Some(warn), Some(danger)) => warn >= danger,
            _ => true,
        };
        upper_ok && lower_ok
    }
}

fn crossed(value: f64, min: Option<f64>, max: Option<f64>) -> Option<f64> {
    if let Some(min) = min {
        if value <= min {
            return Some(min);
        }
    }
    match max {
        Some(max) if value >= max => Some(max),
        _ => None,
    }
}

/// Ordered per-metric threshold configuration.
///
/// Entry order is the classifier's evaluation order.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSet {
    bands: Vec<(MetricType, ThresholdBand)>,
}

impl ThresholdSet {
    /// Empty set: every metric is skipped
    pub fn empty() -> Self {
        Self { bands: Vec::new() }
    }

    /// Build from an ordered list of bands
    pub fn from_bands(bands: impl IntoIterator<Item = (MetricType, ThresholdBand)>) -> Self {
        let mut set = Self::empty();
        for (metric, band) in bands {
            set.set_band(metric, band);
        }
        set
    }

    /// Replace the band of a known metric in place, or append a new one
    pub fn set_band(&mut self, metric: MetricType, band: ThresholdBand) {
        match self.bands.iter_mut().find(|(m, _)| *m == metric) {
            Some(entry) => entry.1 = band,
            None => self.bands.push((metric, band)),
        }
    }

    /// Apply per-deployment overrides on top of this set
    pub fn with_overrides(
        mut self,
        overrides: impl IntoIterator<Item = (MetricType, ThresholdBand)>,
    ) -> Self {
        for (metric, band) in overrides {
            self.set_band(metric, band);
        }
        self
    }

    pub fn band(&self, metric: &MetricType) -> Option<&ThresholdBand> {
        self.bands.iter().find(|(m, _)| m == metric).map(|(_, b)| b)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetricType, &ThresholdBand)> {
        self.bands.iter().map(|(m, b)| (m, b))
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self::from_bands([
            (
                MetricType::Temperature,
                ThresholdBand {
                    warning_min: Some(10.0),
                    warning_max: Some(30.0),
                    danger_min: Some(5.0),
                    danger_max: Some(35.0),
                },
            ),
            (
                MetricType::Humidity,
                ThresholdBand {
                    warning_min: Some(30.0),
                    warning_max: Some(70.0),
                    danger_min: Some(20.0),
                    danger_max: Some(80.0),
                },
            ),
            (
                MetricType::Gas,
                ThresholdBand {
                    warning_max: Some(300.0),
                    danger_max: Some(500.0),
                    ..Default::default()
                },
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusive_bounds() {
        let band = ThresholdBand {
            warning_max: Some(30.0),
            danger_max: Some(35.0),
            ..Default::default()
        };

        assert_eq!(band.evaluate(29.9), None);
        assert_eq!(band.evaluate(30.0), Some((Severity::Warning, 30.0)));
        assert_eq!(band.evaluate(35.0), Some((Severity::Danger, 35.0)));
    }

    #[test]
    fn test_min_bound_wins_when_both_crossed() {
        // Degenerate band where one value crosses both sides
        let band = ThresholdBand {
            danger_min: Some(10.0),
            danger_max: Some(0.0),
            ..Default::default()
        };
        assert_eq!(band.evaluate(5.0), Some((Severity::Danger, 10.0)));
    }

    #[test]
    fn test_nan_never_crosses() {
        let band = ThresholdSet::default();
        let temp = band.band(&MetricType::Temperature).unwrap();
        assert_eq!(temp.evaluate(f64::NAN), None);
    }

    #[test]
    fn test_overrides_keep_order() {
        let set = ThresholdSet::default().with_overrides([
            (MetricType::Humidity, ThresholdBand::danger_above(90.0)),
            (MetricType::Other("co2".into()), ThresholdBand::danger_above(1200.0)),
        ]);

        let order: Vec<_> = set.iter().map(|(m, _)| m.as_str().to_string()).collect();
        assert_eq!(order, vec!["temperature", "humidity", "gas", "co2"]);
        assert_eq!(
            set.band(&MetricType::Humidity),
            Some(&ThresholdBand::danger_above(90.0))
        );
    }

    #[test]
    fn test_consistency() {
        assert!(ThresholdSet::default().iter().all(|(_, b)| b.is_consistent()));

        let inverted = ThresholdBand {
            warning_max: Some(40.0),
            danger_max: Some(35.0),
            ..Default::default()
        };
        assert!(!inverted.is_consistent());
    }

    #[test]
    fn test_band_accepts_camel_case() {
        let band: ThresholdBand =
            serde_json::from_str(r#"{"dangerMax": 35, "warningMin": 12.5}"#).unwrap();
        assert_eq!(band.danger_max, Some(35.0));
        assert_eq!(band.warning_min, Some(12.5));
        assert_eq!(band.warning_max, None);
    }
}
