//! Anomaly Detection
//!
//! Provides the sensor snapshot model and a pure threshold-band classifier
//! that turns one snapshot into zero or more anomaly candidates.

mod classifier;
mod snapshot;
mod threshold;

pub use classifier::{classify, AnomalyCandidate};
pub use snapshot::{MetricType, SensorSnapshot};
pub use threshold::{Severity, ThresholdBand, ThresholdSet};
