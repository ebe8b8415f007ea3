//! Sensor Snapshot Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of environmental metric carried by a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MetricType {
    Temperature,
    Humidity,
    Gas,
    /// Any metric without a dedicated variant, keyed by its field name
    Other(String),
}

impl MetricType {
    /// Map a snapshot field name onto a metric type
    pub fn from_field(name: &str) -> Self {
        match name {
            "temperature" | "temp" | "mintemp" => MetricType::Temperature,
            "humidity" | "hum" | "minhum" => MetricType::Humidity,
            "gas" | "gas_concentration" | "mingas" => MetricType::Gas,
            other => MetricType::Other(other.to_string()),
        }
    }

    /// Canonical field name
    pub fn as_str(&self) -> &str {
        match self {
            MetricType::Temperature => "temperature",
            MetricType::Humidity => "humidity",
            MetricType::Gas => "gas",
            MetricType::Other(name) => name.as_str(),
        }
    }

    /// Snapshot keys probed for this metric, canonical name first
    pub fn field_names(&self) -> &[&str] {
        match self {
            MetricType::Temperature => &["temperature", "temp", "mintemp"],
            MetricType::Humidity => &["humidity", "hum", "minhum"],
            MetricType::Gas => &["gas", "gas_concentration", "mingas"],
            MetricType::Other(_) => &[],
        }
    }
}

impl From<String> for MetricType {
    fn from(name: String) -> Self {
        MetricType::from_field(&name)
    }
}

impl From<MetricType> for String {
    fn from(metric: MetricType) -> Self {
        metric.as_str().to_string()
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timestamped multi-metric reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// ISO-8601 timestamp as delivered by the source
    pub timestamp: String,
    /// Metric field name to value
    pub metrics: BTreeMap<String, f64>,
    /// Optional location tag
    pub location: Option<String>,
    /// Source object name, when the data source reports one
    pub filename: Option<String>,
}

impl SensorSnapshot {
    /// Create an empty snapshot for a timestamp
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            metrics: BTreeMap::new(),
            location: None,
            filename: None,
        }
    }

    /// Builder-style metric insertion
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Builder-style location tag
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Look up the value reported for a metric, honouring field aliases
    pub fn value_of(&self, metric: &MetricType) -> Option<f64> {
        match metric {
            MetricType::Other(name) => self.metrics.get(name).copied(),
            known => known
                .field_names()
                .iter()
                .find_map(|field| self.metrics.get(*field).copied()),
        }
    }
}
