//! Data Source Wire Format
//!
//! The source answers with `{ "filename": ..., "data": { "timestamp": ...,
//! <metric>: <number>, ..., "location": ... } }`.

use crate::FetchError;
use anomaly_detector::SensorSnapshot;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    filename: Option<String>,
    data: Map<String, Value>,
}

/// Parse a response body into a snapshot.
///
/// Non-numeric fields other than `timestamp` and `location` are ignored.
pub fn parse_snapshot_body(body: &[u8]) -> Result<SensorSnapshot, FetchError> {
    let response: LatestResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let timestamp = match response.data.get("timestamp") {
        Some(Value::String(ts)) if !ts.is_empty() => ts.clone(),
        Some(_) => return Err(FetchError::Parse("timestamp is not a string".to_string())),
        None => return Err(FetchError::Parse("missing data.timestamp".to_string())),
    };

    let location = match response.data.get("location") {
        Some(Value::String(loc)) => Some(loc.clone()),
        _ => None,
    };

    let metrics: BTreeMap<String, f64> = response
        .data
        .iter()
        .filter(|(key, _)| key.as_str() != "timestamp" && key.as_str() != "location")
        .filter_map(|(key, value)| value.as_f64().map(|v| (key.clone(), v)))
        .collect();

    Ok(SensorSnapshot {
        timestamp,
        metrics,
        location,
        filename: response.filename,
    })
}
