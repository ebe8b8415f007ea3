//! Configuration Error Types

use thiserror::Error;

/// Errors while loading or validating pipeline settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Source could not be read or deserialized
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    /// A setting has an unusable value
    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// Warning band lies outside the danger band
    #[error("Threshold band for {metric} is inverted: danger must enclose warning")]
    InvalidBand { metric: String },
}
