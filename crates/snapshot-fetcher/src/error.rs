//! Fetch Error Types

use thiserror::Error;

/// Errors raised while retrieving a snapshot
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Endpoint or credential missing; no request was attempted
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-success status or network failure
    #[error("Transport error{}: {message}", status_suffix(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Body was not a valid snapshot document
    #[error("Parse error: {0}")]
    Parse(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl FetchError {
    /// Short label for metrics and status reporting
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Configuration(_) => "configuration",
            FetchError::Transport { .. } => "transport",
            FetchError::Parse(_) => "parse",
        }
    }

    /// HTTP status code, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
