//! Alert Pipeline
//!
//! Polls the latest sensor snapshot on a fixed interval and drives it
//! through classification, admission and display.

mod error;
mod pipeline;
mod settings;

pub use error::ConfigError;
pub use pipeline::{AlertPipeline, CycleOutcome, PipelineStatus};
pub use settings::{PipelineSettings, ServerSettings};
