//! Alerting System
//!
//! Provides alert admission control (exact-duplicate suppression, per-key
//! and global cooldowns) and lifecycle management of displayed alerts.

mod admission;
mod clock;
mod config;
mod dedup;
mod lifecycle;

pub use admission::{AdmissionController, AdmissionDecision, CooldownKey, ExactKey};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AlertConfig;
pub use dedup::DedupWindow;
pub use lifecycle::{AlertId, AlertLifecycle, DisplayedAlert};
