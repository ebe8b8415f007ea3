//! Displayed Alert Lifecycle
//!
//! Owns the list of currently displayed alerts. Each alert is removed
//! either by its expiry timer or by an explicit dismissal, whichever comes
//! first; the other becomes a no-op.

use crate::AlertConfig;
use anomaly_detector::AnomalyCandidate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Unique identifier of a displayed alert
pub type AlertId = String;

/// An admitted candidate that is currently displayed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayedAlert {
    pub alert_id: AlertId,
    #[serde(flatten)]
    pub candidate: AnomalyCandidate,
    pub message: String,
    /// Admission time (epoch ms)
    pub created_at_ms: u64,
}

struct LifecycleState {
    /// Insertion ordered, oldest first
    alerts: Vec<DisplayedAlert>,
    /// Pending expiry timers by alert id
    timers: HashMap<AlertId, AbortHandle>,
}

struct Shared {
    state: Mutex<LifecycleState>,
    visible_tx: watch::Sender<Vec<DisplayedAlert>>,
    auto_hide_delay: Duration,
    max_alerts: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove an alert and its timer entry. Caller decides whether to abort.
    fn remove(&self, alert_id: &str, abort_timer: bool) -> bool {
        let mut state = self.lock();
        if let Some(handle) = state.timers.remove(alert_id) {
            if abort_timer {
                handle.abort();
            }
        }

        let Some(index) = state.alerts.iter().position(|a| a.alert_id == alert_id) else {
            return false;
        };
        state.alerts.remove(index);
        self.publish(&state);
        true
    }

    /// Every change to the list goes through here, expiry included
    fn publish(&self, state: &LifecycleState) {
        let visible: Vec<_> = state.alerts.iter().take(self.max_alerts).cloned().collect();
        metrics::gauge!("environ_alerts_visible").set(visible.len() as f64);
        self.visible_tx.send_replace(visible);
    }
}

/// Handle to the displayed-alert list. Clones share the same list.
#[derive(Clone)]
pub struct AlertLifecycle {
    shared: Arc<Shared>,
}

impl AlertLifecycle {
    /// Create an empty lifecycle manager
    pub fn new(config: &AlertConfig) -> Self {
        let (visible_tx, _) = watch::channel(Vec::new());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LifecycleState {
                    alerts: Vec::new(),
                    timers: HashMap::new(),
                }),
                visible_tx,
                auto_hide_delay: Duration::from_millis(config.auto_hide_delay_ms),
                max_alerts: config.max_alerts,
            }),
        }
    }

    /// Display an admitted candidate and schedule its expiry.
    ///
    /// Must be called from within a tokio runtime.
    pub fn admit(&self, candidate: AnomalyCandidate, now_ms: u64) -> AlertId {
        let alert_id = Uuid::new_v4().to_string();
        let alert = DisplayedAlert {
            alert_id: alert_id.clone(),
            message: candidate.message(),
            candidate,
            created_at_ms: now_ms,
        };

        let mut state = self.shared.lock();
        state.alerts.push(alert);

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let expiring = alert_id.clone();
        let deadline = tokio::time::Instant::now() + self.shared.auto_hide_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(shared) = weak.upgrade() {
                if shared.remove(&expiring, false) {
                    debug!("Alert expired: {}", expiring);
                }
            }
        });
        state.timers.insert(alert_id.clone(), task.abort_handle());
        self.shared.publish(&state);

        info!(
            "Alert displayed: {} ({} active)",
            alert_id,
            state.alerts.len()
        );
        alert_id
    }

    /// Remove an alert on user request. Absent ids are a no-op.
    pub fn dismiss(&self, alert_id: &str) -> bool {
        let removed = self.shared.remove(alert_id, true);
        if removed {
            info!("Alert dismissed: {}", alert_id);
        } else {
            debug!("Dismiss ignored, alert not displayed: {}", alert_id);
        }
        removed
    }

    /// First `max_alerts` alerts in insertion order
    pub fn list_visible(&self, max_alerts: usize) -> Vec<DisplayedAlert> {
        self.shared
            .lock()
            .alerts
            .iter()
            .take(max_alerts)
            .cloned()
            .collect()
    }

    /// Reactive view of the visible alerts, capped at the configured maximum
    pub fn subscribe(&self) -> watch::Receiver<Vec<DisplayedAlert>> {
        self.shared.visible_tx.subscribe()
    }

    /// Configured display cap
    pub fn max_alerts(&self) -> usize {
        self.shared.max_alerts
    }

    /// Number of displayed alerts, including those hidden by the cap
    pub fn len(&self) -> usize {
        self.shared.lock().alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of expiry timers still pending
    pub fn pending_timers(&self) -> usize {
        self.shared.lock().timers.len()
    }

    /// Cancel every pending expiry timer and clear the list
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        let cancelled = state.timers.len();
        for (_, handle) in state.timers.drain() {
            handle.abort();
        }
        state.alerts.clear();
        self.shared.publish(&state);
        info!("Alert lifecycle shut down, {} timers cancelled", cancelled);
    }
}
