//! Alert Pipeline Implementation

use crate::PipelineSettings;
use alerting::{
    AdmissionController, AdmissionDecision, AlertId, AlertLifecycle, Clock, DisplayedAlert,
    SystemClock,
};
use anomaly_detector::{classify, AnomalyCandidate, SensorSnapshot, ThresholdSet};
use serde::Serialize;
use snapshot_fetcher::{FetchError, HttpSnapshotFetcher, SnapshotSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of one poll cycle
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// A new alert is displayed
    Admitted {
        alert_id: AlertId,
        candidate: AnomalyCandidate,
    },
    /// Snapshot processed, nothing admitted
    NotAdmitted(AdmissionDecision),
    /// No snapshot this cycle
    FetchFailed(FetchError),
    /// A previous cycle is still fetching
    SkippedInFlight,
    /// Host context is not in the foreground
    SkippedBackground,
}

impl CycleOutcome {
    pub fn alert_id(&self) -> Option<&str> {
        match self {
            CycleOutcome::Admitted { alert_id, .. } => Some(alert_id.as_str()),
            _ => None,
        }
    }

    /// Short label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Admitted { .. } => "admitted",
            CycleOutcome::NotAdmitted(decision) => decision.label(),
            CycleOutcome::FetchFailed(_) => "fetch_failed",
            CycleOutcome::SkippedInFlight => "in_flight",
            CycleOutcome::SkippedBackground => "background",
        }
    }
}

/// Diagnostic snapshot of the pipeline
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStatus {
    pub enabled: bool,
    pub foreground: bool,
    pub in_flight: bool,
    pub cycles: u64,
    pub admitted: u64,
    pub fetch_failures: u64,
    pub last_error: Option<String>,
    pub last_error_kind: Option<&'static str>,
    pub last_success_at_ms: Option<u64>,
    pub last_processed_timestamp: Option<String>,
    pub displayed_alerts: usize,
    pub visible_alerts: usize,
}

#[derive(Default)]
struct Counters {
    cycles: u64,
    admitted: u64,
    fetch_failures: u64,
    last_error: Option<FetchError>,
    last_success_at_ms: Option<u64>,
}

/// Clears the in-flight flag even if the cycle future is dropped
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Fetch → classify → admit → display, once per interval
pub struct AlertPipeline {
    source: Arc<dyn SnapshotSource>,
    thresholds: ThresholdSet,
    admission: Mutex<AdmissionController>,
    lifecycle: AlertLifecycle,
    clock: Arc<dyn Clock>,
    interval: Duration,
    enabled: bool,
    in_flight: AtomicBool,
    foreground: AtomicBool,
    counters: Mutex<Counters>,
    cancel: CancellationToken,
}

impl AlertPipeline {
    /// Create a pipeline over an arbitrary snapshot source
    pub fn new(source: Arc<dyn SnapshotSource>, settings: &PipelineSettings) -> Self {
        let alert_config = settings.alert_config();
        info!(
            "Creating alert pipeline: interval {}ms, max {} visible alerts",
            settings.interval_ms, alert_config.max_alerts
        );
        Self {
            source,
            thresholds: settings.threshold_set(),
            lifecycle: AlertLifecycle::new(&alert_config),
            admission: Mutex::new(AdmissionController::new(alert_config)),
            clock: Arc::new(SystemClock),
            interval: settings.interval(),
            enabled: settings.enabled,
            in_flight: AtomicBool::new(false),
            foreground: AtomicBool::new(true),
            counters: Mutex::new(Counters::default()),
            cancel: CancellationToken::new(),
        }
    }

    /// Create a pipeline polling the configured HTTP endpoint
    pub fn from_settings(settings: &PipelineSettings) -> Result<Self, FetchError> {
        let fetcher = HttpSnapshotFetcher::new(settings.fetcher.clone())?;
        Ok(Self::new(Arc::new(fetcher), settings))
    }

    /// Replace the wall clock used for cooldowns and timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the threshold bands
    pub fn with_thresholds(mut self, thresholds: ThresholdSet) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Poll until cancelled. Returns immediately when disabled.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Alert pipeline disabled, not polling");
            return;
        }

        info!("Starting alert pipeline");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if !self.is_foreground() {
                debug!("Tick skipped: not in foreground");
                record_cycle(&CycleOutcome::SkippedBackground);
                continue;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.poll_once() => {}
            }
        }

        self.lifecycle.shutdown();
        info!("Alert pipeline stopped");
    }

    /// Run a single cycle now. Skipped if another cycle is fetching.
    pub async fn poll_once(&self) -> CycleOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("Cycle skipped: previous fetch still in flight");
            let outcome = CycleOutcome::SkippedInFlight;
            record_cycle(&outcome);
            return outcome;
        };

        let outcome = match self.source.fetch_snapshot().await {
            Ok(snapshot) => {
                let mut counters = self.counters();
                counters.last_error = None;
                counters.last_success_at_ms = Some(self.clock.now_ms());
                drop(counters);
                self.process(&snapshot)
            }
            Err(err) => {
                warn!(kind = err.kind(), "Snapshot fetch failed: {}", err);
                metrics::counter!("environ_alerts_fetch_failures_total", "kind" => err.kind())
                    .increment(1);
                let mut counters = self.counters();
                counters.fetch_failures += 1;
                counters.last_error = Some(err.clone());
                CycleOutcome::FetchFailed(err)
            }
        };

        self.counters().cycles += 1;
        record_cycle(&outcome);
        outcome
    }

    fn process(&self, snapshot: &SensorSnapshot) -> CycleOutcome {
        let candidates = classify(snapshot, &self.thresholds);
        let now_ms = self.clock.now_ms();

        let decision = self
            .admission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .admit_cycle(&snapshot.timestamp, &candidates, now_ms);

        match decision {
            AdmissionDecision::Admitted(candidate) => {
                metrics::counter!(
                    "environ_alerts_admitted_total",
                    "metric" => candidate.metric_type.to_string(),
                    "severity" => candidate.severity.as_str()
                )
                .increment(1);
                let alert_id = self.lifecycle.admit(candidate.clone(), now_ms);
                self.counters().admitted += 1;
                CycleOutcome::Admitted {
                    alert_id,
                    candidate,
                }
            }
            other => CycleOutcome::NotAdmitted(other),
        }
    }

    /// Remove a displayed alert on user request
    pub fn dismiss(&self, alert_id: &str) -> bool {
        self.lifecycle.dismiss(alert_id)
    }

    /// Currently visible alerts, oldest first
    pub fn visible_alerts(&self) -> Vec<DisplayedAlert> {
        self.lifecycle.list_visible(self.lifecycle.max_alerts())
    }

    /// Reactive list of visible alerts
    pub fn subscribe(&self) -> watch::Receiver<Vec<DisplayedAlert>> {
        self.lifecycle.subscribe()
    }

    pub fn max_alerts(&self) -> usize {
        self.lifecycle.max_alerts()
    }

    /// Mark the hosting context as visible or hidden
    pub fn set_foreground(&self, foreground: bool) {
        let previous = self.foreground.swap(foreground, Ordering::AcqRel);
        if previous != foreground {
            info!("Pipeline foreground set to {}", foreground);
        }
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground.load(Ordering::Acquire)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Token cancelling the poll loop
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop polling and cancel every pending expiry timer
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.lifecycle.shutdown();
    }

    pub fn status(&self) -> PipelineStatus {
        let last_processed_timestamp = self
            .admission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_processed_timestamp()
            .map(str::to_string);
        let counters = self.counters();
        let displayed = self.lifecycle.len();

        PipelineStatus {
            enabled: self.enabled,
            foreground: self.is_foreground(),
            in_flight: self.in_flight.load(Ordering::Acquire),
            cycles: counters.cycles,
            admitted: counters.admitted,
            fetch_failures: counters.fetch_failures,
            last_error: counters.last_error.as_ref().map(|e| e.to_string()),
            last_error_kind: counters.last_error.as_ref().map(|e| e.kind()),
            last_success_at_ms: counters.last_success_at_ms,
            last_processed_timestamp,
            displayed_alerts: displayed,
            visible_alerts: displayed.min(self.lifecycle.max_alerts()),
        }
    }

    fn counters(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn record_cycle(outcome: &CycleOutcome) {
    metrics::counter!("environ_alerts_cycles_total", "outcome" => outcome.label()).increment(1);
}
