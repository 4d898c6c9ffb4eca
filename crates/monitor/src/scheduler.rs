//! Monitoring Scheduler Implementation

use crate::SchedulerError;
use alerting::{Alert, SharedAlertManager};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use telemetry::{now_ms, TelemetrySource};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Buffered alerts per subscriber before the slowest one starts lagging
const EVENT_CAPACITY: usize = 256;

/// Configuration for the monitoring loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Delay between cycles (default: 30 s)
    pub interval_ms: u64,
    /// Failed cycles retried with `retry_delay_ms` before falling back to
    /// the normal interval
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 5_000,
        }
    }
}

/// Partial update of [`SchedulerConfig`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfigPatch {
    pub interval_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

impl SchedulerConfig {
    /// Both delays must be positive or the loop would spin
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.interval_ms == 0 {
            return Err(SchedulerError::InvalidConfig {
                field: "intervalMs",
                reason: "must be positive".to_string(),
            });
        }
        if self.retry_delay_ms == 0 {
            return Err(SchedulerError::InvalidConfig {
                field: "retryDelayMs",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Copy with the patch applied, if the result is valid
    pub fn patched(&self, patch: &SchedulerConfigPatch) -> Result<Self, SchedulerError> {
        let mut config = self.clone();
        config.apply(patch);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, patch: &SchedulerConfigPatch) {
        if let Some(interval) = patch.interval_ms {
            self.interval_ms = interval;
        }
        if let Some(retries) = patch.max_retries {
            self.max_retries = retries;
        }
        if let Some(delay) = patch.retry_delay_ms {
            self.retry_delay_ms = delay;
        }
    }
}

/// Loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulerState {
    Idle,
    Running,
    /// Retrying after `attempt` consecutive failures
    Backoff { attempt: u32 },
}

/// Counters for the current run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub total_runs: u64,
    /// End of the last cycle (ms since epoch)
    pub last_run: Option<i64>,
    pub total_alerts_generated: u64,
    pub errors: u64,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

/// Snapshot of the scheduler for the status surface
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStatus {
    pub is_running: bool,
    #[serde(flatten)]
    pub state: SchedulerState,
    pub stats: RunStats,
    pub started_at: Option<i64>,
    pub uptime_ms: Option<i64>,
    pub config: SchedulerConfig,
}

/// Result of one successful cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub aircraft_analyzed: usize,
    pub new_alerts: Vec<Alert>,
    pub duration_ms: u64,
}

struct Inner {
    config: SchedulerConfig,
    state: SchedulerState,
    stats: RunStats,
    started_at: Option<i64>,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

/// Runs analysis cycles against a telemetry source. Cheap to clone; clones
/// control the same loop.
#[derive(Clone)]
pub struct MonitoringScheduler {
    source: Arc<dyn TelemetrySource>,
    alerts: SharedAlertManager,
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<Alert>,
}

impl MonitoringScheduler {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        alerts: SharedAlertManager,
        config: SchedulerConfig,
    ) -> Self {
        info!(
            "Monitoring scheduler created for source '{}' (every {} ms)",
            source.name(),
            config.interval_ms
        );
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            alerts,
            inner: Arc::new(Mutex::new(Inner {
                config,
                state: SchedulerState::Idle,
                stats: RunStats::default(),
                started_at: None,
                stop_tx: None,
                task: None,
            })),
            events,
        }
    }

    /// Stream of alerts created by scheduled and manual cycles
    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.events.subscribe()
    }

    /// Start the loop; the first cycle runs immediately
    pub async fn start(&self, patch: SchedulerConfigPatch) -> Result<SchedulerConfig, SchedulerError> {
        let mut inner = self.inner.lock().await;
        if inner.state != SchedulerState::Idle {
            return Err(SchedulerError::AlreadyRunning);
        }

        inner.config = inner.config.patched(&patch)?;
        inner.stats = RunStats::default();
        inner.state = SchedulerState::Running;
        inner.started_at = Some(now_ms());

        let (stop_tx, stop_rx) = watch::channel(false);
        inner.stop_tx = Some(stop_tx);
        inner.task = Some(tokio::spawn(self.clone().run(stop_rx)));

        info!("Monitoring started: {:?}", inner.config);
        Ok(inner.config.clone())
    }

    /// Stop the loop. A cycle in flight is allowed to finish; the pending
    /// sleep is cancelled. Returns the final statistics.
    pub async fn stop(&self) -> Result<RunStats, SchedulerError> {
        let (stop_tx, task) = {
            let mut inner = self.inner.lock().await;
            match (inner.state, inner.stop_tx.take()) {
                (SchedulerState::Idle, _) | (_, None) => return Err(SchedulerError::NotRunning),
                (_, Some(tx)) => (tx, inner.task.take()),
            }
        };

        let _ = stop_tx.send(true);
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Monitoring loop ended abnormally: {}", e);
            }
        }

        let mut inner = self.inner.lock().await;
        inner.state = SchedulerState::Idle;
        inner.started_at = None;
        info!(
            "Monitoring stopped after {} runs ({} errors)",
            inner.stats.total_runs, inner.stats.errors
        );
        Ok(inner.stats.clone())
    }

    /// Merge a config patch; takes effect from the next sleep. An invalid
    /// patch leaves the config untouched.
    pub async fn update_config(
        &self,
        patch: SchedulerConfigPatch,
    ) -> Result<SchedulerConfig, SchedulerError> {
        let mut inner = self.inner.lock().await;
        inner.config = inner.config.patched(&patch)?;
        info!("Monitoring config updated: {:?}", inner.config);
        Ok(inner.config.clone())
    }

    pub async fn status(&self) -> MonitoringStatus {
        let inner = self.inner.lock().await;
        MonitoringStatus {
            is_running: inner.state != SchedulerState::Idle,
            state: inner.state,
            stats: inner.stats.clone(),
            started_at: inner.started_at,
            uptime_ms: inner.started_at.map(|t| now_ms() - t),
            config: inner.config.clone(),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.state != SchedulerState::Idle
    }

    /// One manual cycle outside the loop. Run statistics are left alone.
    pub async fn run_once(&self) -> Result<CycleReport, SchedulerError> {
        info!("Running manual analysis");
        self.cycle().await
    }

    async fn cycle(&self) -> Result<CycleReport, SchedulerError> {
        let started = Instant::now();
        let snapshots = self.source.fetch_snapshots().await?;

        let outcome = self.alerts.write().await.analyze(&snapshots);
        for alert in &outcome.new_alerts {
            // No subscribers is fine
            let _ = self.events.send(alert.clone());
        }

        Ok(CycleReport {
            aircraft_analyzed: outcome.aircraft_analyzed,
            new_alerts: outcome.new_alerts,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        debug!("Monitoring loop running");
        loop {
            let result = self.cycle().await;
            let delay = self.record(result).await;

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop.changed() => break,
            }
            if *stop.borrow() {
                break;
            }
        }
        debug!("Monitoring loop exited");
    }

    /// Update statistics and state for a finished cycle; returns the delay
    /// before the next one
    async fn record(&self, result: Result<CycleReport, SchedulerError>) -> Duration {
        let mut inner = self.inner.lock().await;
        inner.stats.total_runs += 1;
        inner.stats.last_run = Some(now_ms());

        match result {
            Ok(report) => {
                counter!("airport_watch_cycles_total", "outcome" => "success").increment(1);
                inner.stats.total_alerts_generated += report.new_alerts.len() as u64;
                if inner.stats.consecutive_failures > 0 {
                    info!(
                        "Cycle recovered after {} failures",
                        inner.stats.consecutive_failures
                    );
                }
                inner.stats.consecutive_failures = 0;
                inner.state = SchedulerState::Running;
                debug!(
                    "Cycle done: {} aircraft, {} alerts in {} ms",
                    report.aircraft_analyzed,
                    report.new_alerts.len(),
                    report.duration_ms
                );
                Duration::from_millis(inner.config.interval_ms)
            }
            Err(e) => {
                counter!("airport_watch_cycles_total", "outcome" => "failure").increment(1);
                inner.stats.errors += 1;
                inner.stats.consecutive_failures += 1;
                inner.stats.last_error = Some(e.to_string());

                let attempt = inner.stats.consecutive_failures;
                if attempt <= inner.config.max_retries {
                    warn!(
                        "Cycle failed (attempt {}/{}): {}",
                        attempt, inner.config.max_retries, e
                    );
                    inner.state = SchedulerState::Backoff { attempt };
                    Duration::from_millis(inner.config.retry_delay_ms)
                } else {
                    warn!(
                        "Cycle failed {} times in a row, back to normal interval: {}",
                        attempt, e
                    );
                    inner.state = SchedulerState::Running;
                    Duration::from_millis(inner.config.interval_ms)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{shared, AlertManager, AlertType};
    use telemetry::{AircraftSnapshot, ReplaySource, TelemetryError};

    fn scheduler(source: Arc<ReplaySource>) -> MonitoringScheduler {
        MonitoringScheduler::new(
            source,
            shared(AlertManager::default()),
            SchedulerConfig::default(),
        )
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_uses_retry_delay_then_resets() {
        let source = Arc::new(ReplaySource::scripted(vec![
            Err(TelemetryError::Upstream("503".into())),
            Ok(Vec::new()),
            Ok(Vec::new()),
        ]));
        let scheduler = scheduler(source.clone());
        scheduler.start(SchedulerConfigPatch::default()).await.unwrap();

        advance(1).await;
        assert_eq!(source.fetch_count(), 1);
        let status = scheduler.status().await;
        assert_eq!(status.state, SchedulerState::Backoff { attempt: 1 });
        assert_eq!(status.stats.consecutive_failures, 1);

        // Retry after 5 s
        advance(5_000).await;
        assert_eq!(source.fetch_count(), 2);
        let status = scheduler.status().await;
        assert_eq!(status.state, SchedulerState::Running);
        assert_eq!(status.stats.consecutive_failures, 0);
        assert_eq!(status.stats.errors, 1);
        assert_eq!(status.stats.total_runs, 2);

        // Then the normal 30 s interval
        advance(20_000).await;
        assert_eq!(source.fetch_count(), 2);
        advance(10_000).await;
        assert_eq!(source.fetch_count(), 3);

        scheduler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_fall_back_to_interval() {
        // Empty recording fails every fetch
        let source = Arc::new(ReplaySource::from_polls(Vec::new()));
        let scheduler = scheduler(source.clone());
        scheduler.start(SchedulerConfigPatch::default()).await.unwrap();

        // Failures at 0, 5, 10 and 15 s
        advance(16_000).await;
        assert_eq!(source.fetch_count(), 4);
        let status = scheduler.status().await;
        assert_eq!(status.state, SchedulerState::Running);
        assert_eq!(status.stats.consecutive_failures, 4);

        advance(28_000).await;
        assert_eq!(source.fetch_count(), 4);
        advance(2_000).await;
        assert_eq!(source.fetch_count(), 5);

        let stats = scheduler.stop().await.unwrap();
        assert_eq!(stats.errors, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_sleep() {
        let source = Arc::new(ReplaySource::from_polls(vec![Vec::new()]).with_loop(true));
        let scheduler = scheduler(source.clone());
        scheduler.start(SchedulerConfigPatch::default()).await.unwrap();
        advance(1).await;

        let before = Instant::now();
        let stats = scheduler.stop().await.unwrap();
        assert!(before.elapsed() < Duration::from_secs(1));
        assert_eq!(stats.total_runs, 1);
        assert!(!scheduler.is_running().await);

        // No further cycles after stop
        advance(60_000).await;
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_conflicts() {
        let source = Arc::new(ReplaySource::from_polls(vec![Vec::new()]).with_loop(true));
        let scheduler = scheduler(source);

        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));

        scheduler.start(SchedulerConfigPatch::default()).await.unwrap();
        let again = scheduler.start(SchedulerConfigPatch::default()).await;
        assert!(matches!(again, Err(SchedulerError::AlreadyRunning)));
        assert!(again.unwrap_err().is_conflict());

        scheduler.stop().await.unwrap();
        scheduler.start(SchedulerConfigPatch::default()).await.unwrap();
        scheduler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_patch_and_update_config() {
        let source = Arc::new(ReplaySource::from_polls(vec![Vec::new()]).with_loop(true));
        let scheduler = scheduler(source.clone());

        let config = scheduler
            .start(SchedulerConfigPatch {
                interval_ms: Some(10_000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(config.interval_ms, 10_000);
        assert_eq!(config.max_retries, 3);

        advance(10_001).await;
        assert_eq!(source.fetch_count(), 2);

        // Sleep already pending keeps its length; the next one uses the patch
        scheduler
            .update_config(SchedulerConfigPatch {
                interval_ms: Some(60_000),
                ..Default::default()
            })
            .await
            .unwrap();
        advance(10_000).await;
        assert_eq!(source.fetch_count(), 3);
        advance(50_000).await;
        assert_eq!(source.fetch_count(), 3);
        assert_eq!(scheduler.status().await.config.interval_ms, 60_000);

        scheduler.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_run_leaves_stats_and_broadcasts() {
        let hijack = AircraftSnapshot::new("4x1234", now_ms(), 32.0, 34.9).with_squawk(7500);
        let source = Arc::new(ReplaySource::from_polls(vec![vec![hijack]]));
        let scheduler = scheduler(source);
        let mut events = scheduler.subscribe();

        let report = scheduler.run_once().await.unwrap();
        assert_eq!(report.aircraft_analyzed, 1);
        assert!(report
            .new_alerts
            .iter()
            .any(|a| a.alert_type == AlertType::EmergencyCode));

        let event = events.recv().await.unwrap();
        assert_eq!(event.alert_type, AlertType::EmergencyCode);

        let status = scheduler.status().await;
        assert_eq!(status.stats.total_runs, 0);
        assert!(!status.is_running);
        assert_eq!(status.state, SchedulerState::Idle);
    }

    #[test]
    fn test_state_serializes_with_tag() {
        let json = serde_json::to_value(SchedulerState::Backoff { attempt: 2 }).unwrap();
        assert_eq!(json["state"], "BACKOFF");
        assert_eq!(json["attempt"], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delays_rejected() {
        let source = Arc::new(ReplaySource::from_polls(vec![Vec::new()]).with_loop(true));
        let scheduler = scheduler(source.clone());

        let err = scheduler
            .start(SchedulerConfigPatch {
                interval_ms: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(!scheduler.is_running().await);
        assert_eq!(source.fetch_count(), 0);

        scheduler.start(SchedulerConfigPatch::default()).await.unwrap();
        let err = scheduler
            .update_config(SchedulerConfigPatch {
                retry_delay_ms: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidConfig { field: "retryDelayMs", .. }));
        assert_eq!(scheduler.status().await.config, SchedulerConfig::default());

        // The loop still waits out its interval
        advance(10).await;
        assert_eq!(source.fetch_count(), 1);
        scheduler.stop().await.unwrap();
    }
}
