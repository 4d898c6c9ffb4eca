//! Flight data recorder
//!
//! Appends every poll to a window file shaped like a replay recording
//! (`[[snapshot, ...], ...]`) and keeps an append-only daily log of aircraft
//! squawking an emergency code. Runs on its own interval, independent of the
//! monitoring loop.

use crate::manager::StorageManager;
use crate::StorageError;
use alerting::AircraftRef;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use detectors::{EmergencyCodeType, Severity};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use telemetry::{AircraftSnapshot, TelemetryError, TelemetrySource};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const FLIGHTS_PREFIX: &str = "flights-";
const EMERGENCY_PREFIX: &str = "emergency-alerts-";

/// Recorder errors
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Recording is already running")]
    AlreadyRunning,
    #[error("Recording is not running")]
    NotRunning,
    #[error("Recording is disabled in the configuration")]
    Disabled,
    #[error("No aircraft data received")]
    NoData,
    #[error("Invalid recorder config {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("Telemetry fetch failed: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RecorderError {
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RecorderError::AlreadyRunning | RecorderError::NotRunning | RecorderError::Disabled
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, RecorderError::InvalidConfig { .. })
    }
}

/// Recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Manual triggers are refused when off
    pub enabled: bool,
    /// Start recording with the binary
    pub auto_start: bool,
    pub flights_directory: PathBuf,
    pub interval_ms: u64,
    /// Length of one window file, in minutes
    pub window_minutes: u32,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_start: false,
            flights_directory: PathBuf::from("./data/flights"),
            interval_ms: 30_000,
            window_minutes: 5,
        }
    }
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), RecorderError> {
        if self.interval_ms == 0 {
            return Err(RecorderError::InvalidConfig {
                field: "interval_ms",
                reason: "must be positive".to_string(),
            });
        }
        if !(1..=60).contains(&self.window_minutes) {
            return Err(RecorderError::InvalidConfig {
                field: "window_minutes",
                reason: format!("must be within 1..=60, got {}", self.window_minutes),
            });
        }
        Ok(())
    }
}

/// `flights-YYYY-MM-DD_HH-MM.json`, minute rounded down to the window
pub fn window_file_name(at: DateTime<Utc>, window_minutes: u32) -> String {
    let window = window_minutes.max(1);
    let minute = at.minute() / window * window;
    format!(
        "{}{}_{:02}-{:02}.json",
        FLIGHTS_PREFIX,
        at.format("%Y-%m-%d"),
        at.hour(),
        minute
    )
}

pub fn emergency_log_name(date: NaiveDate) -> String {
    format!("{}{}.json", EMERGENCY_PREFIX, date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyInfo {
    pub squawk_code: u16,
    #[serde(rename = "type")]
    pub code_type: EmergencyCodeType,
    pub severity: Severity,
}

/// One aircraft seen squawking an emergency code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRecord {
    pub id: String,
    pub timestamp: i64,
    pub aircraft: AircraftRef,
    pub emergency: EmergencyInfo,
}

/// Daily emergency log file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyLog {
    pub date: NaiveDate,
    pub last_updated: DateTime<Utc>,
    pub alerts: Vec<EmergencyRecord>,
    pub total_alerts: usize,
}

/// Aircraft squawking 7500, 7600 or 7700
pub fn detect_emergencies(snapshots: &[AircraftSnapshot], timestamp: i64) -> Vec<EmergencyRecord> {
    snapshots
        .iter()
        .filter_map(|snapshot| {
            let code = snapshot.status.squawk_code?;
            let code_type = EmergencyCodeType::from_code(code);
            if code_type == EmergencyCodeType::Unknown {
                return None;
            }
            Some(EmergencyRecord {
                id: format!("{}_{}_{}", snapshot.icao24, code, timestamp),
                timestamp,
                aircraft: AircraftRef::from(snapshot),
                emergency: EmergencyInfo {
                    squawk_code: code,
                    code_type,
                    severity: code_type.severity(),
                },
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionError {
    pub timestamp: i64,
    pub message: String,
}

/// Counters since the recorder was created
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub total_runs: u64,
    pub successful_runs: u64,
    pub last_run: Option<i64>,
    pub last_success: Option<i64>,
    pub last_error: Option<CollectionError>,
    /// Polls appended to window files
    pub window_writes: u64,
}

impl CollectionStats {
    /// Successful runs as a rounded percentage
    pub fn success_rate(&self) -> u32 {
        if self.total_runs == 0 {
            return 0;
        }
        (self.successful_runs as f64 * 100.0 / self.total_runs as f64).round() as u32
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStatus {
    pub is_running: bool,
    #[serde(flatten)]
    pub stats: CollectionStats,
    pub success_rate: u32,
    pub interval_ms: u64,
    pub next_run: Option<i64>,
    pub flights_directory: PathBuf,
    pub alerts_directory: PathBuf,
}

/// Result of one successful recording
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    pub aircraft_count: usize,
    pub emergency_alerts: usize,
    pub window_file: String,
    pub duration_ms: u64,
}

#[derive(Default)]
struct RecorderInner {
    stats: CollectionStats,
    running: bool,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

/// Records polls from a telemetry source. Cheap to clone; clones control
/// the same loop.
#[derive(Clone)]
pub struct FlightRecorder {
    source: Arc<dyn TelemetrySource>,
    storage: StorageManager,
    config: RecorderConfig,
    inner: Arc<Mutex<RecorderInner>>,
}

impl FlightRecorder {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        storage: StorageManager,
        config: RecorderConfig,
    ) -> Self {
        Self {
            source,
            storage,
            config,
            inner: Arc::new(Mutex::new(RecorderInner::default())),
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    fn status_of(&self, inner: &RecorderInner) -> RecorderStatus {
        RecorderStatus {
            is_running: inner.running,
            stats: inner.stats.clone(),
            success_rate: inner.stats.success_rate(),
            interval_ms: self.config.interval_ms,
            next_run: inner
                .stats
                .last_run
                .filter(|_| inner.running)
                .map(|t| t + self.config.interval_ms as i64),
            flights_directory: self.config.flights_directory.clone(),
            alerts_directory: self.storage.directory().to_path_buf(),
        }
    }

    pub async fn status(&self) -> RecorderStatus {
        let inner = self.inner.lock().await;
        self.status_of(&inner)
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.running
    }

    /// Start recording; the first poll is taken immediately
    pub async fn start(&self) -> Result<RecorderStatus, RecorderError> {
        self.config.validate()?;
        let mut inner = self.inner.lock().await;
        if inner.running {
            return Err(RecorderError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        inner.running = true;
        inner.stop_tx = Some(stop_tx);
        inner.task = Some(tokio::spawn(self.clone().run(stop_rx)));

        info!(
            "Flight recording started (every {} ms) into {}",
            self.config.interval_ms,
            self.config.flights_directory.display()
        );
        Ok(self.status_of(&inner))
    }

    pub async fn stop(&self) -> Result<RecorderStatus, RecorderError> {
        let (stop_tx, task) = {
            let mut inner = self.inner.lock().await;
            match inner.stop_tx.take() {
                Some(tx) if inner.running => (tx, inner.task.take()),
                _ => return Err(RecorderError::NotRunning),
            }
        };

        let _ = stop_tx.send(true);
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Recording loop ended abnormally: {}", e);
            }
        }

        let mut inner = self.inner.lock().await;
        inner.running = false;
        info!("Flight recording stopped after {} runs", inner.stats.total_runs);
        Ok(self.status_of(&inner))
    }

    /// One manual recording. Counts toward the statistics.
    pub async fn trigger(&self) -> Result<CollectionReport, RecorderError> {
        self.trigger_at(Utc::now()).await
    }

    pub async fn trigger_at(&self, at: DateTime<Utc>) -> Result<CollectionReport, RecorderError> {
        if !self.config.enabled {
            return Err(RecorderError::Disabled);
        }
        self.collect(at).await
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_millis(self.config.interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Failures are already counted and logged
                    let _ = self.collect(Utc::now()).await;
                }
                _ = stop.changed() => break,
            }
            if *stop.borrow() {
                break;
            }
        }
        debug!("Recording loop exited");
    }

    async fn collect(&self, at: DateTime<Utc>) -> Result<CollectionReport, RecorderError> {
        let started = Instant::now();
        let now = at.timestamp_millis();
        {
            let mut inner = self.inner.lock().await;
            inner.stats.total_runs += 1;
            inner.stats.last_run = Some(now);
        }

        let result = self.record_poll(at, started).await;

        let mut inner = self.inner.lock().await;
        match &result {
            Ok(report) => {
                counter!("airport_watch_collections_total", "outcome" => "success").increment(1);
                inner.stats.successful_runs += 1;
                inner.stats.window_writes += 1;
                inner.stats.last_success = Some(now);
                inner.stats.last_error = None;
                debug!(
                    "Recorded {} aircraft into {} ({} emergencies)",
                    report.aircraft_count, report.window_file, report.emergency_alerts
                );
            }
            Err(e) => {
                counter!("airport_watch_collections_total", "outcome" => "failure").increment(1);
                warn!("Flight recording failed: {}", e);
                inner.stats.last_error = Some(CollectionError {
                    timestamp: now,
                    message: e.to_string(),
                });
            }
        }
        result
    }

    async fn record_poll(
        &self,
        at: DateTime<Utc>,
        started: Instant,
    ) -> Result<CollectionReport, RecorderError> {
        let snapshots = self.source.fetch_snapshots().await?;
        if snapshots.is_empty() {
            return Err(RecorderError::NoData);
        }

        let window_file = window_file_name(at, self.config.window_minutes);
        let path = self.config.flights_directory.join(&window_file);
        let mut polls: Vec<Vec<AircraftSnapshot>> =
            self.storage.load(&path).await?.unwrap_or_default();
        let aircraft_count = snapshots.len();
        let emergencies = detect_emergencies(&snapshots, at.timestamp_millis());
        polls.push(snapshots);
        self.storage.write_json(&path, &polls).await?;

        if !emergencies.is_empty() {
            self.append_emergencies(at, &emergencies).await?;
        }

        Ok(CollectionReport {
            aircraft_count,
            emergency_alerts: emergencies.len(),
            window_file,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn append_emergencies(
        &self,
        at: DateTime<Utc>,
        records: &[EmergencyRecord],
    ) -> Result<(), StorageError> {
        let date = at.date_naive();
        let path = self.storage.directory().join(emergency_log_name(date));
        let mut log = self
            .storage
            .load::<EmergencyLog>(&path)
            .await?
            .unwrap_or(EmergencyLog {
                date,
                last_updated: at,
                alerts: Vec::new(),
                total_alerts: 0,
            });

        log.alerts.extend_from_slice(records);
        log.total_alerts = log.alerts.len();
        log.last_updated = at;
        self.storage.write_json(&path, &log).await?;

        for record in records {
            warn!(
                "EMERGENCY: {} squawking {} ({})",
                record
                    .aircraft
                    .callsign
                    .as_deref()
                    .unwrap_or(&record.aircraft.icao24),
                record.emergency.squawk_code,
                record.emergency.code_type.as_str()
            );
        }
        Ok(())
    }
}
