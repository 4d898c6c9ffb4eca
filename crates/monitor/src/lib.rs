//! Monitoring Scheduler
//!
//! Drives repeated fetch, detect and alert cycles on an interval, retrying
//! failed cycles with a short delay before falling back to the normal
//! cadence.

mod scheduler;

pub use scheduler::{
    CycleReport, MonitoringScheduler, MonitoringStatus, RunStats, SchedulerConfig,
    SchedulerConfigPatch, SchedulerState,
};

use telemetry::TelemetryError;
use thiserror::Error;

/// Scheduler errors
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    #[error("Monitoring is already running")]
    AlreadyRunning,
    #[error("Monitoring is not running")]
    NotRunning,
    #[error("Invalid monitoring config {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("Telemetry fetch failed: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl SchedulerError {
    /// Misuse of the start/stop lifecycle, as opposed to a cycle failure
    pub fn is_conflict(&self) -> bool {
        matches!(self, SchedulerError::AlreadyRunning | SchedulerError::NotRunning)
    }

    /// Rejected config patch
    pub fn is_validation(&self) -> bool {
        matches!(self, SchedulerError::InvalidConfig { .. })
    }
}
