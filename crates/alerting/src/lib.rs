//! Alerting System
//!
//! Turns detector output into deduplicated alerts, synthesizes fleet-level
//! alerts across aircraft, and expires alerts past their retention window.

mod aggregate;
mod alert;
mod config;
mod manager;

pub use alert::{generate_alert_id, AircraftRef, Alert};
pub use config::{
    AlertConfig, CompositeConfig, MultipleDiversionsConfig, TrafficStopConfig,
};
pub use detectors::{AlertType, Severity};
pub use manager::{AlertManager, AlertStats, AnalysisOutcome, CooldownKey};

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Alert manager shared between the scheduler, the service facade and the
/// persistence task
pub type SharedAlertManager = Arc<RwLock<AlertManager>>;

/// Wrap a manager for sharing
pub fn shared(manager: AlertManager) -> SharedAlertManager {
    Arc::new(RwLock::new(manager))
}

/// Non-blocking save request issued when an urgent alert is created
pub trait SaveTrigger: Send + Sync {
    /// Queue a save of the current alert set. Returns false when the request
    /// could not be queued; callers never wait on the save itself.
    fn request_save(&self) -> bool;
}

/// Alert configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Detection(#[from] detectors::DetectorConfigError),
}
