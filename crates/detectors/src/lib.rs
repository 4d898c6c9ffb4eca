//! Flight Anomaly Detectors
//!
//! Stateless heuristics evaluated against one aircraft's recent track:
//! - Sharp turns and northward diversions (heading changes)
//! - Holding patterns (loitering near a fixed point)
//! - Aborted approaches near the airport
//! - Emergency transponder codes
//! - Sudden speed / altitude changes
//!
//! Detectors never touch shared state; they return a [`Detection`] that the
//! alerting layer turns into an alert.

pub mod config;
pub mod detector;
pub mod geo;
pub mod kind;

mod approach;
mod holding;
mod squawk;
mod sudden;
mod turn;

pub use approach::ApproachAbortDetector;
pub use config::DetectionConfig;
pub use detector::{prior_snapshot, Detection, Detector, DetectorSet};
pub use holding::HoldingPatternDetector;
pub use kind::{AlertType, Severity};
pub use squawk::{EmergencyCodeDetector, EmergencyCodeType};
pub use sudden::{ChangeMetric, SuddenChangeDetector};
pub use turn::{NorthwardDiversionDetector, SharpTurnDetector};

use thiserror::Error;

/// Detector configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Unknown alert type: {0}")]
    UnknownAlertType(String),

    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),
}
