//! Telemetry source seam

use crate::{AircraftSnapshot, TelemetryError};
use async_trait::async_trait;

/// Anything that can produce one poll worth of aircraft snapshots.
///
/// Implementations perform their own network-level retry before returning;
/// callers only retry whole analysis cycles.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Fetch the current state of every aircraft in the monitored area
    async fn fetch_snapshots(&self) -> Result<Vec<AircraftSnapshot>, TelemetryError>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "telemetry"
    }
}
