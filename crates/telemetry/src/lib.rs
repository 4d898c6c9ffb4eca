//! Aircraft Telemetry
//!
//! Data model for per-aircraft state snapshots near a monitored airport,
//! plus the [`TelemetrySource`] seam the monitoring core polls.

mod airport;
mod error;
mod replay;
mod snapshot;
mod source;

pub use airport::{AirportReference, BoundingBox};
pub use error::TelemetryError;
pub use replay::ReplaySource;
pub use snapshot::{AircraftSnapshot, Movement, Position, Status};
pub use source::TelemetrySource;

/// Unit conversion constants used by acquisition clients
pub mod units {
    /// Metres to feet
    pub const FEET_PER_METER: f64 = 3.28084;
    /// Metres per second to knots
    pub const KNOTS_PER_MPS: f64 = 1.94384;
    /// Metres per second to feet per minute
    pub const FPM_PER_MPS: f64 = 196.85;
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
