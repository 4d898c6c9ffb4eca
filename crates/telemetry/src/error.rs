//! Telemetry Error Types

use thiserror::Error;

/// Errors that can occur while fetching aircraft telemetry
#[derive(Debug, Clone, Error)]
pub enum TelemetryError {
    /// Upstream feed returned an error or could not be reached
    #[error("Upstream feed error: {0}")]
    Upstream(String),

    /// Timeout waiting for the feed
    #[error("Timeout waiting for telemetry after {0}ms")]
    Timeout(u64),

    /// Payload could not be decoded into snapshots
    #[error("Invalid telemetry payload: {0}")]
    InvalidPayload(String),

    /// Recorded feed has no more polls
    #[error("Telemetry feed exhausted")]
    Exhausted,

    /// Local I/O failure (replay files)
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::InvalidPayload(err.to_string())
    }
}
