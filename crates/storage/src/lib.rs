//! Storage Layer
//!
//! Persists the alert set as JSON files: a current snapshot, one file per
//! UTC day, and a deduplicated historical archive. Unreadable files are
//! quarantined under `backups/` instead of failing the load. The flight
//! recorder writes raw polls in the replay format alongside.

mod files;
mod manager;
mod recorder;
mod writer;

pub use files::{
    CurrentFile, CurrentMetadata, DailyFile, DailyFileInfo, DailyMetadata, HistoricalFile,
    HistoricalMetadata,
};
pub use manager::{SaveReport, StorageConfig, StorageManager, MAX_RANGE_DAYS};
pub use recorder::{
    detect_emergencies, emergency_log_name, window_file_name, CollectionError, CollectionReport,
    CollectionStats, EmergencyInfo, EmergencyLog, EmergencyRecord, FlightRecorder,
    RecorderConfig, RecorderError, RecorderStatus,
};
pub use writer::{StorageWriter, WeakSaveTrigger, WriteCommand, WriterHandle};

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Storage initialization failed for {path}: {reason}")]
    FatalInit { path: PathBuf, reason: String },
    #[error("Invalid date range {start}..{end}: {reason}")]
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },
    #[error("Storage writer is not running")]
    WriterClosed,
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    /// Caller supplied bad input, as opposed to a storage failure
    pub fn is_validation(&self) -> bool {
        matches!(self, StorageError::InvalidRange { .. })
    }
}
