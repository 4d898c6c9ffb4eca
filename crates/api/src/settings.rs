//! Layered settings: optional TOML file, then `AIRPORT_WATCH__*` env vars

use alerting::{AlertConfig, AlertConfigError};
use config::{Config, ConfigError, Environment, File};
use monitor::{SchedulerConfig, SchedulerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storage::{RecorderConfig, RecorderError, StorageConfig};
use telemetry::AirportReference;
use thiserror::Error;

/// Default settings file, looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "airport-watch.toml";
/// Env var overriding the settings file path
pub const SETTINGS_PATH_ENV: &str = "AIRPORT_WATCH_CONFIG";
const ENV_PREFIX: &str = "AIRPORT_WATCH";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] ConfigError),
    #[error(transparent)]
    Alerts(#[from] AlertConfigError),
    #[error(transparent)]
    Monitoring(#[from] SchedulerError),
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Telemetry feed settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Recorded polls to replay (`[[snapshot, ...], ...]`)
    pub replay_file: Option<PathBuf>,
    /// Start over when the recording ends
    pub loop_replay: bool,
}

/// Monitoring loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    /// Start monitoring as soon as the binary is up
    pub auto_start: bool,
    #[serde(flatten)]
    pub scheduler: SchedulerConfig,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            auto_start: true,
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub airport: AirportReference,
    pub telemetry: TelemetrySettings,
    pub monitoring: MonitoringSettings,
    pub alerts: AlertConfig,
    pub storage: StorageConfig,
    pub recorder: RecorderConfig,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load from `$AIRPORT_WATCH_CONFIG` or `airport-watch.toml`, then env
    pub fn load() -> Result<Self, SettingsError> {
        let path = std::env::var(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_FILE));
        Self::from_file(&path)
    }

    /// Load from a specific file (missing is fine), then env
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(-90.0..=90.0).contains(&self.airport.latitude) {
            return Err(SettingsError::Invalid {
                field: "airport.latitude",
                reason: format!("out of range: {}", self.airport.latitude),
            });
        }
        if !(-180.0..=180.0).contains(&self.airport.longitude) {
            return Err(SettingsError::Invalid {
                field: "airport.longitude",
                reason: format!("out of range: {}", self.airport.longitude),
            });
        }
        self.monitoring.scheduler.validate()?;
        if self.storage.save_interval_ms == 0 {
            return Err(SettingsError::Invalid {
                field: "storage.save_interval_ms",
                reason: "must be positive".to_string(),
            });
        }
        self.alerts.validate()?;
        self.recorder.validate()?;
        Ok(())
    }
}
