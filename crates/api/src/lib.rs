//! Airport Watch Service
//!
//! Facade over the alert engine: loads settings, wires the telemetry
//! source, alert manager, storage writer and monitoring scheduler, and
//! exposes every operation as a uniform [`ApiResponse`].

mod logging;
mod response;
mod service;
mod settings;

pub use logging::{init_logging, parse_level};
pub use response::{AlertList, ApiResponse, ErrorKind, ServiceError};
pub use service::{
    AlertFilter, AlertService, ClearBody, ConfigBody, DailyBody, DailyFilesBody, InitReport,
    ReloadBody, StatsBody,
};
pub use settings::{
    LoggingSettings, MonitoringSettings, Settings, SettingsError, TelemetrySettings,
    DEFAULT_SETTINGS_FILE, SETTINGS_PATH_ENV,
};
