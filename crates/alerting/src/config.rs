//! Alert configuration

use crate::AlertConfigError;
use detectors::{DetectionConfig, Severity};
use serde::{Deserialize, Serialize};

/// Composite security alert settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    pub enabled: bool,
    /// Alerts inside the window needed to raise a security alert
    pub min_events: usize,
    pub time_window_ms: i64,
    pub severity: Severity,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_events: 2,
            time_window_ms: 10 * 60 * 1000,
            severity: Severity::High,
        }
    }
}

/// Several aircraft diverting north at once
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipleDiversionsConfig {
    pub enabled: bool,
    pub min_aircraft: usize,
    pub time_window_ms: i64,
}

impl Default for MultipleDiversionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_aircraft: 1,
            time_window_ms: 3 * 60 * 1000,
        }
    }
}

/// Sharp drop of observed traffic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficStopConfig {
    pub enabled: bool,
    /// Drop relative to the recent peak (percent)
    pub min_reduction_pct: f64,
    /// Peak below this is too thin to judge
    pub min_baseline_aircraft: usize,
    pub time_window_ms: i64,
}

impl Default for TrafficStopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_reduction_pct: 40.0,
            min_baseline_aircraft: 3,
            time_window_ms: 3 * 60 * 1000,
        }
    }
}

/// Alert manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Alerts older than this are dropped by cleanup (default: 30 minutes)
    pub retention_ms: i64,
    /// Minimum gap between alerts of the same type for the same aircraft
    /// (default: 2 minutes)
    pub cooldown_ms: i64,
    pub detection: DetectionConfig,
    pub composite: CompositeConfig,
    pub multiple_diversions: MultipleDiversionsConfig,
    pub traffic_stop: TrafficStopConfig,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            retention_ms: 30 * 60 * 1000,
            cooldown_ms: 2 * 60 * 1000,
            detection: DetectionConfig::default(),
            composite: CompositeConfig::default(),
            multiple_diversions: MultipleDiversionsConfig::default(),
            traffic_stop: TrafficStopConfig::default(),
        }
    }
}

fn positive(field: &'static str, value: i64) -> Result<(), AlertConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(AlertConfigError::Invalid {
            field,
            reason: format!("must be positive, got {}", value),
        })
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), AlertConfigError> {
        positive("retention_ms", self.retention_ms)?;
        if self.cooldown_ms < 0 {
            return Err(AlertConfigError::Invalid {
                field: "cooldown_ms",
                reason: format!("must not be negative, got {}", self.cooldown_ms),
            });
        }
        positive("composite.time_window_ms", self.composite.time_window_ms)?;
        if self.composite.min_events == 0 {
            return Err(AlertConfigError::Invalid {
                field: "composite.min_events",
                reason: "must be at least 1".to_string(),
            });
        }
        positive(
            "multiple_diversions.time_window_ms",
            self.multiple_diversions.time_window_ms,
        )?;
        positive("traffic_stop.time_window_ms", self.traffic_stop.time_window_ms)?;
        if !(0.0..=100.0).contains(&self.traffic_stop.min_reduction_pct) {
            return Err(AlertConfigError::Invalid {
                field: "traffic_stop.min_reduction_pct",
                reason: format!(
                    "must be within [0, 100], got {}",
                    self.traffic_stop.min_reduction_pct
                ),
            });
        }
        self.detection.validate()?;
        Ok(())
    }
}
