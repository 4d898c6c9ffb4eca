//! Detector configuration
//!
//! Defaults are tuned for high sensitivity around a busy airport. Durations
//! are in milliseconds, distances in metres, speeds in knots.

use crate::DetectorConfigError;
use serde::{Deserialize, Serialize};

/// Sharp turn thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharpTurnConfig {
    pub enabled: bool,
    /// Minimum heading change between consecutive samples (degrees)
    pub min_angle_change: f64,
    /// Maximum gap between the two samples
    pub time_window_ms: i64,
    /// Turns at or above this angle are raised as HIGH instead of MEDIUM
    pub high_severity_angle: f64,
}

impl Default for SharpTurnConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_angle_change: 20.0,
            time_window_ms: 90_000,
            high_severity_angle: 90.0,
        }
    }
}

/// Holding pattern thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldingPatternConfig {
    pub enabled: bool,
    /// Cumulative unsigned heading change over the window (degrees)
    pub min_circular_movement: f64,
    /// All samples must stay within this distance of their centroid
    pub max_radius_m: f64,
    /// Average ground speed ceiling
    pub max_speed_knots: f64,
    /// Number of most recent samples examined
    pub samples: usize,
}

impl Default for HoldingPatternConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_circular_movement: 180.0,
            max_radius_m: 8000.0,
            max_speed_knots: 300.0,
            samples: 10,
        }
    }
}

/// Northward diversion thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NorthwardDiversionConfig {
    pub enabled: bool,
    /// Sector start (degrees); the sector wraps through 360 when min > max
    pub sector_min: f64,
    /// Sector end (degrees)
    pub sector_max: f64,
    pub min_angle_change: f64,
}

impl Default for NorthwardDiversionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sector_min: 300.0,
            sector_max: 60.0,
            min_angle_change: 15.0,
        }
    }
}

/// Aborted approach thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApproachAbortConfig {
    pub enabled: bool,
    /// Distance from the airport reference point
    pub airport_radius_m: f64,
    pub max_approach_altitude_ft: f64,
    pub min_deviation_angle: f64,
}

impl Default for ApproachAbortConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            airport_radius_m: 25_000.0,
            max_approach_altitude_ft: 5000.0,
            min_deviation_angle: 15.0,
        }
    }
}

/// Emergency transponder codes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyCodeConfig {
    pub enabled: bool,
    pub codes: Vec<u16>,
}

impl Default for EmergencyCodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            codes: vec![7700, 7600, 7500, 7400, 7777],
        }
    }
}

/// Sudden ground speed change thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuddenSpeedConfig {
    pub enabled: bool,
    /// Change relative to the prior speed (percent)
    pub min_change_pct: f64,
    pub time_window_ms: i64,
}

impl Default for SuddenSpeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_change_pct: 30.0,
            time_window_ms: 60_000,
        }
    }
}

/// Sudden altitude change thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuddenAltitudeConfig {
    pub enabled: bool,
    pub min_change_ft: f64,
    pub time_window_ms: i64,
}

impl Default for SuddenAltitudeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_change_ft: 500.0,
            time_window_ms: 60_000,
        }
    }
}

/// Thresholds for every per-aircraft detector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub sharp_turn: SharpTurnConfig,
    pub holding_pattern: HoldingPatternConfig,
    pub northward_diversion: NorthwardDiversionConfig,
    pub approach_abort: ApproachAbortConfig,
    pub emergency_codes: EmergencyCodeConfig,
    pub sudden_speed_change: SuddenSpeedConfig,
    pub sudden_altitude_change: SuddenAltitudeConfig,
}

fn non_negative(field: &'static str, value: f64) -> Result<(), DetectorConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DetectorConfigError::Invalid {
            field,
            reason: format!("must be a non-negative number, got {}", value),
        })
    }
}

fn heading(field: &'static str, value: f64) -> Result<(), DetectorConfigError> {
    if (0.0..=360.0).contains(&value) {
        Ok(())
    } else {
        Err(DetectorConfigError::Invalid {
            field,
            reason: format!("must be within [0, 360], got {}", value),
        })
    }
}

fn window(field: &'static str, value: i64) -> Result<(), DetectorConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(DetectorConfigError::Invalid {
            field,
            reason: format!("must be positive, got {}", value),
        })
    }
}

impl DetectionConfig {
    /// Check thresholds are usable
    pub fn validate(&self) -> Result<(), DetectorConfigError> {
        non_negative("sharp_turn.min_angle_change", self.sharp_turn.min_angle_change)?;
        window("sharp_turn.time_window_ms", self.sharp_turn.time_window_ms)?;

        let hp = &self.holding_pattern;
        non_negative("holding_pattern.min_circular_movement", hp.min_circular_movement)?;
        non_negative("holding_pattern.max_radius_m", hp.max_radius_m)?;
        non_negative("holding_pattern.max_speed_knots", hp.max_speed_knots)?;
        if hp.samples < 2 {
            return Err(DetectorConfigError::Invalid {
                field: "holding_pattern.samples",
                reason: format!("needs at least 2 samples, got {}", hp.samples),
            });
        }

        heading("northward_diversion.sector_min", self.northward_diversion.sector_min)?;
        heading("northward_diversion.sector_max", self.northward_diversion.sector_max)?;
        non_negative(
            "northward_diversion.min_angle_change",
            self.northward_diversion.min_angle_change,
        )?;

        non_negative("approach_abort.airport_radius_m", self.approach_abort.airport_radius_m)?;
        non_negative(
            "approach_abort.min_deviation_angle",
            self.approach_abort.min_deviation_angle,
        )?;

        non_negative(
            "sudden_speed_change.min_change_pct",
            self.sudden_speed_change.min_change_pct,
        )?;
        window(
            "sudden_speed_change.time_window_ms",
            self.sudden_speed_change.time_window_ms,
        )?;
        non_negative(
            "sudden_altitude_change.min_change_ft",
            self.sudden_altitude_change.min_change_ft,
        )?;
        window(
            "sudden_altitude_change.time_window_ms",
            self.sudden_altitude_change.time_window_ms,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DetectionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_sector() {
        let mut config = DetectionConfig::default();
        config.northward_diversion.sector_min = 400.0;
        assert!(matches!(
            config.validate(),
            Err(DetectorConfigError::Invalid { field: "northward_diversion.sector_min", .. })
        ));
    }

    #[test]
    fn test_rejects_tiny_holding_window() {
        let mut config = DetectionConfig::default();
        config.holding_pattern.samples = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: DetectionConfig =
            serde_json::from_str(r#"{ "sharp_turn": { "min_angle_change": 45.0 } }"#).unwrap();
        assert_eq!(config.sharp_turn.min_angle_change, 45.0);
        assert_eq!(config.sharp_turn.time_window_ms, 90_000);
        assert_eq!(config.emergency_codes.codes.len(), 5);
    }
}
