//! Alert types and severities

use crate::DetectorConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Alert severity, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// High and critical alerts are persisted immediately
    pub fn is_urgent(&self) -> bool {
        *self >= Severity::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = DetectorConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DetectorConfigError::UnknownSeverity(s.to_string()))
    }
}

/// Kind of alert raised by the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    SharpTurn,
    HoldingPattern,
    NorthwardDiversion,
    ApproachAbort,
    EmergencyCode,
    SuddenSpeedChange,
    SuddenAltitudeChange,
    /// Several aircraft diverting north within a short window
    MultipleDiversions,
    /// Sharp drop in the number of aircraft in the area
    TrafficStop,
    /// Composite alert driven by overall alert volume
    SecurityAlert,
}

impl AlertType {
    pub const ALL: [AlertType; 10] = [
        AlertType::SharpTurn,
        AlertType::HoldingPattern,
        AlertType::NorthwardDiversion,
        AlertType::ApproachAbort,
        AlertType::EmergencyCode,
        AlertType::SuddenSpeedChange,
        AlertType::SuddenAltitudeChange,
        AlertType::MultipleDiversions,
        AlertType::TrafficStop,
        AlertType::SecurityAlert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::SharpTurn => "SHARP_TURN",
            AlertType::HoldingPattern => "HOLDING_PATTERN",
            AlertType::NorthwardDiversion => "NORTHWARD_DIVERSION",
            AlertType::ApproachAbort => "APPROACH_ABORT",
            AlertType::EmergencyCode => "EMERGENCY_CODE",
            AlertType::SuddenSpeedChange => "SUDDEN_SPEED_CHANGE",
            AlertType::SuddenAltitudeChange => "SUDDEN_ALTITUDE_CHANGE",
            AlertType::MultipleDiversions => "MULTIPLE_DIVERSIONS",
            AlertType::TrafficStop => "TRAFFIC_STOP",
            AlertType::SecurityAlert => "SECURITY_ALERT",
        }
    }

    /// Aggregate alerts are synthesized from other alerts or fleet-wide
    /// counts rather than a single aircraft's track.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            AlertType::MultipleDiversions | AlertType::TrafficStop | AlertType::SecurityAlert
        )
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = DetectorConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DetectorConfigError::UnknownAlertType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::High.is_urgent());
        assert!(!Severity::Medium.is_urgent());
    }

    #[test]
    fn test_parse_round_trips_wire_names() {
        for t in AlertType::ALL {
            assert_eq!(t.as_str().parse::<AlertType>().unwrap(), t);
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(
            "BARREL_ROLL".parse::<AlertType>(),
            Err(DetectorConfigError::UnknownAlertType(_))
        ));
        assert!("SEVERE".parse::<Severity>().is_err());
    }
}
