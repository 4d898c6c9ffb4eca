//! Emergency transponder codes

use crate::config::EmergencyCodeConfig;
use crate::detector::{Detection, Detector};
use crate::{AlertType, Severity};
use serde::{Deserialize, Serialize};
use serde_json::json;
use telemetry::AircraftSnapshot;

/// Meaning of a reserved squawk code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmergencyCodeType {
    Hijack,
    RadioFailure,
    GeneralEmergency,
    /// Configured as an emergency code without a known meaning
    Unknown,
}

impl EmergencyCodeType {
    pub fn from_code(code: u16) -> Self {
        match code {
            7500 => EmergencyCodeType::Hijack,
            7600 => EmergencyCodeType::RadioFailure,
            7700 => EmergencyCodeType::GeneralEmergency,
            _ => EmergencyCodeType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyCodeType::Hijack => "HIJACK",
            EmergencyCodeType::RadioFailure => "RADIO_FAILURE",
            EmergencyCodeType::GeneralEmergency => "GENERAL_EMERGENCY",
            EmergencyCodeType::Unknown => "UNKNOWN",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            EmergencyCodeType::Hijack | EmergencyCodeType::GeneralEmergency => Severity::Critical,
            EmergencyCodeType::RadioFailure | EmergencyCodeType::Unknown => Severity::High,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            EmergencyCodeType::Hijack => "Unlawful interference (hijack)",
            EmergencyCodeType::RadioFailure => "Radio communication failure",
            EmergencyCodeType::GeneralEmergency => "General emergency",
            EmergencyCodeType::Unknown => "Special-purpose code",
        }
    }
}

/// Stateless check of the current squawk against the configured code set
pub struct EmergencyCodeDetector {
    config: EmergencyCodeConfig,
}

impl EmergencyCodeDetector {
    pub fn new(config: EmergencyCodeConfig) -> Self {
        Self { config }
    }
}

impl Detector for EmergencyCodeDetector {
    fn alert_type(&self) -> AlertType {
        AlertType::EmergencyCode
    }

    fn min_history(&self) -> usize {
        1
    }

    fn evaluate(
        &self,
        current: &AircraftSnapshot,
        _history: &[AircraftSnapshot],
    ) -> Option<Detection> {
        let code = current.status.squawk_code?;
        if !self.config.codes.contains(&code) {
            return None;
        }

        let code_type = EmergencyCodeType::from_code(code);
        Some(Detection::new(
            AlertType::EmergencyCode,
            code_type.severity(),
            json!({
                "squawkCode": code,
                "codeType": code_type.as_str(),
                "description": code_type.description(),
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> EmergencyCodeDetector {
        EmergencyCodeDetector::new(EmergencyCodeConfig::default())
    }

    #[test]
    fn test_hijack_is_critical() {
        // Other fields are irrelevant: on the ground, no heading, no speed
        let current = AircraftSnapshot::new("4x1234", 0, 0.0, 0.0)
            .with_squawk(7500)
            .on_ground(true);

        let detection = detector().evaluate(&current, &[]).unwrap();
        assert_eq!(detection.alert_type, AlertType::EmergencyCode);
        assert_eq!(detection.severity, Severity::Critical);
        assert_eq!(detection.details["codeType"], "HIJACK");
        assert_eq!(detection.details["squawkCode"], 7500);
    }

    #[test]
    fn test_radio_failure() {
        let current = AircraftSnapshot::new("4x1234", 0, 32.0, 34.9).with_squawk(7600);
        let detection = detector().evaluate(&current, &[]).unwrap();
        assert_eq!(detection.severity, Severity::High);
        assert_eq!(detection.details["codeType"], "RADIO_FAILURE");
    }

    #[test]
    fn test_configured_code_without_mapping_is_unknown() {
        let current = AircraftSnapshot::new("4x1234", 0, 32.0, 34.9).with_squawk(7777);
        let detection = detector().evaluate(&current, &[]).unwrap();
        assert_eq!(detection.details["codeType"], "UNKNOWN");

        let custom = EmergencyCodeDetector::new(EmergencyCodeConfig {
            enabled: true,
            codes: vec![1234],
        });
        let current = AircraftSnapshot::new("4x1234", 0, 32.0, 34.9).with_squawk(1234);
        assert_eq!(
            custom.evaluate(&current, &[]).unwrap().details["codeType"],
            "UNKNOWN"
        );
    }

    #[test]
    fn test_ordinary_squawk_ignored() {
        let current = AircraftSnapshot::new("4x1234", 0, 32.0, 34.9).with_squawk(1200);
        assert!(detector().evaluate(&current, &[]).is_none());

        let silent = AircraftSnapshot::new("4x1234", 0, 32.0, 34.9);
        assert!(detector().evaluate(&silent, &[]).is_none());
    }

    #[test]
    fn test_unconfigured_emergency_code_ignored() {
        let narrow = EmergencyCodeDetector::new(EmergencyCodeConfig {
            enabled: true,
            codes: vec![7700],
        });
        let current = AircraftSnapshot::new("4x1234", 0, 32.0, 34.9).with_squawk(7500);
        assert!(narrow.evaluate(&current, &[]).is_none());
    }
}
