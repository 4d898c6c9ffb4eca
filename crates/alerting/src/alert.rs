//! Alert record

use detectors::{AlertType, Severity};
use serde::{Deserialize, Serialize};
use telemetry::{AircraftSnapshot, Movement, Position};
use uuid::Uuid;

/// Copy of the aircraft identity and kinematics at alert time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftRef {
    pub icao24: String,
    #[serde(default)]
    pub callsign: Option<String>,
    pub position: Position,
    #[serde(default)]
    pub movement: Movement,
}

impl From<&AircraftSnapshot> for AircraftRef {
    fn from(snapshot: &AircraftSnapshot) -> Self {
        Self {
            icao24: snapshot.icao24.clone(),
            callsign: snapshot.callsign.clone(),
            position: snapshot.position,
            movement: snapshot.movement,
        }
    }
}

/// A raised alert. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    /// Creation time (ms since epoch)
    pub timestamp: i64,
    /// None for fleet-level alerts
    pub aircraft: Option<AircraftRef>,
    pub details: serde_json::Value,
    pub active: bool,
}

impl Alert {
    pub fn new(
        alert_type: AlertType,
        severity: Severity,
        timestamp: i64,
        aircraft: Option<AircraftRef>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: generate_alert_id(alert_type, timestamp),
            alert_type,
            severity,
            timestamp,
            aircraft,
            details,
            active: true,
        }
    }

    /// ICAO address of the aircraft, if any
    pub fn icao24(&self) -> Option<&str> {
        self.aircraft.as_ref().map(|a| a.icao24.as_str())
    }
}

/// `TYPE_timestamp_suffix`, suffix being 9 characters of a random v4 UUID
pub fn generate_alert_id(alert_type: AlertType, timestamp: i64) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", alert_type.as_str(), timestamp, &uuid[..9])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_format() {
        let id = generate_alert_id(AlertType::SharpTurn, 1_700_000_000_000);
        assert!(id.starts_with("SHARP_TURN_1700000000000_"));
        assert_eq!(id.rsplit('_').next().unwrap().len(), 9);

        let other = generate_alert_id(AlertType::SharpTurn, 1_700_000_000_000);
        assert_ne!(id, other);
    }

    #[test]
    fn test_wire_shape() {
        let snapshot = AircraftSnapshot::new("4x1234", 0, 32.0, 34.9)
            .with_callsign("ELY001")
            .with_heading(90.0);
        let alert = Alert::new(
            AlertType::EmergencyCode,
            Severity::Critical,
            1_000,
            Some(AircraftRef::from(&snapshot)),
            json!({ "squawkCode": 7500 }),
        );

        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["type"], "EMERGENCY_CODE");
        assert_eq!(value["severity"], "CRITICAL");
        assert_eq!(value["active"], true);
        assert_eq!(value["aircraft"]["icao24"], "4x1234");
        assert_eq!(value["aircraft"]["movement"]["headingDegrees"], 90.0);

        let back: Alert = serde_json::from_value(value).unwrap();
        assert_eq!(back, alert);
    }

    #[test]
    fn test_fleet_alert_has_null_aircraft() {
        let alert = Alert::new(
            AlertType::SecurityAlert,
            Severity::High,
            1_000,
            None,
            json!({}),
        );
        let value = serde_json::to_value(&alert).unwrap();
        assert!(value["aircraft"].is_null());
        assert_eq!(alert.icao24(), None);
    }
}
