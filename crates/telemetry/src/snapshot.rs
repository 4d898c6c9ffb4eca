//! Aircraft State Snapshot

use serde::{Deserialize, Serialize};

/// Geographic position of an aircraft
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Barometric altitude in feet, absent when not reported
    #[serde(default)]
    pub altitude_feet: Option<f64>,
}

/// Velocity vector of an aircraft
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    #[serde(default)]
    pub ground_speed_knots: f64,
    /// True track over ground, clockwise from north
    #[serde(default)]
    pub heading_degrees: Option<f64>,
    #[serde(default)]
    pub vertical_rate_fpm: f64,
}

/// Transponder status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default)]
    pub on_ground: bool,
    #[serde(default)]
    pub squawk_code: Option<u16>,
}

/// A single observation of one aircraft at one poll.
///
/// Snapshots are immutable once captured; history and alerts keep their own
/// copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftSnapshot {
    /// ICAO 24-bit address, lowercase hex
    pub icao24: String,
    #[serde(default)]
    pub callsign: Option<String>,
    /// Observation time (ms since epoch)
    pub timestamp: i64,
    pub position: Position,
    #[serde(default)]
    pub movement: Movement,
    #[serde(default)]
    pub status: Status,
}

impl AircraftSnapshot {
    /// Create a snapshot with position only; other fields default to unknown
    pub fn new(icao24: impl Into<String>, timestamp: i64, latitude: f64, longitude: f64) -> Self {
        Self {
            icao24: icao24.into(),
            callsign: None,
            timestamp,
            position: Position {
                latitude,
                longitude,
                altitude_feet: None,
            },
            movement: Movement::default(),
            status: Status::default(),
        }
    }

    pub fn with_callsign(mut self, callsign: impl Into<String>) -> Self {
        self.callsign = Some(callsign.into());
        self
    }

    pub fn with_altitude(mut self, feet: f64) -> Self {
        self.position.altitude_feet = Some(feet);
        self
    }

    pub fn with_heading(mut self, degrees: f64) -> Self {
        self.movement.heading_degrees = Some(degrees);
        self
    }

    pub fn with_speed(mut self, knots: f64) -> Self {
        self.movement.ground_speed_knots = knots;
        self
    }

    pub fn with_vertical_rate(mut self, fpm: f64) -> Self {
        self.movement.vertical_rate_fpm = fpm;
        self
    }

    pub fn with_squawk(mut self, code: u16) -> Self {
        self.status.squawk_code = Some(code);
        self
    }

    pub fn on_ground(mut self, on_ground: bool) -> Self {
        self.status.on_ground = on_ground;
        self
    }

    /// Callsign when known, otherwise the ICAO address
    pub fn display_name(&self) -> &str {
        self.callsign
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.icao24)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let snapshot = AircraftSnapshot::new("4x1234", 1_700_000_000_000, 32.0, 34.9)
            .with_callsign("ELY001")
            .with_altitude(3500.0)
            .with_heading(270.0)
            .with_speed(180.0)
            .with_squawk(7700);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["position"]["altitudeFeet"], 3500.0);
        assert_eq!(json["movement"]["groundSpeedKnots"], 180.0);
        assert_eq!(json["movement"]["headingDegrees"], 270.0);
        assert_eq!(json["status"]["squawkCode"], 7700);
        assert_eq!(json["status"]["onGround"], false);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{
            "icao24": "abc123",
            "timestamp": 1000,
            "position": { "latitude": 32.0, "longitude": 34.8 }
        }"#;
        let snapshot: AircraftSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.callsign, None);
        assert_eq!(snapshot.position.altitude_feet, None);
        assert_eq!(snapshot.movement.heading_degrees, None);
        assert!(!snapshot.status.on_ground);
    }

    #[test]
    fn test_display_name() {
        let bare = AircraftSnapshot::new("abc123", 0, 0.0, 0.0);
        assert_eq!(bare.display_name(), "abc123");
        assert_eq!(bare.clone().with_callsign("").display_name(), "abc123");
        assert_eq!(bare.with_callsign("LY315").display_name(), "LY315");
    }
}
