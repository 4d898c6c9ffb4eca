//! Aborted approach detection

use crate::config::ApproachAbortConfig;
use crate::detector::{prior_snapshot, Detection, Detector};
use crate::geo::{angle_diff, haversine_m};
use crate::{AlertType, Severity};
use serde_json::json;
use telemetry::AircraftSnapshot;

/// Low aircraft close to the airport that suddenly changes heading
pub struct ApproachAbortDetector {
    config: ApproachAbortConfig,
    airport_lat: f64,
    airport_lon: f64,
}

impl ApproachAbortDetector {
    pub fn new(config: ApproachAbortConfig, airport_lat: f64, airport_lon: f64) -> Self {
        Self {
            config,
            airport_lat,
            airport_lon,
        }
    }
}

impl Detector for ApproachAbortDetector {
    fn alert_type(&self) -> AlertType {
        AlertType::ApproachAbort
    }

    fn evaluate(
        &self,
        current: &AircraftSnapshot,
        history: &[AircraftSnapshot],
    ) -> Option<Detection> {
        let prior = prior_snapshot(current, history)?;

        let distance = haversine_m(
            self.airport_lat,
            self.airport_lon,
            current.position.latitude,
            current.position.longitude,
        );
        if distance > self.config.airport_radius_m {
            return None;
        }

        let altitude = current.position.altitude_feet?;
        if altitude > self.config.max_approach_altitude_ft {
            return None;
        }

        let before = prior.movement.heading_degrees?;
        let after = current.movement.heading_degrees?;
        let change = angle_diff(before, after);
        if change < self.config.min_deviation_angle {
            return None;
        }

        Some(Detection::new(
            AlertType::ApproachAbort,
            Severity::High,
            json!({
                "distanceToAirportMeters": distance.round(),
                "altitudeFeet": altitude,
                "previousHeading": before,
                "currentHeading": after,
                "angleChange": change,
            }),
        ))
    }
}
