//! Heading-change detectors

use crate::config::{NorthwardDiversionConfig, SharpTurnConfig};
use crate::detector::{prior_snapshot, Detection, Detector};
use crate::geo::{angle_diff, in_sector};
use crate::{AlertType, Severity};
use serde_json::json;
use telemetry::AircraftSnapshot;

/// Heading change between the prior and current samples, with both headings.
/// None when either sample has no heading.
fn heading_change(prior: &AircraftSnapshot, current: &AircraftSnapshot) -> Option<(f64, f64, f64)> {
    let before = prior.movement.heading_degrees?;
    let after = current.movement.heading_degrees?;
    Some((before, after, angle_diff(before, after)))
}

/// Large heading change between consecutive samples
pub struct SharpTurnDetector {
    config: SharpTurnConfig,
}

impl SharpTurnDetector {
    pub fn new(config: SharpTurnConfig) -> Self {
        Self { config }
    }
}

impl Detector for SharpTurnDetector {
    fn alert_type(&self) -> AlertType {
        AlertType::SharpTurn
    }

    fn evaluate(
        &self,
        current: &AircraftSnapshot,
        history: &[AircraftSnapshot],
    ) -> Option<Detection> {
        let prior = prior_snapshot(current, history)?;
        let elapsed = current.timestamp - prior.timestamp;
        if elapsed > self.config.time_window_ms {
            return None;
        }

        let (before, after, change) = heading_change(prior, current)?;
        if change < self.config.min_angle_change {
            return None;
        }

        let severity = if change >= self.config.high_severity_angle {
            Severity::High
        } else {
            Severity::Medium
        };

        Some(Detection::new(
            AlertType::SharpTurn,
            severity,
            json!({
                "previousHeading": before,
                "currentHeading": after,
                "angleChange": change,
                "timeDeltaMs": elapsed,
            }),
        ))
    }
}

/// Turn that ends pointing into the northern sector
pub struct NorthwardDiversionDetector {
    config: NorthwardDiversionConfig,
}

impl NorthwardDiversionDetector {
    pub fn new(config: NorthwardDiversionConfig) -> Self {
        Self { config }
    }
}

impl Detector for NorthwardDiversionDetector {
    fn alert_type(&self) -> AlertType {
        AlertType::NorthwardDiversion
    }

    fn evaluate(
        &self,
        current: &AircraftSnapshot,
        history: &[AircraftSnapshot],
    ) -> Option<Detection> {
        let prior = prior_snapshot(current, history)?;
        let (before, after, change) = heading_change(prior, current)?;

        if change < self.config.min_angle_change
            || !in_sector(after, self.config.sector_min, self.config.sector_max)
        {
            return None;
        }

        Some(Detection::new(
            AlertType::NorthwardDiversion,
            Severity::High,
            json!({
                "previousHeading": before,
                "currentHeading": after,
                "angleChange": change,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(ts: i64, heading: f64) -> AircraftSnapshot {
        AircraftSnapshot::new("4x1234", ts, 32.0, 34.9).with_heading(heading)
    }

    #[test]
    fn test_sharp_turn_10_to_200() {
        let detector = SharpTurnDetector::new(SharpTurnConfig::default());
        let history = vec![snap(0, 10.0), snap(30_000, 200.0)];

        let detection = detector.evaluate(&history[1], &history).unwrap();
        assert_eq!(detection.alert_type, AlertType::SharpTurn);
        assert_eq!(detection.details["angleChange"], 170.0);
        assert_eq!(detection.details["timeDeltaMs"], 30_000);
        assert_eq!(detection.severity, Severity::High);
    }

    #[test]
    fn test_sharp_turn_medium_below_high_angle() {
        let detector = SharpTurnDetector::new(SharpTurnConfig::default());
        let history = vec![snap(0, 350.0), snap(10_000, 25.0)];

        let detection = detector.evaluate(&history[1], &history).unwrap();
        assert_eq!(detection.details["angleChange"], 35.0);
        assert_eq!(detection.severity, Severity::Medium);
    }

    #[test]
    fn test_sharp_turn_outside_window() {
        let detector = SharpTurnDetector::new(SharpTurnConfig::default());
        let history = vec![snap(0, 10.0), snap(91_000, 200.0)];
        assert!(detector.evaluate(&history[1], &history).is_none());
    }

    #[test]
    fn test_sharp_turn_small_change() {
        let detector = SharpTurnDetector::new(SharpTurnConfig::default());
        let history = vec![snap(0, 90.0), snap(10_000, 105.0)];
        assert!(detector.evaluate(&history[1], &history).is_none());
    }

    #[test]
    fn test_sharp_turn_missing_heading() {
        let detector = SharpTurnDetector::new(SharpTurnConfig::default());
        let history = vec![
            AircraftSnapshot::new("4x1234", 0, 32.0, 34.9),
            snap(10_000, 200.0),
        ];
        assert!(detector.evaluate(&history[1], &history).is_none());
    }

    #[test]
    fn test_sharp_turn_needs_prior() {
        let detector = SharpTurnDetector::new(SharpTurnConfig::default());
        let current = snap(0, 200.0);
        assert!(detector
            .evaluate(&current, std::slice::from_ref(&current))
            .is_none());
    }

    #[test]
    fn test_northward_diversion_into_sector() {
        let detector = NorthwardDiversionDetector::new(NorthwardDiversionConfig::default());
        let history = vec![snap(0, 270.0), snap(10_000, 330.0)];

        let detection = detector.evaluate(&history[1], &history).unwrap();
        assert_eq!(detection.alert_type, AlertType::NorthwardDiversion);
        assert_eq!(detection.details["angleChange"], 60.0);
    }

    #[test]
    fn test_northward_diversion_across_north() {
        let detector = NorthwardDiversionDetector::new(NorthwardDiversionConfig::default());
        let history = vec![snap(0, 90.0), snap(10_000, 20.0)];
        assert!(detector.evaluate(&history[1], &history).is_some());
    }

    #[test]
    fn test_northward_diversion_ignores_southern_turn() {
        let detector = NorthwardDiversionDetector::new(NorthwardDiversionConfig::default());
        let history = vec![snap(0, 90.0), snap(10_000, 180.0)];
        assert!(detector.evaluate(&history[1], &history).is_none());
    }

    #[test]
    fn test_northward_diversion_needs_turn() {
        let detector = NorthwardDiversionDetector::new(NorthwardDiversionConfig::default());
        let history = vec![snap(0, 355.0), snap(10_000, 5.0)];
        assert!(detector.evaluate(&history[1], &history).is_none());
    }
}
