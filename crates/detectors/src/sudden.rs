//! Sudden speed and altitude changes

use crate::config::{SuddenAltitudeConfig, SuddenSpeedConfig};
use crate::detector::{prior_snapshot, Detection, Detector};
use crate::{AlertType, Severity};
use serde_json::json;
use telemetry::AircraftSnapshot;

/// Quantity compared between consecutive samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeMetric {
    /// Relative ground speed change (percent)
    Speed,
    /// Absolute altitude change (feet)
    Altitude,
}

impl ChangeMetric {
    pub fn label(&self) -> &'static str {
        match self {
            ChangeMetric::Speed => "speed",
            ChangeMetric::Altitude => "altitude",
        }
    }
}

/// Large change of one metric within a short window
pub struct SuddenChangeDetector {
    metric: ChangeMetric,
    threshold: f64,
    time_window_ms: i64,
}

impl SuddenChangeDetector {
    pub fn speed(config: SuddenSpeedConfig) -> Self {
        Self {
            metric: ChangeMetric::Speed,
            threshold: config.min_change_pct,
            time_window_ms: config.time_window_ms,
        }
    }

    pub fn altitude(config: SuddenAltitudeConfig) -> Self {
        Self {
            metric: ChangeMetric::Altitude,
            threshold: config.min_change_ft,
            time_window_ms: config.time_window_ms,
        }
    }

    pub fn metric(&self) -> ChangeMetric {
        self.metric
    }

    fn speed_change(
        &self,
        prior: &AircraftSnapshot,
        current: &AircraftSnapshot,
        elapsed: i64,
    ) -> Option<Detection> {
        let before = prior.movement.ground_speed_knots;
        let after = current.movement.ground_speed_knots;
        // Relative change is undefined from a standstill
        if before <= 0.0 {
            return None;
        }

        let change_pct = (after - before).abs() / before * 100.0;
        if change_pct < self.threshold {
            return None;
        }

        Some(Detection::new(
            AlertType::SuddenSpeedChange,
            Severity::Medium,
            json!({
                "previousSpeedKnots": before,
                "currentSpeedKnots": after,
                "changePct": change_pct,
                "timeDeltaMs": elapsed,
            }),
        ))
    }

    fn altitude_change(
        &self,
        prior: &AircraftSnapshot,
        current: &AircraftSnapshot,
        elapsed: i64,
    ) -> Option<Detection> {
        let before = prior.position.altitude_feet?;
        let after = current.position.altitude_feet?;

        let change = (after - before).abs();
        if change < self.threshold {
            return None;
        }

        Some(Detection::new(
            AlertType::SuddenAltitudeChange,
            Severity::Medium,
            json!({
                "previousAltitudeFeet": before,
                "currentAltitudeFeet": after,
                "changeFeet": change,
                "timeDeltaMs": elapsed,
            }),
        ))
    }
}

impl Detector for SuddenChangeDetector {
    fn alert_type(&self) -> AlertType {
        match self.metric {
            ChangeMetric::Speed => AlertType::SuddenSpeedChange,
            ChangeMetric::Altitude => AlertType::SuddenAltitudeChange,
        }
    }

    fn evaluate(
        &self,
        current: &AircraftSnapshot,
        history: &[AircraftSnapshot],
    ) -> Option<Detection> {
        let prior = prior_snapshot(current, history)?;
        let elapsed = current.timestamp - prior.timestamp;
        if elapsed > self.time_window_ms {
            return None;
        }

        match self.metric {
            ChangeMetric::Speed => self.speed_change(prior, current, elapsed),
            ChangeMetric::Altitude => self.altitude_change(prior, current, elapsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speed_track(before: f64, after: f64, gap: i64) -> Vec<AircraftSnapshot> {
        vec![
            AircraftSnapshot::new("4x1234", 0, 32.0, 34.9).with_speed(before),
            AircraftSnapshot::new("4x1234", gap, 32.0, 34.9).with_speed(after),
        ]
    }

    fn altitude_track(before: f64, after: f64, gap: i64) -> Vec<AircraftSnapshot> {
        vec![
            AircraftSnapshot::new("4x1234", 0, 32.0, 34.9).with_altitude(before),
            AircraftSnapshot::new("4x1234", gap, 32.0, 34.9).with_altitude(after),
        ]
    }

    #[test]
    fn test_speed_drop() {
        let detector = SuddenChangeDetector::speed(SuddenSpeedConfig::default());
        let track = speed_track(200.0, 100.0, 20_000);

        let detection = detector.evaluate(&track[1], &track).unwrap();
        assert_eq!(detection.alert_type, AlertType::SuddenSpeedChange);
        assert_eq!(detection.severity, Severity::Medium);
        assert_eq!(detection.details["changePct"], 50.0);
    }

    #[test]
    fn test_speed_small_change() {
        let detector = SuddenChangeDetector::speed(SuddenSpeedConfig::default());
        let track = speed_track(200.0, 220.0, 20_000);
        assert!(detector.evaluate(&track[1], &track).is_none());
    }

    #[test]
    fn test_speed_from_standstill_never_fires() {
        let detector = SuddenChangeDetector::speed(SuddenSpeedConfig::default());
        let track = speed_track(0.0, 180.0, 20_000);
        assert!(detector.evaluate(&track[1], &track).is_none());
    }

    #[test]
    fn test_speed_outside_window() {
        let detector = SuddenChangeDetector::speed(SuddenSpeedConfig::default());
        let track = speed_track(200.0, 100.0, 61_000);
        assert!(detector.evaluate(&track[1], &track).is_none());
    }

    #[test]
    fn test_altitude_climb_and_descent() {
        let detector = SuddenChangeDetector::altitude(SuddenAltitudeConfig::default());

        let climb = altitude_track(3000.0, 3800.0, 30_000);
        let detection = detector.evaluate(&climb[1], &climb).unwrap();
        assert_eq!(detection.alert_type, AlertType::SuddenAltitudeChange);
        assert_eq!(detection.details["changeFeet"], 800.0);

        let descent = altitude_track(3800.0, 3000.0, 30_000);
        assert!(detector.evaluate(&descent[1], &descent).is_some());
    }

    #[test]
    fn test_altitude_below_threshold() {
        let detector = SuddenChangeDetector::altitude(SuddenAltitudeConfig::default());
        let track = altitude_track(3000.0, 3400.0, 30_000);
        assert!(detector.evaluate(&track[1], &track).is_none());
    }

    #[test]
    fn test_altitude_unknown() {
        let detector = SuddenChangeDetector::altitude(SuddenAltitudeConfig::default());
        let track = vec![
            AircraftSnapshot::new("4x1234", 0, 32.0, 34.9),
            AircraftSnapshot::new("4x1234", 10_000, 32.0, 34.9).with_altitude(9000.0),
        ];
        assert!(detector.evaluate(&track[1], &track).is_none());
    }

    #[test]
    fn test_metric_labels() {
        assert_eq!(
            SuddenChangeDetector::speed(SuddenSpeedConfig::default()).metric().label(),
            "speed"
        );
        assert_eq!(ChangeMetric::Altitude.label(), "altitude");
    }
}
