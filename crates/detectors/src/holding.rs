//! Holding pattern detection
//!
//! Flags an aircraft loitering near one point: the last N samples stay
//! inside a small radius around their centroid, the aircraft is slow, and
//! it keeps turning.
//!
//! Turning is measured as the sum of unsigned consecutive heading deltas,
//! not net rotation. A track that weaves left and right accumulates turn
//! just like one that circles, so an oscillating track can qualify.

use crate::config::HoldingPatternConfig;
use crate::detector::{Detection, Detector};
use crate::geo::{angle_diff, centroid, haversine_m};
use crate::{AlertType, Severity};
use serde_json::json;
use telemetry::AircraftSnapshot;

pub struct HoldingPatternDetector {
    config: HoldingPatternConfig,
}

impl HoldingPatternDetector {
    pub fn new(config: HoldingPatternConfig) -> Self {
        Self { config }
    }
}

impl Detector for HoldingPatternDetector {
    fn alert_type(&self) -> AlertType {
        AlertType::HoldingPattern
    }

    fn min_history(&self) -> usize {
        self.config.samples
    }

    fn evaluate(
        &self,
        _current: &AircraftSnapshot,
        history: &[AircraftSnapshot],
    ) -> Option<Detection> {
        let n = self.config.samples;
        if n < 2 || history.len() < n {
            return None;
        }
        let window = &history[history.len() - n..];

        let (lat, lon) = centroid(
            window
                .iter()
                .map(|s| (s.position.latitude, s.position.longitude)),
        )?;

        let max_distance = window
            .iter()
            .map(|s| haversine_m(lat, lon, s.position.latitude, s.position.longitude))
            .fold(0.0, f64::max);
        if max_distance > self.config.max_radius_m {
            return None;
        }

        let average_speed =
            window.iter().map(|s| s.movement.ground_speed_knots).sum::<f64>() / n as f64;
        if average_speed > self.config.max_speed_knots {
            return None;
        }

        let total_turn: f64 = window
            .windows(2)
            .filter_map(|pair| {
                let a = pair[0].movement.heading_degrees?;
                let b = pair[1].movement.heading_degrees?;
                Some(angle_diff(a, b))
            })
            .sum();
        if total_turn < self.config.min_circular_movement {
            return None;
        }

        let duration = window[n - 1].timestamp - window[0].timestamp;

        Some(Detection::new(
            AlertType::HoldingPattern,
            Severity::High,
            json!({
                "centroid": { "latitude": lat, "longitude": lon },
                "maxDistanceMeters": max_distance.round(),
                "averageSpeedKnots": average_speed,
                "totalHeadingChange": total_turn,
                "samples": n,
                "durationMs": duration,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: (f64, f64) = (32.10, 34.80);

    /// Ten samples on a ~2 km ring around CENTER
    fn ring(headings: &[f64], speed: f64) -> Vec<AircraftSnapshot> {
        headings
            .iter()
            .enumerate()
            .map(|(i, &h)| {
                let angle = (i as f64 * 36.0).to_radians();
                AircraftSnapshot::new(
                    "4x1234",
                    i as i64 * 15_000,
                    CENTER.0 + 0.018 * angle.cos(),
                    CENTER.1 + 0.018 * angle.sin(),
                )
                .with_heading(h)
                .with_speed(speed)
            })
            .collect()
    }

    const CIRCLING: [f64; 10] = [0.0, 25.0, 50.0, 75.0, 100.0, 125.0, 150.0, 175.0, 200.0, 200.0];

    #[test]
    fn test_detects_loiter() {
        let detector = HoldingPatternDetector::new(HoldingPatternConfig::default());
        let track = ring(&CIRCLING, 150.0);

        let detection = detector.evaluate(&track[9], &track).unwrap();
        assert_eq!(detection.alert_type, AlertType::HoldingPattern);
        assert_eq!(detection.details["totalHeadingChange"], 200.0);
        assert_eq!(detection.details["averageSpeedKnots"], 150.0);
        assert_eq!(detection.details["samples"], 10);
        assert!(detection.details["maxDistanceMeters"].as_f64().unwrap() <= 8000.0);
    }

    #[test]
    fn test_needs_ten_samples() {
        let detector = HoldingPatternDetector::new(HoldingPatternConfig::default());
        let track = ring(&CIRCLING, 150.0);
        assert!(detector.evaluate(&track[8], &track[..9]).is_none());
    }

    #[test]
    fn test_too_fast() {
        let detector = HoldingPatternDetector::new(HoldingPatternConfig::default());
        let track = ring(&CIRCLING, 320.0);
        assert!(detector.evaluate(&track[9], &track).is_none());
    }

    #[test]
    fn test_too_spread_out() {
        let detector = HoldingPatternDetector::new(HoldingPatternConfig::default());
        let mut track = ring(&CIRCLING, 150.0);
        track[9].position.latitude += 0.2;
        assert!(detector.evaluate(&track[9], &track).is_none());
    }

    #[test]
    fn test_not_enough_turning() {
        let detector = HoldingPatternDetector::new(HoldingPatternConfig::default());
        let track = ring(&[90.0; 10], 150.0);
        assert!(detector.evaluate(&track[9], &track).is_none());
    }

    #[test]
    fn test_weaving_counts_as_turning() {
        let detector = HoldingPatternDetector::new(HoldingPatternConfig::default());
        let weave = [0.0, 30.0, 0.0, 30.0, 0.0, 30.0, 0.0, 30.0, 0.0, 30.0];
        let track = ring(&weave, 150.0);

        let detection = detector.evaluate(&track[9], &track).unwrap();
        assert_eq!(detection.details["totalHeadingChange"], 270.0);
    }

    #[test]
    fn test_uses_only_latest_window() {
        let detector = HoldingPatternDetector::new(HoldingPatternConfig::default());
        let mut track = vec![AircraftSnapshot::new("4x1234", -60_000, 31.0, 34.0).with_speed(480.0)];
        track.extend(ring(&CIRCLING, 150.0));
        assert!(detector.evaluate(&track[10], &track).is_some());
    }
}
