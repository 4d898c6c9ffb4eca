//! Fleet-level alert synthesis
//!
//! These checks look across aircraft instead of along one track. Their
//! alerts carry no aircraft and share one global cooldown key per type.

use crate::alert::Alert;
use detectors::AlertType;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

fn within(alert: &Alert, now: i64, window_ms: i64) -> bool {
    now - alert.timestamp <= window_ms
}

/// Per-aircraft alerts inside the window, summarised for a security alert
#[derive(Debug, Default, PartialEq)]
pub(crate) struct CompositeSummary {
    pub alert_count: usize,
    pub by_severity: BTreeMap<&'static str, usize>,
    pub by_type: BTreeMap<&'static str, usize>,
    pub distinct_aircraft: usize,
}

impl CompositeSummary {
    pub fn collect(alerts: &[Alert], now: i64, window_ms: i64) -> Self {
        let mut summary = Self::default();
        let mut aircraft = BTreeSet::new();

        for alert in alerts
            .iter()
            .filter(|a| !a.alert_type.is_aggregate() && within(a, now, window_ms))
        {
            summary.alert_count += 1;
            *summary.by_severity.entry(alert.severity.as_str()).or_default() += 1;
            *summary.by_type.entry(alert.alert_type.as_str()).or_default() += 1;
            if let Some(icao) = alert.icao24() {
                aircraft.insert(icao);
            }
        }

        summary.distinct_aircraft = aircraft.len();
        summary
    }

    pub fn details(&self, window_ms: i64) -> Value {
        json!({
            "alertCount": self.alert_count,
            "severityBreakdown": self.by_severity,
            "typeBreakdown": self.by_type,
            "distinctAircraftCount": self.distinct_aircraft,
            "timeWindowMs": window_ms,
        })
    }
}

/// Distinct aircraft with a northward diversion inside the window, sorted
pub(crate) fn diverted_aircraft(alerts: &[Alert], now: i64, window_ms: i64) -> Vec<String> {
    alerts
        .iter()
        .filter(|a| a.alert_type == AlertType::NorthwardDiversion && within(a, now, window_ms))
        .filter_map(|a| a.icao24())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Observed aircraft counts over the recent passes
#[derive(Debug, Default)]
pub(crate) struct TrafficWindow {
    samples: VecDeque<(i64, usize)>,
}

/// Result of comparing the current pass against the recent peak
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TrafficDrop {
    pub peak: usize,
    pub current: usize,
    pub reduction_pct: f64,
}

impl TrafficWindow {
    /// Record this pass and compare it to the peak of the window
    pub fn record(&mut self, now: i64, count: usize, window_ms: i64) -> TrafficDrop {
        self.samples.push_back((now, count));
        while let Some(&(ts, _)) = self.samples.front() {
            if now - ts > window_ms {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        let peak = self.samples.iter().map(|&(_, c)| c).max().unwrap_or(count);
        let reduction_pct = if peak == 0 {
            0.0
        } else {
            (peak - count.min(peak)) as f64 * 100.0 / peak as f64
        };

        TrafficDrop {
            peak,
            current: count,
            reduction_pct,
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AircraftRef;
    use detectors::Severity;
    use telemetry::AircraftSnapshot;

    fn alert(alert_type: AlertType, icao: Option<&str>, ts: i64) -> Alert {
        let aircraft = icao.map(|i| AircraftRef::from(&AircraftSnapshot::new(i, ts, 32.0, 34.9)));
        Alert::new(alert_type, Severity::Medium, ts, aircraft, json!({}))
    }

    #[test]
    fn test_composite_ignores_fleet_alerts_and_old_ones() {
        let alerts = vec![
            alert(AlertType::SharpTurn, Some("a"), 1_000),
            alert(AlertType::SharpTurn, Some("b"), 2_000),
            alert(AlertType::SecurityAlert, None, 2_000),
            alert(AlertType::SuddenSpeedChange, Some("a"), -1_000_000),
        ];

        let summary = CompositeSummary::collect(&alerts, 3_000, 600_000);
        assert_eq!(summary.alert_count, 2);
        assert_eq!(summary.distinct_aircraft, 2);
        assert_eq!(summary.by_type.get("SHARP_TURN"), Some(&2));
        assert_eq!(summary.by_severity.get("MEDIUM"), Some(&2));

        let details = summary.details(600_000);
        assert_eq!(details["alertCount"], 2);
        assert_eq!(details["typeBreakdown"]["SHARP_TURN"], 2);
    }

    #[test]
    fn test_diverted_aircraft_distinct() {
        let alerts = vec![
            alert(AlertType::NorthwardDiversion, Some("b"), 1_000),
            alert(AlertType::NorthwardDiversion, Some("a"), 1_500),
            alert(AlertType::NorthwardDiversion, Some("b"), 2_000),
            alert(AlertType::SharpTurn, Some("c"), 2_000),
        ];
        assert_eq!(diverted_aircraft(&alerts, 3_000, 180_000), vec!["a", "b"]);
        assert!(diverted_aircraft(&alerts, 500_000, 180_000).is_empty());
    }

    #[test]
    fn test_traffic_drop_against_peak() {
        let mut window = TrafficWindow::default();
        assert_eq!(window.record(0, 10, 180_000).reduction_pct, 0.0);

        let drop = window.record(30_000, 5, 180_000);
        assert_eq!(drop.peak, 10);
        assert_eq!(drop.current, 5);
        assert_eq!(drop.reduction_pct, 50.0);

        // Peak ages out of the window
        let later = window.record(240_000, 5, 180_000);
        assert_eq!(later.peak, 5);
        assert_eq!(later.reduction_pct, 0.0);
    }
}
