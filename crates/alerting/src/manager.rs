//! Alert Manager Implementation

use crate::aggregate::{diverted_aircraft, CompositeSummary, TrafficWindow};
use crate::alert::{AircraftRef, Alert};
use crate::config::AlertConfig;
use crate::SaveTrigger;
use detectors::{AlertType, DetectorSet, Severity};
use flight_history::HistoryStore;
use metrics::counter;
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use telemetry::{now_ms, AircraftSnapshot, AirportReference};
use tracing::{debug, info, warn};

const GLOBAL_SUBJECT: &str = "global";

/// Deduplication key: alert type plus aircraft, or "global" for fleet alerts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CooldownKey {
    pub alert_type: AlertType,
    pub subject: String,
}

impl CooldownKey {
    pub fn new(alert_type: AlertType, aircraft: Option<&str>) -> Self {
        Self {
            alert_type,
            subject: aircraft.unwrap_or(GLOBAL_SUBJECT).to_string(),
        }
    }
}

/// Result of one analysis pass
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub aircraft_analyzed: usize,
    pub new_alerts: Vec<Alert>,
}

/// Alert counts for the status surface
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub total: usize,
    pub active: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub last_hour: usize,
    pub tracked_aircraft: usize,
    pub cooldown_entries: usize,
}

/// Owns the in-memory alert set, the per-aircraft history and the detectors
pub struct AlertManager {
    config: AlertConfig,
    alerts: Vec<Alert>,
    /// Last firing time per key
    cooldowns: HashMap<CooldownKey, i64>,
    history: HistoryStore,
    detectors: DetectorSet,
    traffic: TrafficWindow,
    save_trigger: Option<Arc<dyn SaveTrigger>>,
}

impl AlertManager {
    /// Create a new alert manager with the standard detector set
    pub fn new(config: AlertConfig, airport: &AirportReference) -> Self {
        let detectors = DetectorSet::from_config(&config.detection, airport);
        Self::with_detectors(config, detectors)
    }

    /// Create a manager around a prepared detector set
    pub fn with_detectors(config: AlertConfig, detectors: DetectorSet) -> Self {
        info!(
            "Creating alert manager: retention {} ms, cooldown {} ms",
            config.retention_ms, config.cooldown_ms
        );
        Self {
            config,
            alerts: Vec::new(),
            cooldowns: HashMap::new(),
            history: HistoryStore::new(),
            detectors,
            traffic: TrafficWindow::default(),
            save_trigger: None,
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    pub fn detectors_mut(&mut self) -> &mut DetectorSet {
        &mut self.detectors
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Install the hook used to persist urgent alerts
    pub fn set_save_trigger(&mut self, trigger: Arc<dyn SaveTrigger>) {
        self.save_trigger = Some(trigger);
    }

    /// Check whether an alert of this type may fire for the aircraft
    /// (or globally when `aircraft` is None)
    pub fn can_send_at(&self, alert_type: AlertType, aircraft: Option<&str>, now: i64) -> bool {
        match self.cooldowns.get(&CooldownKey::new(alert_type, aircraft)) {
            Some(&last) if now - last < self.config.cooldown_ms => {
                debug!(
                    "Alert suppressed: {} for {} in cooldown",
                    alert_type,
                    aircraft.unwrap_or(GLOBAL_SUBJECT)
                );
                false
            }
            _ => true,
        }
    }

    pub fn can_send(&self, alert_type: AlertType, aircraft: Option<&str>) -> bool {
        self.can_send_at(alert_type, aircraft, now_ms())
    }

    /// Record a new alert and start its cooldown. Urgent alerts also request
    /// a save; a refused request is logged and otherwise ignored.
    pub fn create_alert_at(
        &mut self,
        alert_type: AlertType,
        severity: Severity,
        aircraft: Option<&AircraftSnapshot>,
        details: serde_json::Value,
        now: i64,
    ) -> Alert {
        let aircraft = aircraft.map(AircraftRef::from);
        let key = CooldownKey::new(alert_type, aircraft.as_ref().map(|a| a.icao24.as_str()));
        let alert = Alert::new(alert_type, severity, now, aircraft, details);

        self.cooldowns.insert(key, now);
        self.alerts.push(alert.clone());

        counter!(
            "airport_watch_alerts_created_total",
            "type" => alert_type.as_str(),
            "severity" => severity.as_str()
        )
        .increment(1);
        info!(
            "Alert created: {} ({}) for {}",
            alert_type,
            severity,
            alert.icao24().unwrap_or(GLOBAL_SUBJECT)
        );

        if severity.is_urgent() {
            if let Some(trigger) = &self.save_trigger {
                if !trigger.request_save() {
                    warn!("Save request for alert {} was dropped", alert.id);
                }
            }
        }

        alert
    }

    pub fn create_alert(
        &mut self,
        alert_type: AlertType,
        severity: Severity,
        aircraft: Option<&AircraftSnapshot>,
        details: serde_json::Value,
    ) -> Alert {
        self.create_alert_at(alert_type, severity, aircraft, details, now_ms())
    }

    /// Drop alerts past retention and history older than twice retention.
    /// Returns the number of alerts removed.
    pub fn cleanup_at(&mut self, now: i64) -> usize {
        let retention = self.config.retention_ms;
        let before = self.alerts.len();
        self.alerts.retain(|a| now - a.timestamp <= retention);
        let removed = before - self.alerts.len();

        let forgotten = self.history.prune(now - 2 * retention);
        let cooldown = self.config.cooldown_ms;
        self.cooldowns.retain(|_, &mut last| now - last < cooldown);

        if removed > 0 || forgotten > 0 {
            debug!(
                "Cleanup removed {} alerts and the history of {} aircraft",
                removed, forgotten
            );
        }
        removed
    }

    pub fn cleanup(&mut self) -> usize {
        self.cleanup_at(now_ms())
    }

    /// Run one full pass over a poll: cleanup, history update, detectors,
    /// then the fleet-level checks
    pub fn analyze_at(&mut self, snapshots: &[AircraftSnapshot], now: i64) -> AnalysisOutcome {
        self.cleanup_at(now);

        let mut new_alerts = Vec::new();
        let mut seen = HashSet::new();

        for snapshot in snapshots {
            seen.insert(snapshot.icao24.as_str());

            let detections = {
                let track = self.history.update(snapshot.clone());
                self.detectors.evaluate(snapshot, track)
            };

            for detection in detections {
                if self.can_send_at(detection.alert_type, Some(&snapshot.icao24), now) {
                    new_alerts.push(self.create_alert_at(
                        detection.alert_type,
                        detection.severity,
                        Some(snapshot),
                        detection.details,
                        now,
                    ));
                }
            }
        }

        let observed = seen.len();
        new_alerts.extend(self.check_multiple_diversions_at(now));
        new_alerts.extend(self.check_traffic_stop_at(observed, now));
        new_alerts.extend(self.synthesize_composite_at(now));

        debug!(
            "Analyzed {} aircraft, {} new alerts",
            observed,
            new_alerts.len()
        );
        AnalysisOutcome {
            aircraft_analyzed: observed,
            new_alerts,
        }
    }

    pub fn analyze(&mut self, snapshots: &[AircraftSnapshot]) -> AnalysisOutcome {
        self.analyze_at(snapshots, now_ms())
    }

    /// Raise a security alert when enough per-aircraft alerts cluster in the
    /// composite window
    pub fn synthesize_composite_at(&mut self, now: i64) -> Option<Alert> {
        let config = self.config.composite.clone();
        if !config.enabled {
            return None;
        }

        let summary = CompositeSummary::collect(&self.alerts, now, config.time_window_ms);
        if summary.alert_count < config.min_events
            || !self.can_send_at(AlertType::SecurityAlert, None, now)
        {
            return None;
        }

        Some(self.create_alert_at(
            AlertType::SecurityAlert,
            config.severity,
            None,
            summary.details(config.time_window_ms),
            now,
        ))
    }

    fn check_multiple_diversions_at(&mut self, now: i64) -> Option<Alert> {
        let config = self.config.multiple_diversions.clone();
        if !config.enabled {
            return None;
        }

        let aircraft = diverted_aircraft(&self.alerts, now, config.time_window_ms);
        if aircraft.is_empty()
            || aircraft.len() < config.min_aircraft
            || !self.can_send_at(AlertType::MultipleDiversions, None, now)
        {
            return None;
        }

        Some(self.create_alert_at(
            AlertType::MultipleDiversions,
            Severity::High,
            None,
            json!({
                "aircraftCount": aircraft.len(),
                "aircraft": aircraft,
                "timeWindowMs": config.time_window_ms,
            }),
            now,
        ))
    }

    fn check_traffic_stop_at(&mut self, observed: usize, now: i64) -> Option<Alert> {
        let config = self.config.traffic_stop.clone();
        if !config.enabled {
            return None;
        }

        let drop = self.traffic.record(now, observed, config.time_window_ms);
        if drop.peak < config.min_baseline_aircraft
            || drop.reduction_pct < config.min_reduction_pct
            || !self.can_send_at(AlertType::TrafficStop, None, now)
        {
            return None;
        }

        Some(self.create_alert_at(
            AlertType::TrafficStop,
            Severity::High,
            None,
            json!({
                "peakCount": drop.peak,
                "currentCount": drop.current,
                "reductionPct": drop.reduction_pct,
                "timeWindowMs": config.time_window_ms,
            }),
            now,
        ))
    }

    /// Every alert in memory, oldest first
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alerts.iter().filter(|a| a.active).cloned().collect()
    }

    pub fn alerts_by_type(&self, alert_type: AlertType) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| a.alert_type == alert_type)
            .cloned()
            .collect()
    }

    pub fn alerts_by_severity(&self, severity: Severity) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| a.severity == severity)
            .cloned()
            .collect()
    }

    pub fn stats_at(&self, now: i64) -> AlertStats {
        let mut stats = AlertStats {
            total: self.alerts.len(),
            tracked_aircraft: self.history.aircraft_count(),
            cooldown_entries: self.cooldowns.len(),
            ..Default::default()
        };

        for alert in &self.alerts {
            if alert.active {
                stats.active += 1;
            }
            if now - alert.timestamp <= 60 * 60 * 1000 {
                stats.last_hour += 1;
            }
            *stats
                .by_severity
                .entry(alert.severity.as_str().to_string())
                .or_default() += 1;
            *stats
                .by_type
                .entry(alert.alert_type.as_str().to_string())
                .or_default() += 1;
        }
        stats
    }

    pub fn stats(&self) -> AlertStats {
        self.stats_at(now_ms())
    }

    /// Swap in a persisted alert set
    pub fn replace_alerts(&mut self, alerts: Vec<Alert>) {
        info!("Alert set replaced: {} alerts", alerts.len());
        self.alerts = alerts;
    }

    /// Remove and return every alert, resetting cooldowns and fleet state
    pub fn take_alerts(&mut self) -> Vec<Alert> {
        self.cooldowns.clear();
        self.traffic.clear();
        std::mem::take(&mut self.alerts)
    }

    /// Put alerts back ahead of the current set, skipping ids already
    /// present. Used when a clear fails after the alerts were taken.
    pub fn restore_front(&mut self, alerts: Vec<Alert>) -> usize {
        let present: HashSet<String> = self.alerts.iter().map(|a| a.id.clone()).collect();
        let mut restored: Vec<Alert> = alerts
            .into_iter()
            .filter(|a| !present.contains(&a.id))
            .collect();
        let count = restored.len();
        restored.append(&mut self.alerts);
        self.alerts = restored;
        if count > 0 {
            info!("Restored {} alerts", count);
        }
        count
    }

    /// Keep only the `keep` most recent alerts, preserving their order.
    /// Returns the number removed.
    pub fn retain_most_recent(&mut self, keep: usize) -> usize {
        if self.alerts.len() <= keep {
            return 0;
        }

        let mut order: Vec<usize> = (0..self.alerts.len()).collect();
        order.sort_by(|&a, &b| self.alerts[b].timestamp.cmp(&self.alerts[a].timestamp));
        let kept: HashSet<usize> = order.into_iter().take(keep).collect();

        let before = self.alerts.len();
        let mut index = 0;
        self.alerts.retain(|_| {
            let keep = kept.contains(&index);
            index += 1;
            keep
        });
        before - self.alerts.len()
    }

    /// Clear alerts, cooldowns and history
    pub fn clear(&mut self) {
        self.alerts.clear();
        self.cooldowns.clear();
        self.history.clear();
        self.traffic.clear();
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default(), &AirportReference::default())
    }
}
