//! Detector trait and registry

use crate::approach::ApproachAbortDetector;
use crate::holding::HoldingPatternDetector;
use crate::squawk::EmergencyCodeDetector;
use crate::sudden::SuddenChangeDetector;
use crate::turn::{NorthwardDiversionDetector, SharpTurnDetector};
use crate::{AlertType, DetectionConfig, Severity};
use telemetry::{AircraftSnapshot, AirportReference};
use tracing::{debug, info};

/// A positive detector result, ready to become an alert
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub alert_type: AlertType,
    pub severity: Severity,
    /// Detector-specific payload (camelCase keys)
    pub details: serde_json::Value,
}

impl Detection {
    pub fn new(alert_type: AlertType, severity: Severity, details: serde_json::Value) -> Self {
        Self {
            alert_type,
            severity,
            details,
        }
    }
}

/// A side-effect-free anomaly heuristic.
///
/// `history` is the aircraft's track as kept by the history store, oldest
/// first. It normally ends with `current`; detectors compare against
/// [`prior_snapshot`] so they also work when it does not.
pub trait Detector: Send + Sync {
    /// Alert type this detector raises
    fn alert_type(&self) -> AlertType;

    /// Minimum track length before the detector is consulted
    fn min_history(&self) -> usize {
        2
    }

    /// Evaluate the current snapshot against its track
    fn evaluate(&self, current: &AircraftSnapshot, history: &[AircraftSnapshot])
        -> Option<Detection>;
}

/// Newest snapshot in `history` strictly older than `current`
pub fn prior_snapshot<'a>(
    current: &AircraftSnapshot,
    history: &'a [AircraftSnapshot],
) -> Option<&'a AircraftSnapshot> {
    history
        .iter()
        .rev()
        .find(|s| s.timestamp < current.timestamp)
}

struct Registered {
    detector: Box<dyn Detector>,
    enabled: bool,
}

/// Registry of detectors with runtime enable flags
pub struct DetectorSet {
    entries: Vec<Registered>,
}

impl DetectorSet {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build the standard detector set from configuration
    pub fn from_config(config: &DetectionConfig, airport: &AirportReference) -> Self {
        let mut set = Self::new();
        set.register(
            Box::new(SharpTurnDetector::new(config.sharp_turn.clone())),
            config.sharp_turn.enabled,
        );
        set.register(
            Box::new(HoldingPatternDetector::new(config.holding_pattern.clone())),
            config.holding_pattern.enabled,
        );
        set.register(
            Box::new(NorthwardDiversionDetector::new(
                config.northward_diversion.clone(),
            )),
            config.northward_diversion.enabled,
        );
        set.register(
            Box::new(ApproachAbortDetector::new(
                config.approach_abort.clone(),
                airport.latitude,
                airport.longitude,
            )),
            config.approach_abort.enabled,
        );
        set.register(
            Box::new(EmergencyCodeDetector::new(config.emergency_codes.clone())),
            config.emergency_codes.enabled,
        );
        set.register(
            Box::new(SuddenChangeDetector::speed(config.sudden_speed_change.clone())),
            config.sudden_speed_change.enabled,
        );
        set.register(
            Box::new(SuddenChangeDetector::altitude(
                config.sudden_altitude_change.clone(),
            )),
            config.sudden_altitude_change.enabled,
        );

        info!(
            "Detector set ready: {} registered, {} enabled",
            set.len(),
            set.enabled_types().len()
        );
        set
    }

    /// Add a detector to the registry
    pub fn register(&mut self, detector: Box<dyn Detector>, enabled: bool) {
        self.entries.push(Registered { detector, enabled });
    }

    /// Enable or disable every detector raising `alert_type`.
    /// Returns false if none is registered.
    pub fn set_enabled(&mut self, alert_type: AlertType, enabled: bool) -> bool {
        let mut found = false;
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.detector.alert_type() == alert_type)
        {
            entry.enabled = enabled;
            found = true;
        }
        if found {
            info!("Detector {} enabled={}", alert_type, enabled);
        }
        found
    }

    pub fn is_enabled(&self, alert_type: AlertType) -> bool {
        self.entries
            .iter()
            .any(|e| e.enabled && e.detector.alert_type() == alert_type)
    }

    pub fn enabled_types(&self) -> Vec<AlertType> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.detector.alert_type())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every enabled detector whose history requirement is met
    pub fn evaluate(
        &self,
        current: &AircraftSnapshot,
        history: &[AircraftSnapshot],
    ) -> Vec<Detection> {
        if history.is_empty() {
            return Vec::new();
        }

        self.entries
            .iter()
            .filter(|e| e.enabled && history.len() >= e.detector.min_history())
            .filter_map(|e| e.detector.evaluate(current, history))
            .inspect(|d| {
                debug!(
                    "{} detected for {} ({})",
                    d.alert_type,
                    current.display_name(),
                    d.severity
                )
            })
            .collect()
    }
}

impl Default for DetectorSet {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default(), &AirportReference::default())
    }
}

impl std::fmt::Debug for DetectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorSet")
            .field("enabled", &self.enabled_types())
            .finish()
    }
}
