//! Per-aircraft history store

use std::collections::{HashMap, VecDeque};
use telemetry::AircraftSnapshot;
use tracing::debug;

/// Maximum snapshots kept per aircraft (oldest evicted first)
pub const MAX_HISTORY: usize = 50;

/// Rolling snapshot history keyed by ICAO address
#[derive(Debug)]
pub struct HistoryStore {
    tracks: HashMap<String, VecDeque<AircraftSnapshot>>,
    /// Capacity of each track
    capacity: usize,
    /// Total snapshots appended (for statistics)
    total_written: usize,
}

impl HistoryStore {
    /// Create a store with the default per-aircraft capacity (50)
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    /// Create a store with a custom per-aircraft capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tracks: HashMap::new(),
            capacity: capacity.max(1),
            total_written: 0,
        }
    }

    /// Append a snapshot to its aircraft's track and return the whole track,
    /// oldest first, with the new snapshot last.
    pub fn update(&mut self, snapshot: AircraftSnapshot) -> &[AircraftSnapshot] {
        let capacity = self.capacity;
        let track = self
            .tracks
            .entry(snapshot.icao24.clone())
            .or_insert_with(|| VecDeque::with_capacity(capacity));

        while track.len() >= capacity {
            track.pop_front();
        }
        track.push_back(snapshot);
        self.total_written += 1;

        track.make_contiguous()
    }

    /// Drop snapshots older than `cutoff_ms`; aircraft left with nothing are
    /// forgotten entirely.
    pub fn prune(&mut self, cutoff_ms: i64) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(|_, track| {
            track.retain(|s| s.timestamp >= cutoff_ms);
            !track.is_empty()
        });
        let removed = before - self.tracks.len();
        if removed > 0 {
            debug!("Pruned history for {} aircraft", removed);
        }
        removed
    }

    /// Track for one aircraft, oldest first
    pub fn get(&self, icao24: &str) -> Option<&VecDeque<AircraftSnapshot>> {
        self.tracks.get(icao24)
    }

    /// Number of aircraft with at least one snapshot
    pub fn aircraft_count(&self) -> usize {
        self.tracks.len()
    }

    /// Number of snapshots kept for one aircraft
    pub fn track_len(&self, icao24: &str) -> usize {
        self.tracks.get(icao24).map_or(0, |t| t.len())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_written(&self) -> usize {
        self.total_written
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snap(icao: &str, ts: i64) -> AircraftSnapshot {
        AircraftSnapshot::new(icao, ts, 32.0, 34.9)
    }

    #[test]
    fn test_update_returns_track_with_current_last() {
        let mut store = HistoryStore::new();
        store.update(snap("a", 1));
        let track = store.update(snap("a", 2));

        assert_eq!(track.len(), 2);
        assert_eq!(track[0].timestamp, 1);
        assert_eq!(track[1].timestamp, 2);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut store = HistoryStore::new();
        for ts in 0..60 {
            store.update(snap("a", ts));
        }

        let track = store.get("a").unwrap();
        assert_eq!(track.len(), MAX_HISTORY);
        assert_eq!(track.front().unwrap().timestamp, 10);
        assert_eq!(track.back().unwrap().timestamp, 59);
        assert_eq!(store.total_written(), 60);
    }

    #[test]
    fn test_tracks_are_independent() {
        let mut store = HistoryStore::new();
        store.update(snap("a", 1));
        store.update(snap("b", 1));
        store.update(snap("b", 2));

        assert_eq!(store.aircraft_count(), 2);
        assert_eq!(store.track_len("a"), 1);
        assert_eq!(store.track_len("b"), 2);
    }

    #[test]
    fn test_prune_filters_and_removes_empty() {
        let mut store = HistoryStore::new();
        store.update(snap("old", 100));
        store.update(snap("mixed", 100));
        store.update(snap("mixed", 500));
        store.update(snap("fresh", 600));

        let removed = store.prune(300);

        assert_eq!(removed, 1);
        assert!(store.get("old").is_none());
        assert_eq!(store.track_len("mixed"), 1);
        assert_eq!(store.track_len("fresh"), 1);
    }

    proptest! {
        #[test]
        fn prop_track_never_exceeds_capacity(count in 0usize..200, capacity in 1usize..80) {
            let mut store = HistoryStore::with_capacity(capacity);
            for ts in 0..count {
                let len = store.update(snap("a", ts as i64)).len();
                prop_assert!(len <= capacity);
            }
            prop_assert_eq!(store.track_len("a"), count.min(capacity));
        }
    }
}
