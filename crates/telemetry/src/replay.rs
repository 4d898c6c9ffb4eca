//! Recorded feed playback
//!
//! Plays back polls captured from a live feed, one poll per fetch. Used by
//! the binary when no live client is wired in, and by tests to script
//! success/failure sequences.

use crate::{AircraftSnapshot, TelemetryError, TelemetrySource};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

type Poll = Result<Vec<AircraftSnapshot>, TelemetryError>;

/// Telemetry source backed by a fixed list of polls
pub struct ReplaySource {
    polls: Vec<Poll>,
    cursor: AtomicUsize,
    looping: bool,
}

impl ReplaySource {
    /// Play back successful polls in order
    pub fn from_polls(polls: Vec<Vec<AircraftSnapshot>>) -> Self {
        Self::scripted(polls.into_iter().map(Ok).collect())
    }

    /// Play back an arbitrary sequence of successes and failures
    pub fn scripted(polls: Vec<Poll>) -> Self {
        Self {
            polls,
            cursor: AtomicUsize::new(0),
            looping: false,
        }
    }

    /// Load polls from a JSON file shaped `[[snapshot, ...], ...]`
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TelemetryError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let polls: Vec<Vec<AircraftSnapshot>> = serde_json::from_str(&raw)?;
        info!("Loaded {} recorded polls from {}", polls.len(), path.display());
        Ok(Self::from_polls(polls))
    }

    /// Restart from the first poll once the recording runs out
    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Number of fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Number of recorded polls
    pub fn len(&self) -> usize {
        self.polls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polls.is_empty()
    }
}

#[async_trait]
impl TelemetrySource for ReplaySource {
    async fn fetch_snapshots(&self) -> Result<Vec<AircraftSnapshot>, TelemetryError> {
        let n = self.cursor.fetch_add(1, Ordering::Relaxed);
        if self.polls.is_empty() {
            return Err(TelemetryError::Exhausted);
        }

        let index = if self.looping { n % self.polls.len() } else { n };
        match self.polls.get(index) {
            Some(poll) => {
                debug!("Replaying poll {}", index);
                poll.clone()
            }
            None => Err(TelemetryError::Exhausted),
        }
    }

    fn name(&self) -> &str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(icao: &str) -> Vec<AircraftSnapshot> {
        vec![AircraftSnapshot::new(icao, 0, 32.0, 34.9)]
    }

    #[tokio::test]
    async fn test_plays_in_order_then_exhausts() {
        let source = ReplaySource::from_polls(vec![poll("a"), poll("b")]);

        assert_eq!(source.fetch_snapshots().await.unwrap()[0].icao24, "a");
        assert_eq!(source.fetch_snapshots().await.unwrap()[0].icao24, "b");
        assert!(matches!(
            source.fetch_snapshots().await,
            Err(TelemetryError::Exhausted)
        ));
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_looping() {
        let source = ReplaySource::from_polls(vec![poll("a"), poll("b")]).with_loop(true);
        for expected in ["a", "b", "a", "b"] {
            assert_eq!(source.fetch_snapshots().await.unwrap()[0].icao24, expected);
        }
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let source = ReplaySource::scripted(vec![
            Err(TelemetryError::Upstream("503".into())),
            Ok(poll("a")),
        ]);
        assert!(source.fetch_snapshots().await.is_err());
        assert!(source.fetch_snapshots().await.is_ok());
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        let json = serde_json::to_string(&vec![poll("x"), poll("y")]).unwrap();
        std::fs::write(&path, json).unwrap();

        let source = ReplaySource::from_file(&path).await.unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.fetch_snapshots().await.unwrap()[0].icao24, "x");
    }

    #[tokio::test]
    async fn test_from_file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            ReplaySource::from_file(&path).await,
            Err(TelemetryError::InvalidPayload(_))
        ));
    }
}
