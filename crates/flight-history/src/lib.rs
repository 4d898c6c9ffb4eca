//! Flight History
//!
//! Keeps a bounded, time-ordered window of recent snapshots for every
//! aircraft seen in the monitored area.

mod store;

pub use store::{HistoryStore, MAX_HISTORY};
