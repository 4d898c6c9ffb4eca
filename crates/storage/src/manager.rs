//! Storage Manager Implementation

use crate::files::{CurrentFile, DailyFile, DailyFileInfo, HistoricalFile};
use crate::StorageError;
use alerting::{Alert, SharedAlertManager};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Longest span accepted by range queries, in days
pub const MAX_RANGE_DAYS: i64 = 366;

const CURRENT_FILE: &str = "current_alerts.json";
const HISTORICAL_FILE: &str = "historical_alerts.json";
const BACKUP_DIR: &str = "backups";
const DAILY_PREFIX: &str = "alerts_";

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub alerts_directory: PathBuf,
    /// Current-file size that triggers archival and pruning (bytes)
    pub max_current_file_size: u64,
    pub auto_save: bool,
    pub save_interval_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            alerts_directory: PathBuf::from("./data/alerts"),
            max_current_file_size: 10 * 1024 * 1024,
            auto_save: true,
            save_interval_ms: 30_000,
        }
    }
}

/// What a save did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    /// Alerts in the current file after the save
    pub saved: usize,
    pub bytes: u64,
    pub overflowed: bool,
    /// Alerts dropped from memory after an overflow
    pub pruned: usize,
    /// Alerts written to today's partition
    pub daily: usize,
}

/// UTC calendar date of a millisecond timestamp
pub(crate) fn alert_date(timestamp_ms: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map(|d| d.date_naive())
}

fn stamp() -> String {
    Utc::now().format("%Y%m%dT%H%M%S%3fZ").to_string()
}

/// File-backed alert persistence. Cheap to clone; clones share nothing but
/// the directory.
#[derive(Debug, Clone)]
pub struct StorageManager {
    config: StorageConfig,
}

impl StorageManager {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn directory(&self) -> &Path {
        &self.config.alerts_directory
    }

    pub fn current_path(&self) -> PathBuf {
        self.directory().join(CURRENT_FILE)
    }

    pub fn historical_path(&self) -> PathBuf {
        self.directory().join(HISTORICAL_FILE)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.directory().join(BACKUP_DIR)
    }

    pub fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.directory()
            .join(format!("{}{}.json", DAILY_PREFIX, date.format("%Y-%m-%d")))
    }

    /// Create the directory layout. If that fails, one attempt is made to
    /// write an empty current file; startup continues only if it succeeds.
    pub async fn initialize(&self) -> Result<(), StorageError> {
        for dir in [self.directory().to_path_buf(), self.backups_dir()] {
            if let Err(e) = fs::create_dir_all(&dir).await {
                warn!("Failed to create {}: {}", dir.display(), e);
                return match self
                    .write_json(&self.current_path(), &CurrentFile::new(Vec::new()))
                    .await
                {
                    Ok(_) => {
                        warn!("Storage fallback succeeded, starting with empty state");
                        Ok(())
                    }
                    Err(fallback) => Err(StorageError::FatalInit {
                        path: dir,
                        reason: format!("{}; fallback write failed: {}", e, fallback),
                    }),
                };
            }
        }

        info!("Storage ready at {}", self.directory().display());
        Ok(())
    }

    /// Read and parse a JSON file.
    ///
    /// Missing or blank files load as None. Unparseable files are copied to
    /// `backups/corrupted_<stem>_<ts>.json` and also load as None.
    pub async fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StorageError> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!("{} is not valid UTF-8: {}", path.display(), e);
                self.quarantine(path).await;
                return Ok(None);
            }
            Err(e) => return Err(StorageError::io(path, e)),
        };

        if content.trim().is_empty() {
            debug!("{} is empty", path.display());
            return Ok(None);
        }

        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("{} is corrupted: {}", path.display(), e);
                self.quarantine(path).await;
                Ok(None)
            }
        }
    }

    /// Best-effort copy of a bad file into the backups directory
    async fn quarantine(&self, path: &Path) {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());
        let target = self
            .backups_dir()
            .join(format!("corrupted_{}_{}.json", stem, stamp()));

        if let Err(e) = fs::create_dir_all(self.backups_dir()).await {
            warn!("Cannot create backups directory: {}", e);
            return;
        }
        match fs::copy(path, &target).await {
            Ok(_) => warn!("Quarantined {} as {}", path.display(), target.display()),
            Err(e) => warn!("Failed to quarantine {}: {}", path.display(), e),
        }
    }

    /// Serialize to `<path>.tmp` and rename into place. Returns bytes written.
    pub(crate) async fn write_json<T: Serialize>(
        &self,
        path: &Path,
        value: &T,
    ) -> Result<u64, StorageError> {
        let bytes = serde_json::to_vec_pretty(value)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| StorageError::io(path, e))?;

        Ok(bytes.len() as u64)
    }

    pub async fn load_current(&self) -> Result<Vec<Alert>, StorageError> {
        Ok(self
            .load::<CurrentFile>(&self.current_path())
            .await?
            .map(|f| f.alerts)
            .unwrap_or_default())
    }

    pub async fn load_historical(&self) -> Result<Vec<Alert>, StorageError> {
        Ok(self
            .load::<HistoricalFile>(&self.historical_path())
            .await?
            .map(|f| f.alerts)
            .unwrap_or_default())
    }

    /// Overwrite the current file with exactly these alerts
    pub async fn write_current(&self, alerts: &[Alert]) -> Result<u64, StorageError> {
        self.write_json(&self.current_path(), &CurrentFile::new(alerts.to_vec()))
            .await
    }

    /// Persist the in-memory set to the current file.
    ///
    /// When the file comes out larger than the configured cap, it is backed
    /// up, the full set is archived, memory is pruned to the most recent
    /// quarter and the current file is rewritten.
    pub async fn save_current(&self, shared: &SharedAlertManager) -> Result<SaveReport, StorageError> {
        let alerts = shared.read().await.alerts().to_vec();
        let bytes = self.write_current(&alerts).await?;

        let mut report = SaveReport {
            saved: alerts.len(),
            bytes,
            ..Default::default()
        };
        if bytes <= self.config.max_current_file_size {
            debug!("Saved {} alerts ({} bytes)", alerts.len(), bytes);
            return Ok(report);
        }

        warn!(
            "Current file is {} bytes (cap {}), archiving",
            bytes, self.config.max_current_file_size
        );
        self.backup_current().await?;
        self.archive(&alerts).await?;

        let remaining = {
            let mut manager = shared.write().await;
            report.pruned = manager.retain_most_recent(alerts.len() / 4);
            manager.alerts().to_vec()
        };

        report.overflowed = true;
        report.saved = remaining.len();
        report.bytes = self.write_current(&remaining).await?;
        info!(
            "Overflow handled: kept {}, pruned {}",
            report.saved, report.pruned
        );
        Ok(report)
    }

    async fn backup_current(&self) -> Result<PathBuf, StorageError> {
        let backups = self.backups_dir();
        fs::create_dir_all(&backups)
            .await
            .map_err(|e| StorageError::io(&backups, e))?;

        let target = backups.join(format!("current_alerts_{}.json", stamp()));
        fs::copy(self.current_path(), &target)
            .await
            .map_err(|e| StorageError::io(&target, e))?;
        Ok(target)
    }

    /// Overwrite the partition for `date` with the alerts raised that day.
    /// Returns the number written.
    pub async fn save_daily(&self, alerts: &[Alert], date: NaiveDate) -> Result<usize, StorageError> {
        let todays: Vec<Alert> = alerts
            .iter()
            .filter(|a| alert_date(a.timestamp) == Some(date))
            .cloned()
            .collect();
        let count = todays.len();

        self.write_json(&self.daily_path(date), &DailyFile::new(date, todays))
            .await?;
        debug!("Daily partition {} holds {} alerts", date, count);
        Ok(count)
    }

    /// Current file plus today's partition
    pub async fn save_all(&self, shared: &SharedAlertManager) -> Result<SaveReport, StorageError> {
        let mut report = self.save_current(shared).await?;
        let alerts = shared.read().await.alerts().to_vec();
        report.daily = self.save_daily(&alerts, Utc::now().date_naive()).await?;
        Ok(report)
    }

    /// Merge alerts into the historical archive, skipping ids already there.
    /// Returns the archive size.
    pub async fn archive(&self, alerts: &[Alert]) -> Result<usize, StorageError> {
        let mut merged = self.load_historical().await?;
        let mut ids: HashSet<String> = merged.iter().map(|a| a.id.clone()).collect();

        let before = merged.len();
        for alert in alerts {
            if ids.insert(alert.id.clone()) {
                merged.push(alert.clone());
            }
        }
        let added = merged.len() - before;
        let total = merged.len();

        self.write_json(&self.historical_path(), &HistoricalFile::new(merged))
            .await?;
        info!("Archived {} new alerts ({} total)", added, total);
        Ok(total)
    }

    pub async fn daily_alerts(&self, date: NaiveDate) -> Result<Vec<Alert>, StorageError> {
        Ok(self
            .load::<DailyFile>(&self.daily_path(date))
            .await?
            .map(|f| f.alerts)
            .unwrap_or_default())
    }

    /// Alerts from every daily partition in `start..=end`
    pub async fn alerts_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Alert>, StorageError> {
        if start > end {
            return Err(StorageError::InvalidRange {
                start,
                end,
                reason: "start is after end".to_string(),
            });
        }
        let span = (end - start).num_days();
        if span > MAX_RANGE_DAYS {
            return Err(StorageError::InvalidRange {
                start,
                end,
                reason: format!("span of {} days exceeds {}", span, MAX_RANGE_DAYS),
            });
        }

        let mut alerts = Vec::new();
        for date in start.iter_days().take_while(|d| *d <= end) {
            alerts.extend(self.daily_alerts(date).await?);
        }
        Ok(alerts)
    }

    /// Daily partitions on disk, newest first
    pub async fn available_daily_files(&self) -> Result<Vec<DailyFileInfo>, StorageError> {
        let dir = self.directory();
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(dir, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(dir, e))?
        {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(date) = file_name
                .strip_prefix(DAILY_PREFIX)
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            else {
                continue;
            };

            let size = entry
                .metadata()
                .await
                .map_err(|e| StorageError::io(entry.path(), e))?
                .len();
            files.push(DailyFileInfo {
                date,
                file_name,
                size,
            });
        }

        files.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(files)
    }
}
