//! Alert service facade
//!
//! Owns the alert manager, storage, the persistence task and the
//! monitoring scheduler. Every operation returns an [`ApiResponse`]; nothing
//! here panics or returns an error across the boundary.

use crate::response::{AlertList, ApiResponse, ServiceError};
use crate::settings::Settings;
use alerting::{shared, Alert, AlertManager, AlertStats, AlertType, Severity, SharedAlertManager};
use chrono::NaiveDate;
use monitor::{
    CycleReport, MonitoringScheduler, MonitoringStatus, RunStats, SchedulerConfig,
    SchedulerConfigPatch,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use storage::{
    CollectionReport, DailyFileInfo, FlightRecorder, RecorderStatus, SaveReport, StorageManager,
    StorageWriter, WriterHandle,
};
use telemetry::TelemetrySource;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Criteria for [`AlertService::filtered_alerts`]; unset fields match all
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertFilter {
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub severity: Option<String>,
    pub active: Option<bool>,
    /// Only alerts at or after this time (ms since epoch)
    pub since: Option<i64>,
    pub limit: Option<usize>,
    /// Also search the historical archive
    pub include_historical: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitReport {
    pub loaded_alerts: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigBody {
    pub config: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBody {
    pub stats: RunStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadBody {
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearBody {
    pub archived: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBody {
    pub date: NaiveDate,
    pub alerts: Vec<Alert>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyFilesBody {
    pub files: Vec<DailyFileInfo>,
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| ServiceError::Validation {
        field,
        reason: format!("expected YYYY-MM-DD, got '{}': {}", value, e),
    })
}

fn parse_type(value: &str) -> Result<AlertType, ServiceError> {
    value.parse().map_err(|e: detectors::DetectorConfigError| ServiceError::Validation {
        field: "type",
        reason: e.to_string(),
    })
}

fn parse_severity(value: &str) -> Result<Severity, ServiceError> {
    value.parse().map_err(|e: detectors::DetectorConfigError| ServiceError::Validation {
        field: "severity",
        reason: e.to_string(),
    })
}

/// Merge two alert lists, keeping the first occurrence of each id, sorted
/// by timestamp
fn merge_by_id(first: Vec<Alert>, second: Vec<Alert>) -> Vec<Alert> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Alert> = first
        .into_iter()
        .chain(second)
        .filter(|a| seen.insert(a.id.clone()))
        .collect();
    merged.sort_by_key(|a| a.timestamp);
    merged
}

/// Entry point for every outer surface (binary, HTTP layer, tests)
pub struct AlertService {
    alerts: SharedAlertManager,
    storage: StorageManager,
    scheduler: MonitoringScheduler,
    recorder: FlightRecorder,
    writer: Mutex<Option<(WriterHandle, JoinHandle<()>)>>,
}

impl AlertService {
    /// Wire the components. No I/O happens until [`initialize`](Self::initialize).
    pub fn new(settings: &Settings, source: Arc<dyn TelemetrySource>) -> Self {
        let manager = AlertManager::new(settings.alerts.clone(), &settings.airport);
        let alerts = shared(manager);
        let storage = StorageManager::new(settings.storage.clone());
        let scheduler = MonitoringScheduler::new(
            source.clone(),
            alerts.clone(),
            settings.monitoring.scheduler.clone(),
        );
        let recorder = FlightRecorder::new(source, storage.clone(), settings.recorder.clone());

        Self {
            alerts,
            storage,
            scheduler,
            recorder,
            writer: Mutex::new(None),
        }
    }

    pub fn alert_manager(&self) -> &SharedAlertManager {
        &self.alerts
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn scheduler(&self) -> &MonitoringScheduler {
        &self.scheduler
    }

    pub fn recorder(&self) -> &FlightRecorder {
        &self.recorder
    }

    /// Alerts created by any analysis cycle
    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.scheduler.subscribe()
    }

    /// Prepare storage, load persisted alerts and start the writer task.
    /// Calling it again is a no-op.
    pub async fn try_initialize(&self) -> Result<usize, ServiceError> {
        let mut writer = self.writer.lock().await;
        if writer.is_some() {
            return Ok(self.alerts.read().await.alerts().len());
        }

        self.storage.initialize().await?;
        let loaded = self.storage.load_current().await?;
        let count = loaded.len();

        let (handle, task) = StorageWriter::spawn(self.storage.clone(), self.alerts.clone());
        {
            let mut manager = self.alerts.write().await;
            manager.replace_alerts(loaded);
            manager.set_save_trigger(Arc::new(handle.save_trigger()));
        }
        *writer = Some((handle, task));

        info!("Alert service initialized with {} alerts", count);
        Ok(count)
    }

    pub async fn initialize(&self) -> ApiResponse<InitReport> {
        ApiResponse::from_result(
            self.try_initialize()
                .await
                .map(|loaded_alerts| InitReport { loaded_alerts }),
        )
    }

    async fn writer(&self) -> Result<WriterHandle, ServiceError> {
        self.writer
            .lock()
            .await
            .as_ref()
            .map(|(handle, _)| handle.clone())
            .ok_or(ServiceError::NotInitialized)
    }

    /// Stop monitoring and recording if running, then final save and archive
    pub async fn shutdown(&self) -> ApiResponse<SaveReport> {
        if self.scheduler.is_running().await {
            if let Err(e) = self.scheduler.stop().await {
                warn!("Stopping monitoring during shutdown failed: {}", e);
            }
        }
        if self.recorder.is_running().await {
            if let Err(e) = self.recorder.stop().await {
                warn!("Stopping flight recording during shutdown failed: {}", e);
            }
        }

        let taken = self.writer.lock().await.take();
        let result = match taken {
            Some((handle, task)) => {
                let result = handle.shutdown().await.map_err(ServiceError::from);
                if let Err(e) = task.await {
                    warn!("Storage writer ended abnormally: {}", e);
                }
                result
            }
            None => Err(ServiceError::NotInitialized),
        };

        if result.is_ok() {
            info!("Alert service shut down");
        }
        ApiResponse::from_result(result)
    }

    pub async fn start_monitoring(&self, patch: SchedulerConfigPatch) -> ApiResponse<ConfigBody> {
        ApiResponse::from_result(
            self.scheduler
                .start(patch)
                .await
                .map(|config| ConfigBody { config })
                .map_err(ServiceError::from),
        )
    }

    pub async fn stop_monitoring(&self) -> ApiResponse<StatsBody> {
        ApiResponse::from_result(
            self.scheduler
                .stop()
                .await
                .map(|stats| StatsBody { stats })
                .map_err(ServiceError::from),
        )
    }

    pub async fn monitoring_status(&self) -> ApiResponse<MonitoringStatus> {
        ApiResponse::ok(self.scheduler.status().await)
    }

    pub async fn update_monitoring_config(
        &self,
        patch: SchedulerConfigPatch,
    ) -> ApiResponse<ConfigBody> {
        ApiResponse::from_result(
            self.scheduler
                .update_config(patch)
                .await
                .map(|config| ConfigBody { config })
                .map_err(ServiceError::from),
        )
    }

    pub async fn run_manual_analysis(&self) -> ApiResponse<CycleReport> {
        ApiResponse::from_result(self.scheduler.run_once().await.map_err(ServiceError::from))
    }

    pub async fn start_collection(&self) -> ApiResponse<RecorderStatus> {
        ApiResponse::from_result(self.recorder.start().await.map_err(ServiceError::from))
    }

    pub async fn stop_collection(&self) -> ApiResponse<RecorderStatus> {
        ApiResponse::from_result(self.recorder.stop().await.map_err(ServiceError::from))
    }

    pub async fn collection_status(&self) -> ApiResponse<RecorderStatus> {
        ApiResponse::ok(self.recorder.status().await)
    }

    /// Record one poll now
    pub async fn trigger_collection(&self) -> ApiResponse<CollectionReport> {
        ApiResponse::from_result(self.recorder.trigger().await.map_err(ServiceError::from))
    }

    pub async fn active_alerts(&self) -> ApiResponse<AlertList> {
        ApiResponse::ok(self.alerts.read().await.active_alerts().into())
    }

    pub async fn all_alerts(&self) -> ApiResponse<AlertList> {
        ApiResponse::ok(self.alerts.read().await.alerts().to_vec().into())
    }

    pub async fn alerts_by_type(&self, alert_type: &str) -> ApiResponse<AlertList> {
        let result = match parse_type(alert_type) {
            Ok(t) => Ok(self.alerts.read().await.alerts_by_type(t).into()),
            Err(e) => Err(e),
        };
        ApiResponse::from_result(result)
    }

    pub async fn alerts_by_severity(&self, severity: &str) -> ApiResponse<AlertList> {
        let result = match parse_severity(severity) {
            Ok(s) => Ok(self.alerts.read().await.alerts_by_severity(s).into()),
            Err(e) => Err(e),
        };
        ApiResponse::from_result(result)
    }

    pub async fn alerts_stats(&self) -> ApiResponse<AlertStats> {
        ApiResponse::ok(self.alerts.read().await.stats())
    }

    /// In-memory alerts (optionally merged with the archive) matching the
    /// filter, newest first
    pub async fn filtered_alerts(&self, filter: AlertFilter) -> ApiResponse<AlertList> {
        ApiResponse::from_result(self.try_filtered_alerts(filter).await)
    }

    async fn try_filtered_alerts(&self, filter: AlertFilter) -> Result<AlertList, ServiceError> {
        let alert_type = filter.alert_type.as_deref().map(parse_type).transpose()?;
        let severity = filter.severity.as_deref().map(parse_severity).transpose()?;

        let current = self.alerts.read().await.alerts().to_vec();
        let pool = if filter.include_historical {
            merge_by_id(current, self.storage.load_historical().await?)
        } else {
            current
        };

        let mut matched: Vec<Alert> = pool
            .into_iter()
            .filter(|a| alert_type.map_or(true, |t| a.alert_type == t))
            .filter(|a| severity.map_or(true, |s| a.severity == s))
            .filter(|a| filter.active.map_or(true, |active| a.active == active))
            .filter(|a| filter.since.map_or(true, |since| a.timestamp >= since))
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched.into())
    }

    pub async fn save_alerts(&self) -> ApiResponse<SaveReport> {
        let result = match self.writer().await {
            Ok(writer) => writer.save().await.map_err(ServiceError::from),
            Err(e) => Err(e),
        };
        ApiResponse::from_result(result)
    }

    /// Replace the in-memory set with the current file's content
    pub async fn reload_alerts(&self) -> ApiResponse<ReloadBody> {
        let result = match self.storage.load_current().await {
            Ok(alerts) => {
                let count = alerts.len();
                self.alerts.write().await.replace_alerts(alerts);
                Ok(ReloadBody { count })
            }
            Err(e) => Err(ServiceError::from(e)),
        };
        ApiResponse::from_result(result)
    }

    /// Archive everything, then empty memory and the current file
    pub async fn clear_all_alerts(&self) -> ApiResponse<ClearBody> {
        let result = match self.writer().await {
            Ok(writer) => writer
                .archive_and_clear()
                .await
                .map(|archived| ClearBody { archived })
                .map_err(ServiceError::from),
            Err(e) => Err(e),
        };
        ApiResponse::from_result(result)
    }

    /// Archive plus in-memory alerts, deduplicated, oldest first
    pub async fn full_history(&self) -> ApiResponse<AlertList> {
        let result = match self.storage.load_historical().await {
            Ok(historical) => {
                let current = self.alerts.read().await.alerts().to_vec();
                Ok(merge_by_id(historical, current).into())
            }
            Err(e) => Err(ServiceError::from(e)),
        };
        ApiResponse::from_result(result)
    }

    pub async fn alerts_by_date_range(&self, start: &str, end: &str) -> ApiResponse<AlertList> {
        ApiResponse::from_result(self.try_alerts_by_date_range(start, end).await)
    }

    async fn try_alerts_by_date_range(&self, start: &str, end: &str) -> Result<AlertList, ServiceError> {
        let start = parse_date("startDate", start)?;
        let end = parse_date("endDate", end)?;
        Ok(self.storage.alerts_in_range(start, end).await?.into())
    }

    pub async fn daily_alerts(&self, date: &str) -> ApiResponse<DailyBody> {
        ApiResponse::from_result(self.try_daily_alerts(date).await)
    }

    async fn try_daily_alerts(&self, date: &str) -> Result<DailyBody, ServiceError> {
        let date = parse_date("date", date)?;
        let alerts = self.storage.daily_alerts(date).await?;
        Ok(DailyBody {
            date,
            count: alerts.len(),
            alerts,
        })
    }

    pub async fn available_daily_files(&self) -> ApiResponse<DailyFilesBody> {
        ApiResponse::from_result(
            self.storage
                .available_daily_files()
                .await
                .map(|files| DailyFilesBody { files })
                .map_err(ServiceError::from),
        )
    }
}
