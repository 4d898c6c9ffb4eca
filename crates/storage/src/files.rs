//! On-disk file shapes

use alerting::Alert;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentMetadata {
    pub last_saved: DateTime<Utc>,
    pub count: usize,
}

/// `current_alerts.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentFile {
    pub alerts: Vec<Alert>,
    pub metadata: CurrentMetadata,
}

impl CurrentFile {
    pub fn new(alerts: Vec<Alert>) -> Self {
        let count = alerts.len();
        Self {
            alerts,
            metadata: CurrentMetadata {
                last_saved: Utc::now(),
                count,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetadata {
    pub created: DateTime<Utc>,
    pub count: usize,
}

/// `alerts_YYYY-MM-DD.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFile {
    pub date: NaiveDate,
    pub alerts: Vec<Alert>,
    pub metadata: DailyMetadata,
}

impl DailyFile {
    pub fn new(date: NaiveDate, alerts: Vec<Alert>) -> Self {
        let count = alerts.len();
        Self {
            date,
            alerts,
            metadata: DailyMetadata {
                created: Utc::now(),
                count,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalMetadata {
    pub last_archived: DateTime<Utc>,
    pub count: usize,
}

/// `historical_alerts.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalFile {
    pub alerts: Vec<Alert>,
    pub metadata: HistoricalMetadata,
}

impl HistoricalFile {
    pub fn new(alerts: Vec<Alert>) -> Self {
        let count = alerts.len();
        Self {
            alerts,
            metadata: HistoricalMetadata {
                last_archived: Utc::now(),
                count,
            },
        }
    }
}

/// Listing entry for a daily partition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyFileInfo {
    pub date: NaiveDate,
    pub file_name: String,
    pub size: u64,
}
