//! Uniform response envelope for facade operations

use alerting::Alert;
use monitor::SchedulerError;
use serde::Serialize;
use storage::{RecorderError, StorageError};
use thiserror::Error;

/// Failure category reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Bad input from the caller
    Validation,
    /// Operation not allowed in the current state
    Conflict,
    Internal,
}

/// Errors raised inside the service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("Alert service is not initialized")]
    NotInitialized,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation { .. } => ErrorKind::Validation,
            ServiceError::Storage(e) if e.is_validation() => ErrorKind::Validation,
            ServiceError::Scheduler(e) if e.is_validation() => ErrorKind::Validation,
            ServiceError::Scheduler(e) if e.is_conflict() => ErrorKind::Conflict,
            ServiceError::Recorder(e) if e.is_validation() => ErrorKind::Validation,
            ServiceError::Recorder(e) if e.is_conflict() => ErrorKind::Conflict,
            ServiceError::NotInitialized => ErrorKind::Conflict,
            _ => ErrorKind::Internal,
        }
    }
}

/// `{success, ...data, error?, errorKind?}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    pub fn fail(error: &ServiceError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    pub fn from_result(result: Result<T, ServiceError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                tracing::warn!("Operation failed: {}", e);
                Self::fail(&e)
            }
        }
    }
}

/// A list of alerts with its length
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertList {
    pub alerts: Vec<Alert>,
    pub count: usize,
}

impl From<Vec<Alert>> for AlertList {
    fn from(alerts: Vec<Alert>) -> Self {
        Self {
            count: alerts.len(),
            alerts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_flattens_data() {
        let response = ApiResponse::ok(AlertList::from(Vec::new()));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({ "success": true, "alerts": [], "count": 0 }));
    }

    #[test]
    fn test_failure_carries_kind() {
        let response: ApiResponse<AlertList> = ApiResponse::fail(&ServiceError::Scheduler(
            SchedulerError::AlreadyRunning,
        ));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["errorKind"], "conflict");
        assert!(value.get("alerts").is_none());
    }

    #[test]
    fn test_error_kinds() {
        let validation = ServiceError::Validation {
            field: "date",
            reason: "bad".into(),
        };
        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert_eq!(
            ServiceError::Scheduler(SchedulerError::Telemetry(
                telemetry::TelemetryError::Exhausted
            ))
            .kind(),
            ErrorKind::Internal
        );
    }
}
