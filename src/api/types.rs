//! Gateway API request/response types

use serde::{Deserialize, Serialize};

use crate::models::errors::AppError;
use crate::models::types::QueueEntry;
use crate::queue::QueueState;

/// Envelope shared by every gateway response. `success` is derived from
/// whether an error body is present, so the two can never disagree.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    fn stamped(data: Option<T>, error: Option<ApiError>, latency_ms: f64) -> Self {
        Self {
            success: error.is_none(),
            data,
            error,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn success(data: T, latency_ms: f64) -> Self {
        Self::stamped(Some(data), None, latency_ms)
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self::stamped(None, Some(error), latency_ms)
    }
}

/// API Error body
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
        }
    }
}

// ============================================
// Health Check
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Whether a vendor session is currently cached
    pub session_active: bool,
    /// Whether the panel feed is on the push path
    pub queue_realtime: bool,
}

// ============================================
// Queue Panel
// ============================================

#[derive(Debug, Serialize)]
pub struct QueueSnapshotData {
    pub entries: Vec<QueueEntry>,
    pub realtime: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<QueueState> for QueueSnapshotData {
    fn from(state: QueueState) -> Self {
        Self {
            entries: state.entries,
            realtime: state.realtime,
            last_error: state.last_error,
            updated_at: state.updated_at,
        }
    }
}

// ============================================
// Intake
// ============================================

#[derive(Debug, Deserialize)]
pub struct PatientLookupQuery {
    pub documento: String,
}
