//! Gateway API request handlers
//!
//! Thin layer over the vendor client and the queue feed: validate input,
//! delegate, map `AppError` codes to HTTP statuses.

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use super::types::*;
use crate::models::errors::AppError;
use crate::models::types::{CheckinRequest, CheckinTicket, Insurance, NewPatient, Patient, Specialty};
use crate::providers::vendor::VendorApi;
use crate::queue::QueueFeed;

/// Shared application state
pub struct AppState {
    pub vendor: Arc<VendorApi>,
    pub queue: QueueFeed,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(vendor: Arc<VendorApi>, queue: QueueFeed) -> Self {
        Self {
            vendor,
            queue,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

type Rejection = (StatusCode, Json<ApiResponse<()>>);

/// Map an `AppError` to the gateway error envelope.
fn reject(err: AppError, start: Instant) -> Rejection {
    warn!(code = err.code_str(), error = %err, "Request failed");
    let status = StatusCode::from_u16(err.code.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ApiResponse::error(
            ApiError::from(&err),
            elapsed_ms(start),
        )),
    )
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        session_active: state.vendor.session().current_token().is_some(),
        queue_realtime: state.queue.state().realtime,
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Queue Panel
// ============================================

pub async fn get_queue(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<QueueSnapshotData>> {
    let start = Instant::now();
    let snapshot: QueueSnapshotData = state.queue.state().into();
    Json(ApiResponse::success(snapshot, elapsed_ms(start)))
}

// ============================================
// Intake
// ============================================

pub async fn lookup_patient(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PatientLookupQuery>,
) -> Result<Json<ApiResponse<Vec<Patient>>>, Rejection> {
    let start = Instant::now();

    let documento: String = query
        .documento
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if documento.len() < 8 {
        return Err(reject(
            AppError::bad_request("documento must carry at least 8 digits"),
            start,
        ));
    }

    let patients = state
        .vendor
        .lookup_patient(&documento)
        .await
        .map_err(|e| reject(e, start))?;

    Ok(Json(ApiResponse::success(patients, elapsed_ms(start))))
}

pub async fn register_patient(
    State(state): State<Arc<AppState>>,
    Json(new_patient): Json<NewPatient>,
) -> Result<Json<ApiResponse<Patient>>, Rejection> {
    let start = Instant::now();

    if new_patient.nome.trim().is_empty() {
        return Err(reject(AppError::bad_request("nome is required"), start));
    }
    if new_patient.documento.chars().filter(|c| c.is_ascii_digit()).count() < 8 {
        return Err(reject(
            AppError::bad_request("documento must carry at least 8 digits"),
            start,
        ));
    }

    let patient = state
        .vendor
        .register_patient(&new_patient)
        .await
        .map_err(|e| reject(e, start))?;

    Ok(Json(ApiResponse::success(patient, elapsed_ms(start))))
}

pub async fn list_insurances(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Insurance>>>, Rejection> {
    let start = Instant::now();
    let insurances = state
        .vendor
        .list_insurances()
        .await
        .map_err(|e| reject(e, start))?;
    Ok(Json(ApiResponse::success(insurances, elapsed_ms(start))))
}

pub async fn list_specialties(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Specialty>>>, Rejection> {
    let start = Instant::now();
    let specialties = state
        .vendor
        .list_specialties()
        .await
        .map_err(|e| reject(e, start))?;
    Ok(Json(ApiResponse::success(specialties, elapsed_ms(start))))
}

pub async fn create_checkin(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CheckinRequest>,
) -> Result<Json<ApiResponse<CheckinTicket>>, Rejection> {
    let start = Instant::now();

    if request.paciente == 0 {
        return Err(reject(AppError::bad_request("paciente is required"), start));
    }
    if request.especialidade == 0 {
        return Err(reject(
            AppError::bad_request("especialidade is required"),
            start,
        ));
    }

    let ticket = state
        .vendor
        .create_checkin(&request)
        .await
        .map_err(|e| reject(e, start))?;

    Ok(Json(ApiResponse::success(ticket, elapsed_ms(start))))
}
