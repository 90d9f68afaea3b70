//! Data models and error types

pub mod errors;
pub mod types;

pub use errors::{AppError, AppResult, ErrorCode};
pub use types::{
    CheckinRequest, CheckinTicket, Insurance, LoginResponse, NewPatient, Patient, QueueEntry,
    Specialty,
};
