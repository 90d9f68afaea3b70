//! Totem Gateway Library
//!
//! Backend gateway for a hospital self-service intake kiosk (totem) and its
//! queue display panel, built atop a third-party clinic-management API:
//! - Token-cached vendor authentication with single-flight login
//! - Authed HTTP client with retry-once semantics on 401/403
//! - Live queue feed fanning in a poll loop and a WebSocket subscription

pub mod api;
pub mod config;
pub mod models;
pub mod providers;
pub mod queue;
pub mod session;
pub mod utils;

pub use config::TotemConfig;
pub use models::errors::{AppError, AppResult, ErrorCode};
pub use models::types::{
    CheckinRequest, CheckinTicket, Insurance, LoginResponse, NewPatient, Patient, QueueEntry,
    Specialty,
};
pub use providers::vendor::VendorApi;
pub use providers::websocket::{PanelEvent, PanelWsClient};
pub use queue::{QueueFeed, QueueState};
pub use session::{SessionManager, TokenSource};
