//! Kiosk-facing gateway API
//! REST surface for the intake wizard and the queue display panel

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

pub use middleware::start_cleanup_task;
pub use routes::create_router;
pub use types::*;
