//! Totem Gateway Server
//!
//! Usage:
//!   cargo run
//!
//! Environment:
//!   TOTEM_API_BASE_URL     - Vendor API base URL (required)
//!   TOTEM_USERNAME         - Kiosk service-account username (required)
//!   TOTEM_PASSWORD         - Kiosk service-account password (required)
//!   TOTEM_EMPRESA          - Company/branch identifier (required)
//!   TOTEM_API_TIMEOUT_MS   - Vendor request timeout (default: 15000)
//!   PANEL_WS_URL           - Panel push endpoint (optional; poll-only if unset)
//!   QUEUE_POLL_INTERVAL_MS - Queue poll interval (default: 10000)
//!   TOTEM_HOST / PORT      - Bind address (default: 0.0.0.0:8080)
//!   RUST_LOG               - Log filter (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use totem_gateway::api::{create_router, handlers::AppState, start_cleanup_task};
use totem_gateway::config::TotemConfig;
use totem_gateway::providers::vendor::VendorApi;
use totem_gateway::queue::QueueFeed;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = TotemConfig::from_env()?;

    let vendor = Arc::new(VendorApi::new(&config)?);

    // Warm the session up front; a failure here is logged, not fatal — the
    // first kiosk request will retry the login.
    if vendor.session().ensure_session().await.is_some() {
        info!("🔑 Vendor session warmed up");
    }

    let queue = QueueFeed::spawn(
        vendor.clone(),
        config.poll_interval,
        config.panel_ws_url.clone(),
    );

    let state = Arc::new(AppState::new(vendor, queue));

    start_cleanup_task();

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🏥 Totem gateway starting on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /v1/queue           - Queue panel snapshot");
    info!("  GET  /v1/patients        - Patient lookup by document");
    info!("  POST /v1/patients        - Patient registration");
    info!("  GET  /v1/convenios       - Insurance plans");
    info!("  GET  /v1/especialidades  - Specialties");
    info!("  POST /v1/checkin         - Check-in ticket");
    info!("  GET  /v1/health          - Health check");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("🏥 Totem gateway shutdown complete");
    Ok(())
}
