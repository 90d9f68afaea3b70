//! Shared constants for the totem gateway
//!
//! Vendor endpoint paths and every timing knob live here so the providers
//! and config modules never hardcode them inline.

// ============================================
// VENDOR ENDPOINT PATHS
// ============================================

/// Form-encoded kiosk login endpoint
pub const LOGIN_PATH: &str = "/login/externo";

/// Patient lookup (GET) and registration (POST)
pub const PATIENTS_PATH: &str = "/pacientesautoage";

/// Insurance plan listing
pub const INSURANCES_PATH: &str = "/convenios";

/// Specialty listing
pub const SPECIALTIES_PATH: &str = "/especialidades";

/// Check-in ticket (boletim) creation
pub const CHECKIN_PATH: &str = "/atendimentoboletim";

/// Queue panel snapshot
pub const QUEUE_PANEL_PATH: &str = "/queue/panel";

// ============================================
// SESSION / HTTP CONSTANTS
// ============================================

/// Safety margin subtracted from the vendor token lifetime. A token is
/// treated as expired this long before the vendor would reject it, so a
/// request started near the boundary never carries a dead token.
pub const TOKEN_EXPIRY_BUFFER_MS: u64 = 5_000;

/// Default vendor request timeout (overridable via TOTEM_API_TIMEOUT_MS)
pub const DEFAULT_API_TIMEOUT_MS: u64 = 15_000;

/// User-Agent sent on every vendor request
pub const USER_AGENT: &str = concat!("totem-gateway/", env!("CARGO_PKG_VERSION"));

// ============================================
// QUEUE FEED CONSTANTS
// ============================================

/// Default queue poll interval (overridable via QUEUE_POLL_INTERVAL_MS)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Reconnection base delay for the panel WebSocket (milliseconds)
pub const WS_RECONNECT_BASE_MS: u64 = 1_000;

/// Maximum reconnection delay (milliseconds)
pub const WS_RECONNECT_MAX_MS: u64 = 30_000;

/// Maximum consecutive reconnection attempts before giving up; the poll
/// loop keeps the panel populated after that.
pub const WS_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Jitter applied to reconnect delays (± percent)
pub const WS_RECONNECT_JITTER_PERCENT: u64 = 20;

// ============================================
// GATEWAY SERVER CONSTANTS
// ============================================

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port
pub const DEFAULT_PORT: u16 = 8080;
