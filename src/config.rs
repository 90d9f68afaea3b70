//! Gateway configuration
//!
//! Everything comes from the environment. Credentials are required at
//! startup; the rest has sensible defaults. Secrets are never logged.

use std::time::Duration;
use tracing::info;

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    DEFAULT_API_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_POLL_INTERVAL_MS,
};

/// Runtime configuration for the totem gateway
#[derive(Debug, Clone)]
pub struct TotemConfig {
    /// Base URL of the vendor clinic-management API
    pub api_base_url: String,
    /// Timeout applied to every vendor request
    pub api_timeout: Duration,
    /// Kiosk service-account credentials
    pub username: String,
    pub password: String,
    /// Company/branch identifier sent with the login
    pub empresa: String,
    /// Panel push endpoint; `None` leaves the feed poll-only
    pub panel_ws_url: Option<String>,
    /// Queue poll interval
    pub poll_interval: Duration,
    /// Gateway bind address
    pub host: String,
    pub port: u16,
}

impl TotemConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> AppResult<Self> {
        let api_base_url = require_env("TOTEM_API_BASE_URL")?;
        let username = require_env("TOTEM_USERNAME")?;
        let password = require_env("TOTEM_PASSWORD")?;
        let empresa = require_env("TOTEM_EMPRESA")?;

        let api_timeout =
            Duration::from_millis(env_millis("TOTEM_API_TIMEOUT_MS", DEFAULT_API_TIMEOUT_MS)?);
        let poll_interval =
            Duration::from_millis(env_millis("QUEUE_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?);

        let panel_ws_url = std::env::var("PANEL_WS_URL")
            .ok()
            .filter(|v| !v.is_empty());

        let host = std::env::var("TOTEM_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        // PORT takes precedence on managed platforms
        let port: u16 = std::env::var("PORT")
            .or_else(|_| std::env::var("TOTEM_PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let config = Self {
            api_base_url: normalize_base_url(api_base_url),
            api_timeout,
            username,
            password,
            empresa,
            panel_ws_url,
            poll_interval,
            host,
            port,
        };
        config.log_summary();
        Ok(config)
    }

    /// Log the effective configuration with secrets hidden.
    fn log_summary(&self) {
        info!(
            api_base_url = %self.api_base_url,
            timeout_ms = %self.api_timeout.as_millis(),
            poll_interval_ms = %self.poll_interval.as_millis(),
            panel_ws = %self.panel_ws_url.as_deref().unwrap_or("(poll only)"),
            "🔧 Totem gateway configured (credentials hidden)"
        );
    }
}

fn require_env(name: &str) -> AppResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::missing_env(name))
}

fn env_millis(name: &str, default: u64) -> AppResult<u64> {
    parse_millis(name, std::env::var(name).ok(), default)
}

/// A zero interval would panic `tokio::time::interval` inside the poll task
/// and kill the feed, so zero is a config error like any other bad value.
fn parse_millis(name: &str, raw: Option<String>, default: u64) -> AppResult<u64> {
    let millis = match raw {
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            AppError::invalid_config(format!("{} must be an integer, got {:?}", name, raw))
        })?,
        None => default,
    };
    if millis == 0 {
        return Err(AppError::invalid_config(format!(
            "{} must be greater than zero",
            name
        )));
    }
    Ok(millis)
}

/// Vendor paths all start with `/`, so strip a trailing slash once here.
fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;

    #[test]
    fn test_parse_millis_default_when_unset() {
        assert_eq!(
            parse_millis("QUEUE_POLL_INTERVAL_MS", None, 10_000).unwrap(),
            10_000
        );
    }

    #[test]
    fn test_parse_millis_accepts_positive_value() {
        assert_eq!(
            parse_millis("QUEUE_POLL_INTERVAL_MS", Some("250".to_string()), 10_000).unwrap(),
            250
        );
    }

    #[test]
    fn test_parse_millis_rejects_zero() {
        let err = parse_millis("QUEUE_POLL_INTERVAL_MS", Some("0".to_string()), 10_000)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn test_parse_millis_rejects_zero_timeout() {
        let err =
            parse_millis("TOTEM_API_TIMEOUT_MS", Some("0".to_string()), 15_000).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        assert!(err.message.contains("TOTEM_API_TIMEOUT_MS"));
    }

    #[test]
    fn test_parse_millis_rejects_garbage() {
        let err = parse_millis("QUEUE_POLL_INTERVAL_MS", Some("soon".to_string()), 10_000)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://erp.example.com/api/".to_string()),
            "https://erp.example.com/api"
        );
        assert_eq!(
            normalize_base_url("https://erp.example.com/api".to_string()),
            "https://erp.example.com/api"
        );
    }
}
