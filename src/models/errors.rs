//! Centralized error handling
//!
//! Every failure carries a unique, stable error code so production logs can
//! be grepped per failure class.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - AUTH_xxx: vendor session/login errors
//! - VENDOR_xxx: vendor REST transport errors
//! - WS_xxx: panel WebSocket errors
//! - QUEUE_xxx: queue feed errors
//! - CFG_xxx: configuration errors
//! - API_xxx: gateway API errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Session / Auth Errors
    // ============================================
    /// Vendor login rejected the kiosk credentials
    AuthLoginFailed,
    /// No session could be established (login swallowed to None upstream)
    AuthSessionUnavailable,
    /// Vendor rejected the bearer token twice in a row
    AuthUnauthorized,

    // ============================================
    // Vendor Transport Errors
    // ============================================
    /// Vendor request failed at the transport level
    VendorConnectionFailed,
    /// Vendor request timed out
    VendorTimeout,
    /// Vendor returned a non-success status
    VendorStatus,
    /// Vendor response body failed to decode
    VendorInvalidResponse,

    // ============================================
    // Panel WebSocket Errors
    // ============================================
    /// WebSocket connection failed
    WsConnectionFailed,
    /// WebSocket payload failed validation
    WsInvalidPayload,
    /// Reconnect budget exhausted
    WsReconnectExhausted,

    // ============================================
    // Queue Feed Errors
    // ============================================
    /// Queue poll failed
    QueuePollFailed,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Missing environment variable
    ConfigMissingEnv,
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Gateway API Errors
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,

    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthLoginFailed => "AUTH_LOGIN_FAILED",
            Self::AuthSessionUnavailable => "AUTH_SESSION_UNAVAILABLE",
            Self::AuthUnauthorized => "AUTH_UNAUTHORIZED",

            Self::VendorConnectionFailed => "VENDOR_CONNECTION_FAILED",
            Self::VendorTimeout => "VENDOR_TIMEOUT",
            Self::VendorStatus => "VENDOR_STATUS",
            Self::VendorInvalidResponse => "VENDOR_INVALID_RESPONSE",

            Self::WsConnectionFailed => "WS_CONNECTION_FAILED",
            Self::WsInvalidPayload => "WS_INVALID_PAYLOAD",
            Self::WsReconnectExhausted => "WS_RECONNECT_EXHAUSTED",

            Self::QueuePollFailed => "QUEUE_POLL_FAILED",

            Self::ConfigMissingEnv => "CFG_MISSING_ENV",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for gateway API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest | Self::ConfigInvalidValue => 400,
            Self::AuthLoginFailed | Self::AuthUnauthorized => 401,
            Self::ApiRateLimited => 429,
            Self::AuthSessionUnavailable
            | Self::VendorConnectionFailed
            | Self::VendorTimeout
            | Self::VendorStatus => 502,
            _ => 500,
        }
    }

    /// Check if error is retryable by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::VendorTimeout
                | Self::VendorConnectionFailed
                | Self::WsConnectionFailed
                | Self::QueuePollFailed
                | Self::AuthSessionUnavailable
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    pub fn login_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthLoginFailed, msg)
    }

    /// `ensure_session` yielded no token
    pub fn session_unavailable() -> Self {
        Self::new(
            ErrorCode::AuthSessionUnavailable,
            "No vendor session available",
        )
    }

    /// Token rejected on the retried request as well
    pub fn unauthorized(status: u16) -> Self {
        Self::new(
            ErrorCode::AuthUnauthorized,
            format!("Vendor rejected the renewed token (HTTP {})", status),
        )
    }

    /// Vendor returned a non-success, non-auth status
    pub fn vendor_status(status: u16) -> Self {
        Self::new(
            ErrorCode::VendorStatus,
            format!("Vendor returned HTTP {}", status),
        )
    }

    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::WsInvalidPayload, msg)
    }

    pub fn missing_env(name: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingEnv,
            format!("Missing environment variable: {}", name),
        )
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidValue, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::VendorTimeout, "Vendor request timed out")
        } else if err.is_connect() {
            Self::new(ErrorCode::VendorConnectionFailed, "Vendor connection failed")
        } else if err.is_decode() {
            Self::with_source(
                ErrorCode::VendorInvalidResponse,
                "Vendor response decode failed",
                err,
            )
        } else {
            Self::new(ErrorCode::Unknown, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::VendorInvalidResponse, "JSON parse error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::session_unavailable();
        assert_eq!(err.code, ErrorCode::AuthSessionUnavailable);
        assert_eq!(err.code_str(), "AUTH_SESSION_UNAVAILABLE");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::VendorTimeout.is_retryable());
        assert!(ErrorCode::QueuePollFailed.is_retryable());
        assert!(!ErrorCode::AuthUnauthorized.is_retryable());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::ApiBadRequest.http_status(), 400);
        assert_eq!(ErrorCode::AuthUnauthorized.http_status(), 401);
        assert_eq!(ErrorCode::ApiRateLimited.http_status(), 429);
        assert_eq!(ErrorCode::VendorTimeout.http_status(), 502);
        assert_eq!(ErrorCode::Unknown.http_status(), 500);
    }

    #[test]
    fn test_display_includes_code() {
        let err = AppError::vendor_status(503);
        assert!(err.to_string().starts_with("[VENDOR_STATUS]"));
        assert!(err.to_string().contains("503"));
    }
}
