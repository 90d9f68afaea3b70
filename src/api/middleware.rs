//! Gateway middleware (rate limiting, request logging)

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// Rate limiter configuration
pub struct RateLimitConfig {
    /// Requests per window
    pub requests_per_window: u32,
    /// Window duration
    pub window_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            // A kiosk produces a handful of requests per intake; this is
            // generous headroom for a lobby full of panels and totems.
            requests_per_window: 120,
            window_duration: Duration::from_secs(60),
        }
    }
}

/// One client's usage within the current window
#[derive(Clone, Copy)]
struct Window {
    hits: u32,
    opened: Instant,
}

impl Window {
    fn fresh(now: Instant) -> Self {
        Self { hits: 0, opened: now }
    }

    fn age(&self, now: Instant) -> Duration {
        now.duration_since(self.opened)
    }
}

/// Outcome of a rate-limit check, surfaced as `X-RateLimit-*` headers
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_secs: u64,
}

/// In-memory rate limiter keyed by client address header
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    pub fn check(&self, key: &str) -> RateDecision {
        let now = Instant::now();

        let mut window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Window::fresh(now));

        if window.age(now) > self.config.window_duration {
            *window = Window::fresh(now);
        }

        let reset_secs = self
            .config
            .window_duration
            .saturating_sub(window.age(now))
            .as_secs();

        if window.hits >= self.config.requests_per_window {
            return RateDecision {
                allowed: false,
                remaining: 0,
                reset_secs,
            };
        }

        window.hits += 1;
        RateDecision {
            allowed: true,
            remaining: self.config.requests_per_window - window.hits,
            reset_secs,
        }
    }

    /// Drop windows stale for more than two periods (call periodically)
    pub fn cleanup(&self) {
        let now = Instant::now();
        let stale_after = self.config.window_duration * 2;
        self.windows.retain(|_, window| window.age(now) < stale_after);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

// Global rate limiter instance
lazy_static::lazy_static! {
    pub static ref RATE_LIMITER: Arc<RateLimiter> = Arc::new(RateLimiter::default());
}

/// Periodic cleanup of stale rate-limit windows
pub fn start_cleanup_task() {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(120));
        loop {
            interval.tick().await;
            RATE_LIMITER.cleanup();
        }
    });
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Health checks are exempt
    if request.uri().path() == "/health" || request.uri().path() == "/v1/health" {
        return Ok(next.run(request).await);
    }

    let rate_key = headers
        .get("X-Forwarded-For")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("local")
        .to_string();

    let decision = RATE_LIMITER.check(&rate_key);

    if !decision.allowed {
        warn!(key = %rate_key, "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Remaining", decision.remaining.into());
    headers.insert("X-RateLimit-Reset", decision.reset_secs.into());

    Ok(response)
}

/// Request logging middleware. The request id ties gateway log lines to the
/// kiosk screen an operator is looking at.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = Uuid::new_v4();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri.path(),
        status = %status.as_u16(),
        latency_ms = %latency.as_millis(),
        "Request completed"
    );

    response
}
