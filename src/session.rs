//! Vendor session token cache with single-flight login
//!
//! The kiosk authenticates with a service account; every vendor request
//! carries the resulting bearer token. The cache holds at most one token and
//! at most one in-flight login: concurrent callers that miss the cache all
//! await the same shared future, so N simultaneous `ensure_session` calls
//! perform exactly one login.
//!
//! Login failures are swallowed here and surfaced as `None` — the request
//! layer turns that into a typed error, the intake flow into a visible
//! "service unavailable" state. Nothing in this module panics the kiosk.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use crate::models::errors::AppResult;
use crate::models::types::LoginResponse;
use crate::utils::constants::TOKEN_EXPIRY_BUFFER_MS;

/// Anything that can perform the vendor login. The production impl posts
/// form-encoded credentials to `/login/externo`; tests inject counting fakes.
pub trait TokenSource: Send + Sync {
    fn fetch_token(&self) -> BoxFuture<'static, AppResult<LoginResponse>>;
}

/// A cached bearer token with its local expiry instant.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// Expiry is `issued_at + expires_in - buffer`. A token whose lifetime
    /// does not exceed the buffer is born expired.
    fn from_login(login: &LoginResponse) -> Self {
        let lifetime_ms = login
            .expires_in
            .saturating_mul(1_000)
            .saturating_sub(TOKEN_EXPIRY_BUFFER_MS);
        Self {
            access_token: login.access_token.clone(),
            expires_at: Instant::now() + Duration::from_millis(lifetime_ms),
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// One shared login attempt; clones of this future all resolve to the same
/// outcome. `None` means the login failed.
type LoginFlight = Shared<BoxFuture<'static, Option<String>>>;

#[derive(Default)]
struct SessionSlot {
    token: Option<CachedToken>,
    inflight: Option<LoginFlight>,
}

impl SessionSlot {
    fn valid_token(&self) -> Option<String> {
        self.token
            .as_ref()
            .filter(|t| !t.is_expired())
            .map(|t| t.access_token.clone())
    }
}

/// Thread-safe session manager. Cheap to clone; clones share the slot.
#[derive(Clone)]
pub struct SessionManager {
    slot: Arc<Mutex<SessionSlot>>,
    source: Arc<dyn TokenSource>,
}

impl SessionManager {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(SessionSlot::default())),
            source,
        }
    }

    /// Cached token, or `None` at/after its expiry instant. Never logs in.
    pub fn current_token(&self) -> Option<String> {
        self.lock_slot().valid_token()
    }

    /// Cached token if valid, otherwise the result of the (single) login in
    /// flight. Errors are swallowed: a failed login yields `None`.
    pub async fn ensure_session(&self) -> Option<String> {
        let flight = {
            let mut slot = self.lock_slot();
            if let Some(token) = slot.valid_token() {
                return Some(token);
            }
            match slot.inflight.clone() {
                Some(flight) => flight,
                None => {
                    let flight = Self::spawn_login(self.slot.clone(), self.source.clone());
                    slot.inflight = Some(flight.clone());
                    flight
                }
            }
        };
        // Lock released before awaiting; late joiners clone the same flight.
        flight.await
    }

    /// Forced invalidation of the cached token. A login already in flight
    /// still stores its result when it completes.
    pub fn clear_session(&self) {
        let mut slot = self.lock_slot();
        slot.token = None;
        slot.inflight = None;
        debug!("🧹 Vendor session cleared");
    }

    fn spawn_login(slot: Arc<Mutex<SessionSlot>>, source: Arc<dyn TokenSource>) -> LoginFlight {
        async move {
            let outcome = source.fetch_token().await;
            let mut guard = slot.lock().expect("session slot mutex poisoned");
            guard.inflight = None;
            match outcome {
                Ok(login) => {
                    let cached = CachedToken::from_login(&login);
                    let token = cached.access_token.clone();
                    debug!(expires_in_s = login.expires_in, "🔑 Vendor session established");
                    guard.token = Some(cached);
                    Some(token)
                }
                Err(e) => {
                    warn!(code = e.code_str(), error = %e, "Vendor login failed; continuing without a session");
                    None
                }
            }
        }
        .boxed()
        .shared()
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, SessionSlot> {
        self.slot.lock().expect("session slot mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counting fake login backend with a configurable delay and outcome.
    struct FakeSource {
        calls: AtomicUsize,
        delay: Duration,
        expires_in: u64,
        fail: bool,
    }

    impl FakeSource {
        fn ok(expires_in: u64) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(30),
                expires_in,
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(10),
                expires_in: 3600,
                fail: true,
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenSource for FakeSource {
        fn fetch_token(&self) -> BoxFuture<'static, AppResult<LoginResponse>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let delay = self.delay;
            let expires_in = self.expires_in;
            let fail = self.fail;
            async move {
                tokio::time::sleep(delay).await;
                if fail {
                    Err(AppError::login_failed("credentials rejected"))
                } else {
                    Ok(LoginResponse {
                        access_token: format!("token-{}", n),
                        expires_in,
                        token_type: Some("Bearer".to_string()),
                    })
                }
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_ensure_triggers_one_login() {
        let source = FakeSource::ok(3600);
        let manager = SessionManager::new(source.clone());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let m = manager.clone();
            handles.push(tokio::spawn(async move { m.ensure_session().await }));
        }

        for handle in handles {
            let token = handle.await.unwrap();
            assert_eq!(token.as_deref(), Some("token-1"));
        }
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cached_token_reused() {
        let source = FakeSource::ok(3600);
        let manager = SessionManager::new(source.clone());

        assert_eq!(manager.ensure_session().await.as_deref(), Some("token-1"));
        assert_eq!(manager.ensure_session().await.as_deref(), Some("token-1"));
        assert_eq!(manager.current_token().as_deref(), Some("token-1"));
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_token_within_buffer_is_expired() {
        // Lifetime (5s) equals the buffer, so the token expires immediately
        let source = FakeSource::ok(5);
        let manager = SessionManager::new(source.clone());

        let token = manager.ensure_session().await;
        assert!(token.is_some(), "login itself succeeds");
        assert_eq!(manager.current_token(), None);

        // The expired cache forces a second login
        manager.ensure_session().await;
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_generous_lifetime_is_valid() {
        let source = FakeSource::ok(3600);
        let manager = SessionManager::new(source);
        manager.ensure_session().await;
        assert!(manager.current_token().is_some());
    }

    #[tokio::test]
    async fn test_login_failure_yields_none_and_is_not_cached() {
        let source = FakeSource::failing();
        let manager = SessionManager::new(source.clone());

        assert_eq!(manager.ensure_session().await, None);
        assert_eq!(manager.current_token(), None);

        // The failed flight is cleared, so the next call retries the login
        assert_eq!(manager.ensure_session().await, None);
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_clear_session_forces_relogin() {
        let source = FakeSource::ok(3600);
        let manager = SessionManager::new(source.clone());

        assert_eq!(manager.ensure_session().await.as_deref(), Some("token-1"));
        manager.clear_session();
        assert_eq!(manager.current_token(), None);
        assert_eq!(manager.ensure_session().await.as_deref(), Some("token-2"));
        assert_eq!(source.call_count(), 2);
    }
}
