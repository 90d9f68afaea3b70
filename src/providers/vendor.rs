//! Vendor clinic-management API client
//!
//! Wraps a shared `reqwest::Client`. Every authed request attaches the
//! cached bearer token (awaiting a login if none is cached) and, on a
//! 401/403, clears the session, re-authenticates exactly once and retries
//! the original request once with the new token. The retry is a single
//! inlined second attempt, so there is no loop to guard with a flag.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::TotemConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{
    CheckinRequest, CheckinTicket, Insurance, LoginResponse, NewPatient, Patient, QueueEntry,
    Specialty,
};
use crate::session::{SessionManager, TokenSource};
use crate::utils::constants::{
    CHECKIN_PATH, INSURANCES_PATH, LOGIN_PATH, PATIENTS_PATH, QUEUE_PANEL_PATH, SPECIALTIES_PATH,
    USER_AGENT as USER_AGENT_CONST,
};
use crate::utils::redact::{mask_document, mask_phone};

/// Production `TokenSource`: posts the kiosk service-account credentials
/// form-encoded to `/login/externo`.
pub struct LoginClient {
    http: reqwest::Client,
    login_url: String,
    username: String,
    password: String,
    empresa: String,
}

impl LoginClient {
    pub fn new(http: reqwest::Client, base_url: &str, config: &TotemConfig) -> Self {
        Self {
            http,
            login_url: format!("{}{}", base_url, LOGIN_PATH),
            username: config.username.clone(),
            password: config.password.clone(),
            empresa: config.empresa.clone(),
        }
    }
}

impl TokenSource for LoginClient {
    fn fetch_token(&self) -> BoxFuture<'static, AppResult<LoginResponse>> {
        let http = self.http.clone();
        let url = self.login_url.clone();
        let form = [
            ("username", self.username.clone()),
            ("password", self.password.clone()),
            ("empresa", self.empresa.clone()),
        ];
        async move {
            let response = http.post(&url).form(&form).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(AppError::login_failed(format!(
                    "login rejected with HTTP {}",
                    status.as_u16()
                )));
            }
            let login: LoginResponse = response.json().await?;
            Ok(login)
        }
        .boxed()
    }
}

/// Vendor API client with token-cached auth and retry-once semantics.
#[derive(Clone)]
pub struct VendorApi {
    http: reqwest::Client,
    base_url: String,
    session: SessionManager,
}

impl VendorApi {
    pub fn new(config: &TotemConfig) -> AppResult<Self> {
        let http = Self::build_client(config.api_timeout)?;
        let base_url = config.api_base_url.clone();
        let login = LoginClient::new(http.clone(), &base_url, config);
        let session = SessionManager::new(Arc::new(login));
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    /// The session manager, exposed for health reporting and tests.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    fn build_client(timeout: Duration) -> AppResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))
    }

    // ============================================
    // AUTHED REQUEST CORE (retry-once on 401/403)
    // ============================================

    /// Send an authed request. `build` is invoked once per attempt so the
    /// retried request is a fresh one, not a replayed body.
    async fn send_authed<F>(&self, build: F) -> AppResult<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let token = self
            .session
            .ensure_session()
            .await
            .ok_or_else(AppError::session_unavailable)?;

        let response = build(&self.http).bearer_auth(&token).send().await?;
        if !is_auth_rejection(response.status()) {
            return Ok(response);
        }

        warn!(
            status = response.status().as_u16(),
            "Vendor rejected token; re-authenticating once"
        );
        self.session.clear_session();
        let token = self
            .session
            .ensure_session()
            .await
            .ok_or_else(AppError::session_unavailable)?;

        let retried = build(&self.http).bearer_auth(&token).send().await?;
        if is_auth_rejection(retried.status()) {
            // Second rejection propagates; no further retry
            return Err(AppError::unauthorized(retried.status().as_u16()));
        }
        Ok(retried)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let query: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let response = self
            .send_authed(|http| http.get(&url).query(&query))
            .await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.send_authed(|http| http.post(&url).json(body)).await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::vendor_status(status.as_u16()));
        }
        let value = response.json::<T>().await?;
        Ok(value)
    }

    // ============================================
    // INTAKE ENDPOINTS
    // ============================================

    /// Look up patients by document number.
    pub async fn lookup_patient(&self, documento: &str) -> AppResult<Vec<Patient>> {
        debug!(documento = %mask_document(documento), "🔍 Patient lookup");
        self.get_json(PATIENTS_PATH, &[("cpf", documento)]).await
    }

    /// Register a new patient.
    pub async fn register_patient(&self, patient: &NewPatient) -> AppResult<Patient> {
        debug!(
            documento = %mask_document(&patient.documento),
            telefone = %patient.telefone.as_deref().map(mask_phone).unwrap_or_default(),
            "📝 Patient registration"
        );
        self.post_json(PATIENTS_PATH, patient).await
    }

    /// List insurance plans accepted by the clinic.
    pub async fn list_insurances(&self) -> AppResult<Vec<Insurance>> {
        self.get_json(INSURANCES_PATH, &[]).await
    }

    /// List available specialties.
    pub async fn list_specialties(&self) -> AppResult<Vec<Specialty>> {
        self.get_json(SPECIALTIES_PATH, &[]).await
    }

    /// Create a check-in ticket (boletim) for the intake.
    pub async fn create_checkin(&self, request: &CheckinRequest) -> AppResult<CheckinTicket> {
        let ticket: CheckinTicket = self.post_json(CHECKIN_PATH, request).await?;
        debug!(senha = %ticket.senha, "🎫 Check-in ticket issued");
        Ok(ticket)
    }

    /// Current queue panel snapshot.
    pub async fn fetch_queue(&self) -> AppResult<Vec<QueueEntry>> {
        self.get_json(QUEUE_PANEL_PATH, &[]).await
    }
}

#[inline]
fn is_auth_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_rejection_statuses() {
        assert!(is_auth_rejection(StatusCode::UNAUTHORIZED));
        assert!(is_auth_rejection(StatusCode::FORBIDDEN));
        assert!(!is_auth_rejection(StatusCode::OK));
        assert!(!is_auth_rejection(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_auth_rejection(StatusCode::NOT_FOUND));
    }
}
