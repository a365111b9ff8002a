//! Identity backend: the hosted auth service behind login and sessions.
//!
//! DESIGN
//! ======
//! [`IdentityBackend`] is the capability surface the session store needs
//! (current session, password sign-in, sign-up, sign-out). [`GoTrueClient`]
//! implements it against a Supabase-style `/auth/v1` REST API and keeps the
//! current session in a [`SessionStorage`], refreshing it shortly before the
//! access token expires.

#[cfg(test)]
#[path = "identity_test.rs"]
mod identity_test;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;

use super::storage::{SessionStorage, StorageError};
use super::types::{AuthResponse, Session, User};
use crate::config::{HttpTimeouts, IdentityConfig};

/// Refresh this many seconds before `expires_at`.
pub const REFRESH_MARGIN_SECS: i64 = 60;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The identity service is not configured.
    #[error("identity backend not configured")]
    NotConfigured,

    /// The HTTP request to the identity service failed.
    #[error("identity request failed: {0}")]
    Request(String),

    /// The identity service rejected the call.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The identity service response could not be parsed.
    #[error("identity response parse failed: {0}")]
    Parse(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// =============================================================================
// BACKEND TRAIT
// =============================================================================

/// Capability contract of the hosted identity service. Enables mocking in tests.
#[async_trait::async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Current session, refreshed if needed. `None` when signed out.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] if the stored session cannot be read or refreshed.
    async fn get_session(&self) -> Result<Option<Session>, IdentityError>;

    /// # Errors
    ///
    /// Returns an [`IdentityError`] if the credentials are rejected or the call fails.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthResponse, IdentityError>;

    /// The response may carry a user without a session while email
    /// confirmation is pending.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] if the sign-up is rejected or the call fails.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, IdentityError>;

    /// # Errors
    ///
    /// Returns an [`IdentityError`] if the sign-out call fails.
    async fn sign_out(&self) -> Result<(), IdentityError>;
}

// =============================================================================
// GOTRUE CLIENT
// =============================================================================

pub struct GoTrueClient {
    http: reqwest::Client,
    config: Option<IdentityConfig>,
    storage: Arc<dyn SessionStorage>,
}

impl GoTrueClient {
    /// Build a client. With `config == None` every remote call fails with
    /// [`IdentityError::NotConfigured`], while stored sessions still load.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        config: Option<IdentityConfig>,
        timeouts: HttpTimeouts,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| IdentityError::Request(e.to_string()))?;
        Ok(Self { http, config, storage })
    }

    fn config(&self) -> Result<&IdentityConfig, IdentityError> {
        self.config.as_ref().ok_or(IdentityError::NotConfigured)
    }

    async fn post(&self, path: &str, body: Value, bearer: Option<&str>) -> Result<Option<Value>, IdentityError> {
        let config = self.config()?;
        let url = format!("{}/auth/v1{path}", config.url);
        let mut request = self.http.post(&url).header("apikey", &config.anon_key).json(&body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| IdentityError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| IdentityError::Request(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(IdentityError::Rejected { status, message: error_message(status, &text) });
        }
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text).map(Some).map_err(|e| IdentityError::Parse(e.to_string()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        let body = self
            .post("/token?grant_type=refresh_token", serde_json::json!({ "refresh_token": refresh_token }), None)
            .await?
            .ok_or_else(|| IdentityError::Parse("empty refresh response".into()))?;
        serde_json::from_value(body).map_err(|e| IdentityError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl IdentityBackend for GoTrueClient {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        let Some(session) = self.storage.load()? else {
            return Ok(None);
        };
        if !session.expires_within(unix_now(), REFRESH_MARGIN_SECS) {
            return Ok(Some(session));
        }

        tracing::debug!("access token near expiry; refreshing session");
        match self.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                self.storage.save(&fresh)?;
                Ok(Some(fresh))
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed; clearing stored session");
                self.storage.clear()?;
                Err(e)
            }
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthResponse, IdentityError> {
        let body = self
            .post("/token?grant_type=password", serde_json::json!({ "email": email, "password": password }), None)
            .await?
            .ok_or_else(|| IdentityError::Parse("empty sign-in response".into()))?;
        let response = parse_auth_response(body)?;
        if let Some(session) = &response.session {
            self.storage.save(session)?;
        }
        Ok(response)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, IdentityError> {
        let body = self
            .post("/signup", serde_json::json!({ "email": email, "password": password }), None)
            .await?
            .ok_or_else(|| IdentityError::Parse("empty sign-up response".into()))?;
        let response = parse_auth_response(body)?;
        if let Some(session) = &response.session {
            self.storage.save(session)?;
        }
        Ok(response)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let stored = match self.storage.load() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "stored session unreadable; skipping remote revoke");
                None
            }
        };
        // Local sign-out happens even if the remote revoke fails.
        self.storage.clear()?;
        if let Some(session) = stored {
            self.post("/logout", Value::Object(serde_json::Map::new()), Some(&session.access_token))
                .await?;
        }
        Ok(())
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

/// A body with `access_token` is a session; otherwise it is a bare user.
fn parse_auth_response(body: Value) -> Result<AuthResponse, IdentityError> {
    if body.get("access_token").is_some() {
        let mut session: Session = serde_json::from_value(body).map_err(|e| IdentityError::Parse(e.to_string()))?;
        if session.expires_at.is_none() {
            session.expires_at = session.expires_in.map(|secs| unix_now() + secs);
        }
        let user = session.user.clone();
        return Ok(AuthResponse { session: Some(session), user });
    }
    if body.get("id").is_some() {
        let user: User = serde_json::from_value(body).map_err(|e| IdentityError::Parse(e.to_string()))?;
        return Ok(AuthResponse { session: None, user: Some(user) });
    }
    Ok(AuthResponse::default())
}

fn error_message(status: u16, text: &str) -> String {
    let body: Value = serde_json::from_str(text).unwrap_or(Value::Null);
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str).filter(|m| !m.is_empty()))
        .map_or_else(|| format!("identity request failed with status {status}"), str::to_owned)
}
