//! JSON request wrapper for the comics API.
//!
//! Every request carries `Content-Type: application/json`. Requests flagged
//! `requires_auth` get a bearer token from the injected [`TokenSource`] when
//! one is available.
//!
//! ERROR HANDLING
//! ==============
//! Non-success statuses become [`ApiError::Http`] carrying the status, the
//! parsed JSON error body (or `{"message": <status text>}` when the body is
//! not JSON) and a readable message. Transport failures are logged and
//! returned unchanged as [`ApiError::Network`]. Nothing is retried.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
pub use reqwest::Method;
use serde_json::Value;

use crate::config::HttpTimeouts;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error(transparent)]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Http { status: u16, body: Value, message: String },

    /// A success response body was not valid JSON.
    #[error("response parse failed: {0}")]
    Decode(String),

    /// A caller-supplied header could not be encoded.
    #[error("invalid header {0}")]
    InvalidHeader(String),
}

impl ApiError {
    /// HTTP status for server-side failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed error body for server-side failures.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}

// =============================================================================
// TOKEN SOURCE
// =============================================================================

/// Supplies the current access token for authenticated requests.
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

// =============================================================================
// REQUEST OPTIONS
// =============================================================================

#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub requires_auth: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { method: Method::GET, body: None, headers: Vec::new(), requires_auth: false }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self { method, ..Self::default() }
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.requires_auth = true;
        self
    }
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Option<Arc<dyn TokenSource>>,
}

impl HttpClient {
    /// Build a client rooted at `base_url` (no trailing slash expected).
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()?;
        Ok(Self { http, base_url: base_url.into(), tokens: None })
    }

    /// Attach the source consulted for bearer tokens.
    #[must_use]
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request against `{base_url}{endpoint}`.
    ///
    /// Returns `Ok(None)` for `204 No Content`, otherwise the parsed JSON body.
    ///
    /// # Errors
    ///
    /// See the module docs for the error taxonomy.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Option<Value>, ApiError> {
        let url = format!("{}{endpoint}", self.base_url);
        let headers = self.build_headers(&options)?;

        tracing::debug!(method = %options.method, %url, "api request");

        let mut builder = self.http.request(options.method.clone(), &url).headers(headers);
        if let Some(body) = &options.body {
            builder = builder.body(body.to_string());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(endpoint, error = %e, "api request failed");
                return Err(ApiError::Network(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = http_error(status.as_u16(), status.canonical_reason(), &text);
            tracing::warn!(endpoint, status = status.as_u16(), error = %err, "api error response");
            return Err(err);
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(endpoint, error = %e, "api response read failed");
                return Err(ApiError::Network(e));
            }
        };
        parse_success_body(&text).map(Some)
    }

    fn build_headers(&self, options: &RequestOptions) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| ApiError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value).map_err(|_| ApiError::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }

        if options.requires_auth {
            if let Some(token) = self.tokens.as_ref().and_then(|t| t.access_token()) {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| ApiError::InvalidHeader(AUTHORIZATION.to_string()))?;
                headers.insert(AUTHORIZATION, value);
            }
        }

        Ok(headers)
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Build the structured failure for a non-success response.
fn http_error(status: u16, reason: Option<&str>, text: &str) -> ApiError {
    let body = serde_json::from_str::<Value>(text)
        .unwrap_or_else(|_| serde_json::json!({ "message": reason.unwrap_or_default() }));
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map_or_else(|| format!("HTTP error! status: {status}"), str::to_owned);
    ApiError::Http { status, body, message }
}

/// Empty success bodies are treated as JSON `null`.
fn parse_success_body(text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}
