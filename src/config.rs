//! Application configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_HTTP_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_HTTP_CONNECT_TIMEOUT_SECS }
    }
}

/// Connection parameters for the hosted identity backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `None` when either `SUPABASE_URL` or `SUPABASE_ANON_KEY` is missing.
    pub identity: Option<IdentityConfig>,
    pub api_base_url: String,
    pub timeouts: HttpTimeouts,
    pub session_file: Option<PathBuf>,
}

impl AppConfig {
    /// Build typed app config from environment variables.
    ///
    /// Identity backend (both required for auth to work):
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `API_BASE_URL`: default `http://localhost:8080/api`
    /// - `HTTP_REQUEST_TIMEOUT_SECS`: default 30
    /// - `HTTP_CONNECT_TIMEOUT_SECS`: default 10
    /// - `WEBKOMIK_SESSION_FILE`: where to persist the login session
    ///
    /// Missing identity parameters are logged, not fatal.
    #[must_use]
    pub fn from_env() -> Self {
        let identity = match (non_empty_var("SUPABASE_URL"), non_empty_var("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => {
                Some(IdentityConfig { url: url.trim_end_matches('/').to_string(), anon_key })
            }
            _ => {
                tracing::error!(
                    "SUPABASE_URL or SUPABASE_ANON_KEY not set; login and session features will fail"
                );
                None
            }
        };

        let api_base_url = normalize_base_url(non_empty_var("API_BASE_URL").as_deref());
        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("HTTP_REQUEST_TIMEOUT_SECS", DEFAULT_HTTP_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("HTTP_CONNECT_TIMEOUT_SECS", DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
        };
        let session_file = non_empty_var("WEBKOMIK_SESSION_FILE").map(PathBuf::from);

        Self { identity, api_base_url, timeouts, session_file }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

/// Strip trailing slashes so endpoint paths can be appended verbatim.
pub fn normalize_base_url(raw: Option<&str>) -> String {
    raw.unwrap_or(DEFAULT_API_BASE_URL)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
