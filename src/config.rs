//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;

use crate::oauth::OAuthConfig;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_GOOGLE_REDIRECT_URI: &str = "http://localhost:4200";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid BLOG_API_BASE_URL: {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend API root without a trailing slash.
    pub api_base_url: String,
    /// Google sign-in settings; `None` disables the OAuth bridge.
    pub google: Option<OAuthConfig>,
    pub timeouts: HttpTimeouts,
    /// Directory for file-backed durable storage, when overridden.
    pub storage_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `BLOG_API_BASE_URL`: default `http://localhost:8080/api`
    /// - `BLOG_GOOGLE_CLIENT_ID`: enables Google sign-in when set
    /// - `BLOG_GOOGLE_REDIRECT_URI`: default `http://localhost:4200`
    /// - `BLOG_GOOGLE_SCOPES`: space-separated, default `email profile openid`
    /// - `BLOG_REQUEST_TIMEOUT_SECS`: default 30
    /// - `BLOG_CONNECT_TIMEOUT_SECS`: default 10
    /// - `BLOG_STORAGE_DIR`: token directory for native front ends
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the base URL is blank or
    /// not an absolute http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url =
            parse_base_url(&std::env::var("BLOG_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned()))?;

        let google = env_non_empty("BLOG_GOOGLE_CLIENT_ID").map(|client_id| {
            let redirect_uri =
                env_non_empty("BLOG_GOOGLE_REDIRECT_URI").unwrap_or_else(|| DEFAULT_GOOGLE_REDIRECT_URI.to_owned());
            let config = OAuthConfig::new(client_id, redirect_uri);
            match env_non_empty("BLOG_GOOGLE_SCOPES") {
                Some(raw) => config.with_scopes(raw.split_whitespace()),
                None => config,
            }
        });

        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("BLOG_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("BLOG_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let storage_dir = env_non_empty("BLOG_STORAGE_DIR").map(PathBuf::from);

        Ok(Self { api_base_url, google, timeouts, storage_dir })
    }
}

fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl(format!("{trimmed:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl(format!("{trimmed:?}: expected http or https")));
    }
    Ok(trimmed.to_owned())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
