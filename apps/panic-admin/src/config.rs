use std::env;
use std::path::PathBuf;
use std::time::Duration;

use panic_admin_client::{ApiClientConfig, DEFAULT_BASE_URL, DEFAULT_READ_ATTEMPTS, DEFAULT_TIMEOUT_MS};
use panic_admin_feed::{DEFAULT_LOG_CAPACITY, DEFAULT_WS_PATH, FeedConfig, ReconnectPolicy};
use thiserror::Error;
use url::Url;

pub const DEFAULT_WS_URL: &str = "ws://localhost:8000";
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DEFAULT_TOKEN_DIR: &str = ".panic-admin";
pub const DEFAULT_TOKEN_FILE: &str = "token";

#[derive(Debug, Clone, PartialEq)]
pub struct AdminConfig {
    pub api_base_url: String,
    pub ws_url: String,
    pub ws_path: String,
    pub token_path: PathBuf,
    pub log_filter: String,
    pub http_timeout_ms: u64,
    pub http_read_attempts: usize,
    pub feed_log_capacity: usize,
    pub reconnect: ReconnectPolicy,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid PANIC_ADMIN_API_BASE_URL: {0}")]
    InvalidApiBaseUrl(String),
    #[error("invalid PANIC_ADMIN_WS_URL: {0}")]
    InvalidWsUrl(String),
    #[error("HOME is not set; set PANIC_ADMIN_TOKEN_PATH to choose where the session token lives")]
    MissingTokenPath,
    #[error("invalid {key}: {message}")]
    InvalidNumber { key: &'static str, message: String },
}

impl AdminConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_base_url = read("PANIC_ADMIN_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        require_scheme(&api_base_url, &["http", "https"])
            .map_err(ConfigError::InvalidApiBaseUrl)?;

        let ws_url = read("PANIC_ADMIN_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string());
        require_scheme(&ws_url, &["ws", "wss"]).map_err(ConfigError::InvalidWsUrl)?;

        let ws_path = read("PANIC_ADMIN_WS_PATH").unwrap_or_else(|| DEFAULT_WS_PATH.to_string());
        let token_path = match read("PANIC_ADMIN_TOKEN_PATH") {
            Some(path) => PathBuf::from(path),
            None => read("HOME")
                .map(|home| PathBuf::from(home).join(DEFAULT_TOKEN_DIR).join(DEFAULT_TOKEN_FILE))
                .ok_or(ConfigError::MissingTokenPath)?,
        };
        let log_filter =
            read("PANIC_ADMIN_LOG_FILTER").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let defaults = ReconnectPolicy::default();
        let reconnect = ReconnectPolicy {
            base_delay_ms: parse_number(&read, "PANIC_ADMIN_FEED_RECONNECT_BASE_MS", defaults.base_delay_ms)?,
            max_delay_ms: parse_number(&read, "PANIC_ADMIN_FEED_RECONNECT_MAX_MS", defaults.max_delay_ms)?,
            max_attempts: parse_number(
                &read,
                "PANIC_ADMIN_FEED_RECONNECT_MAX_ATTEMPTS",
                defaults.max_attempts,
            )?,
            jitter_ratio: defaults.jitter_ratio,
        };

        Ok(Self {
            api_base_url,
            ws_url,
            ws_path,
            token_path,
            log_filter,
            http_timeout_ms: parse_number(&read, "PANIC_ADMIN_HTTP_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            http_read_attempts: parse_number(
                &read,
                "PANIC_ADMIN_HTTP_READ_ATTEMPTS",
                DEFAULT_READ_ATTEMPTS,
            )?,
            feed_log_capacity: parse_number(
                &read,
                "PANIC_ADMIN_FEED_LOG_CAPACITY",
                DEFAULT_LOG_CAPACITY,
            )?,
            reconnect,
        })
    }

    pub fn api_client_config(&self, bearer_token: Option<String>) -> ApiClientConfig {
        ApiClientConfig {
            timeout_ms: self.http_timeout_ms,
            read_attempts: self.http_read_attempts,
            bearer_token,
            ..ApiClientConfig::new(self.api_base_url.clone())
        }
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            connect_timeout: Duration::from_millis(self.http_timeout_ms),
            log_capacity: self.feed_log_capacity,
            reconnect: self.reconnect.clone(),
            ..FeedConfig::new(&self.ws_url, &self.ws_path)
        }
    }
}

fn require_scheme(raw: &str, schemes: &[&str]) -> Result<(), String> {
    let parsed = Url::parse(raw).map_err(|error| format!("{raw}: {error}"))?;
    if !schemes.contains(&parsed.scheme()) {
        return Err(format!(
            "{raw}: expected {} scheme",
            schemes.join(" or ")
        ));
    }
    if parsed.host_str().is_none() {
        return Err(format!("{raw}: missing host"));
    }
    Ok(())
}

fn parse_number<T>(
    read: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match read(key) {
        Some(raw) => raw.parse::<T>().map_err(|error| ConfigError::InvalidNumber {
            key,
            message: format!("{raw}: {error}"),
        }),
        None => Ok(default),
    }
}
