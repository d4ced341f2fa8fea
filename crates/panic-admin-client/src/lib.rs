use std::time::Duration;

use futures_util::future::join3;
use panic_admin_core::RecordId;
use panic_admin_core::crud::normalize_collection;
use panic_admin_core::reports::{
    AgentActivity, AgentActivityEntry, AlertsSummary, DEFAULT_AGENT_ACTIVITY_LIMIT, DateWindow,
    Overview,
};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

mod transport;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_READ_ATTEMPTS: usize = 1;
pub const DASHBOARD_RECENT_ALERTS: usize = 5;

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Attempts for GET requests. Writes are sent once.
    pub read_attempts: usize,
    pub bearer_token: Option<String>,
}

impl ApiClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            read_attempts: DEFAULT_READ_ATTEMPTS,
            bearer_token: None,
        }
    }
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Clone)]
pub struct AdminApiClient {
    base_url: String,
    timeout: Duration,
    read_attempts: usize,
    bearer_token: Option<String>,
    http: reqwest::Client,
}

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("api_base_url_missing")]
    BaseUrlMissing,
    #[error("api_base_url_invalid:{0}")]
    InvalidBaseUrl(String),
    #[error("api_invalid_path")]
    InvalidPath,
    #[error("api_request_failed:{message}")]
    Request { message: String },
    #[error("api_read_failed:{message}")]
    Read { message: String },
    #[error("api_http_{status}:{body}")]
    Http { status: StatusCode, body: String },
    #[error("api_json_decode_failed:{message}")]
    Decode { message: String },
    #[error("api_login_token_missing")]
    MissingToken,
}

impl ApiClientError {
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Dashboard sources, each loaded and failing on its own.
#[derive(Debug)]
pub struct Dashboard {
    pub overview: Result<Overview, ApiClientError>,
    pub recent_alerts: Result<Vec<Value>, ApiClientError>,
    pub agent_activity: Result<Vec<AgentActivityEntry>, ApiClientError>,
}

impl AdminApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiClientError> {
        let base_url = normalize_base_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|error| ApiClientError::Request {
                message: error.to_string(),
            })?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            read_attempts: config.read_attempts.max(1),
            bearer_token: config.bearer_token.and_then(non_empty_string),
            http,
        })
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.and_then(non_empty_string);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    #[must_use]
    pub fn login_path() -> &'static str {
        "/login"
    }

    #[must_use]
    pub fn record_path(collection: &str, id: &RecordId) -> String {
        format!("{}/{}", collection.trim_end_matches('/'), id.path_segment())
    }

    #[must_use]
    pub fn overview_path() -> &'static str {
        "/stats/overview"
    }

    #[must_use]
    pub fn agent_activity_path(limit: u32) -> String {
        format!("/stats/agent-activity?limit={limit}")
    }

    #[must_use]
    pub fn alert_trends_path(days: u32) -> String {
        format!("/stats/alert-trends?days={days}")
    }

    #[must_use]
    pub fn alert_types_path(days: u32) -> String {
        format!("/stats/alert-types?days={days}")
    }

    #[must_use]
    pub fn alerts_summary_path(window: &DateWindow) -> String {
        let query = window
            .query()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("/reports/alerts/summary?{query}")
    }

    #[must_use]
    pub fn settings_path() -> &'static str {
        "/settings"
    }

    /// Exchanges credentials for a token (`access_token` or `token`).
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiClientError> {
        let response: Value = self
            .post_json(
                Self::login_path(),
                &LoginRequest {
                    email: email.trim(),
                    password,
                },
            )
            .await?;
        ["access_token", "token"]
            .iter()
            .find_map(|key| response.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .and_then(non_empty_string)
            .ok_or(ApiClientError::MissingToken)
    }

    pub async fn overview(&self) -> Result<Overview, ApiClientError> {
        self.get_json(Self::overview_path()).await
    }

    pub async fn agent_activity(&self, limit: u32) -> Result<AgentActivity, ApiClientError> {
        self.get_json(Self::agent_activity_path(limit).as_str()).await
    }

    pub async fn alert_trends(&self, days: u32) -> Result<Value, ApiClientError> {
        self.get_json(Self::alert_trends_path(days).as_str()).await
    }

    pub async fn alert_types(&self, days: u32) -> Result<Value, ApiClientError> {
        self.get_json(Self::alert_types_path(days).as_str()).await
    }

    pub async fn alerts_summary(&self, window: &DateWindow) -> Result<AlertsSummary, ApiClientError> {
        self.get_json(Self::alerts_summary_path(window).as_str()).await
    }

    pub async fn recent_alerts(&self, limit: usize) -> Result<Vec<Value>, ApiClientError> {
        let payload: Value = self.get_json("/alerts").await?;
        Ok(normalize_collection(payload).into_iter().take(limit).collect())
    }

    pub async fn dashboard(&self) -> Dashboard {
        let (overview, recent_alerts, activity) = join3(
            self.overview(),
            self.recent_alerts(DASHBOARD_RECENT_ALERTS),
            self.agent_activity(DEFAULT_AGENT_ACTIVITY_LIMIT),
        )
        .await;
        Dashboard {
            overview,
            recent_alerts,
            agent_activity: activity.map(|activity| activity.items),
        }
    }

    pub async fn get_json<T>(&self, path: &str) -> Result<T, ApiClientError>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let response = self.send_get(path).await?;
        decode_json_response(response).await
    }

    pub async fn post_json<Req, Res>(&self, path: &str, payload: &Req) -> Result<Res, ApiClientError>
    where
        Req: Serialize + ?Sized,
        Res: for<'de> serde::Deserialize<'de>,
    {
        let url = self.endpoint(path).ok_or(ApiClientError::InvalidPath)?;
        let response = self
            .request(Method::POST, &url)
            .json(payload)
            .send()
            .await
            .map_err(request_error)?;
        decode_json_response(response).await
    }

    pub async fn put_json<Req, Res>(&self, path: &str, payload: &Req) -> Result<Res, ApiClientError>
    where
        Req: Serialize + ?Sized,
        Res: for<'de> serde::Deserialize<'de>,
    {
        let url = self.endpoint(path).ok_or(ApiClientError::InvalidPath)?;
        let response = self
            .request(Method::PUT, &url)
            .json(payload)
            .send()
            .await
            .map_err(request_error)?;
        decode_json_response(response).await
    }

    /// Any response body is ignored; only the status is checked.
    pub async fn delete(&self, path: &str) -> Result<(), ApiClientError> {
        let url = self.endpoint(path).ok_or(ApiClientError::InvalidPath)?;
        let response = self
            .request(Method::DELETE, &url)
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = response.bytes().await.map_err(|error| ApiClientError::Read {
            message: error.to_string(),
        })?;
        Err(format_http_error(status, &bytes))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self
            .http
            .request(method, url)
            .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
            .timeout(self.timeout);
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_get(&self, path: &str) -> Result<reqwest::Response, ApiClientError> {
        let url = self.endpoint(path).ok_or(ApiClientError::InvalidPath)?;
        let mut last_error: Option<String> = None;

        for attempt in 0..self.read_attempts {
            match self.request(Method::GET, &url).send().await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    debug!(path, attempt, error = %error, "GET failed");
                    last_error = Some(error.to_string());
                    if attempt + 1 >= self.read_attempts {
                        break;
                    }
                }
            }
        }

        Err(ApiClientError::Request {
            message: last_error.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

pub fn format_http_error(status: StatusCode, body: &[u8]) -> ApiClientError {
    let body = non_empty_string(String::from_utf8_lossy(body).to_string())
        .unwrap_or_else(|| "<empty>".to_string());
    ApiClientError::Http { status, body }
}

fn request_error(error: reqwest::Error) -> ApiClientError {
    ApiClientError::Request {
        message: error.to_string(),
    }
}

fn normalize_base_url(base_url: &str) -> Result<String, ApiClientError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ApiClientError::BaseUrlMissing);
    }
    let has_host = trimmed
        .split_once("://")
        .is_some_and(|(scheme, rest)| {
            matches!(scheme, "http" | "https") && !rest.is_empty() && !rest.starts_with('/')
        });
    if !has_host {
        return Err(ApiClientError::InvalidBaseUrl(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// An empty success body decodes as JSON `null`.
async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, ApiClientError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|error| ApiClientError::Read {
            message: error.to_string(),
        })?;

    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }

    let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &bytes
    };
    serde_json::from_slice::<T>(body).map_err(|error| ApiClientError::Decode {
        message: error.to_string(),
    })
}

fn non_empty_string(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
