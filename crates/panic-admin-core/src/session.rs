//! Advisory session guard.
//!
//! Claims are decoded locally without signature verification. They decide
//! which console surfaces are offered and nothing else: the server must
//! re-authorize every request on its own.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeZone as _, Utc};
use serde_json::Value;
use tracing::{debug, info};

pub const TOKEN_STORAGE_KEY: &str = "token";
pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_LANDING_PATH: &str = "/dashboard";

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("failed to read token from {path}: {message}")]
    Read { path: String, message: String },
    #[error("failed to write token to {path}: {message}")]
    Write { path: String, message: String },
    #[error("failed to remove token at {path}: {message}")]
    Clear { path: String, message: String },
}

/// Persistent home of the single raw token string.
pub trait TokenStore {
    fn load_token(&self) -> Result<Option<String>, TokenStoreError>;
    fn persist_token(&self, token: &str) -> Result<(), TokenStoreError>;
    fn clear_token(&self) -> Result<(), TokenStoreError>;
}

/// Token kept in a single file, created on first login.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

impl TokenStore for FileTokenStore {
    fn load_token(&self) -> Result<Option<String>, TokenStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw.trim().to_string())),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(TokenStoreError::Read {
                path: self.display_path(),
                message: error.to_string(),
            }),
        }
    }

    fn persist_token(&self, token: &str) -> Result<(), TokenStoreError> {
        let write_error = |error: std::io::Error| TokenStoreError::Write {
            path: self.display_path(),
            message: error.to_string(),
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(&self.path, token).map_err(write_error)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(write_error)?;
        }

        Ok(())
    }

    fn clear_token(&self) -> Result<(), TokenStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(TokenStoreError::Clear {
                path: self.display_path(),
                message: error.to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn load_token(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.slot().clone())
    }

    fn persist_token(&self, token: &str) -> Result<(), TokenStoreError> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> Result<(), TokenStoreError> {
        *self.slot() = None;
        Ok(())
    }
}

/// Decoded view of a stored token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub subject: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    fn opaque(token: &str) -> Self {
        Self {
            token: token.to_string(),
            subject: None,
            email: None,
            is_admin: false,
            expires_at: None,
        }
    }

    fn from_claims(token: &str, claims: &Value) -> Self {
        let text = |key: &str| claims.get(key).and_then(Value::as_str).map(str::to_string);
        let admin_flag = claims.get("is_admin").is_some_and(is_truthy);
        let admin_role = claims
            .get("roles")
            .and_then(Value::as_array)
            .is_some_and(|roles| roles.iter().any(|role| role.as_str() == Some("admin")));
        Self {
            token: token.to_string(),
            subject: text("sub"),
            email: text("email"),
            is_admin: admin_flag || admin_role,
            expires_at: expiry_claim(claims).and_then(|exp| Utc.timestamp_millis_opt(exp).single()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenVerdict {
    Absent,
    Expired,
    Valid(Session),
}

/// Decodes the payload segment of a three-part token into a JSON object.
#[must_use]
pub fn decode_claims(token: &str) -> Option<Value> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    serde_json::from_slice::<Value>(&bytes)
        .ok()
        .filter(Value::is_object)
}

/// Classifies a raw stored token at `now`.
#[must_use]
pub fn evaluate_token(raw: Option<&str>, now: DateTime<Utc>) -> TokenVerdict {
    let Some(token) = raw.map(str::trim) else {
        return TokenVerdict::Absent;
    };
    if token.is_empty() || token == "null" || token == "undefined" {
        return TokenVerdict::Absent;
    }
    let Some(claims) = decode_claims(token) else {
        return TokenVerdict::Valid(Session::opaque(token));
    };
    if let Some(expires_ms) = expiry_claim(&claims)
        && now.timestamp_millis() >= expires_ms
    {
        return TokenVerdict::Expired;
    }
    TokenVerdict::Valid(Session::from_claims(token, &claims))
}

/// `exp` in seconds, returned as milliseconds. Numeric strings count.
fn expiry_claim(claims: &Value) -> Option<i64> {
    let exp = claims.get("exp")?;
    let seconds = exp.as_i64().or_else(|| {
        exp.as_f64()
            .or_else(|| exp.as_str().and_then(|text| text.trim().parse::<f64>().ok()))
            .filter(|value| value.is_finite())
            .map(|value| value.floor() as i64)
    })?;
    (seconds != 0).then(|| seconds.saturating_mul(1000))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Authenticated,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow(Session),
    RedirectToLogin { return_to: String },
    RedirectToLanding { path: String },
}

/// The one place the stored token is read, written, and purged.
pub struct SessionContext<S> {
    store: S,
}

impl<S: TokenStore> SessionContext<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn login(&self, token: &str) -> Result<(), TokenStoreError> {
        self.store.persist_token(token.trim())?;
        info!("session token stored");
        Ok(())
    }

    pub fn logout(&self) -> Result<(), TokenStoreError> {
        self.store.clear_token()?;
        info!("session token cleared");
        Ok(())
    }

    /// Raw token for request headers, if one is stored and not expired.
    pub fn bearer_token(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.current()?.map(|session| session.token))
    }

    pub fn current(&self) -> Result<Option<Session>, TokenStoreError> {
        self.current_at(Utc::now())
    }

    /// Expired tokens are purged from storage and reported as absent.
    pub fn current_at(&self, now: DateTime<Utc>) -> Result<Option<Session>, TokenStoreError> {
        let raw = self.store.load_token()?;
        match evaluate_token(raw.as_deref(), now) {
            TokenVerdict::Valid(session) => Ok(Some(session)),
            TokenVerdict::Absent => Ok(None),
            TokenVerdict::Expired => {
                debug!("stored token expired; purging");
                self.store.clear_token()?;
                Ok(None)
            }
        }
    }

    pub fn authorize(&self, gate: Gate, requested_path: &str) -> Result<GuardDecision, TokenStoreError> {
        self.authorize_at(gate, requested_path, Utc::now())
    }

    pub fn authorize_at(
        &self,
        gate: Gate,
        requested_path: &str,
        now: DateTime<Utc>,
    ) -> Result<GuardDecision, TokenStoreError> {
        let Some(session) = self.current_at(now)? else {
            return Ok(GuardDecision::RedirectToLogin {
                return_to: requested_path.to_string(),
            });
        };
        match gate {
            Gate::Admin if !session.is_admin => Ok(GuardDecision::RedirectToLanding {
                path: DEFAULT_LANDING_PATH.to_string(),
            }),
            Gate::Admin | Gate::Authenticated => Ok(GuardDecision::Allow(session)),
        }
    }
}
