//! System settings model and the load/edit/save editor around it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const LOAD_FAILED_TEXT: &str = "Couldn't load settings. Using defaults.";
pub const SAVE_SUCCEEDED_TEXT: &str = "Settings saved successfully.";
pub const SAVE_FAILED_TEXT: &str = "Save failed. Check Network tab or server logs.";

/// Server shape of `GET /settings` and `PUT /settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSettings {
    pub system_name: String,
    pub timezone: String,
    pub language: String,
    pub alert_types: Vec<String>,

    pub critical_threshold: u64,
    pub high_threshold: u64,
    pub medium_threshold: u64,
    pub low_threshold: u64,

    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub push_notifications: bool,
    pub sound_alerts: bool,

    pub auto_backup: bool,
    pub backup_frequency: String,
    pub retention_days: u64,
    pub max_concurrent_users: u64,

    pub session_timeout: u64,
    pub require_mfa: bool,
    pub password_policy: String,
    pub ip_whitelist: String,

    pub webhook_url: String,
    pub api_rate_limit: u64,
    pub enable_webhooks: bool,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            system_name: "Panic Alert System".to_string(),
            timezone: "UTC".to_string(),
            language: "English".to_string(),
            alert_types: ["medical", "fire", "police", "utility"]
                .map(str::to_string)
                .to_vec(),
            critical_threshold: 30,
            high_threshold: 60,
            medium_threshold: 120,
            low_threshold: 300,
            email_notifications: true,
            sms_notifications: false,
            push_notifications: true,
            sound_alerts: true,
            auto_backup: true,
            backup_frequency: "daily".to_string(),
            retention_days: 90,
            max_concurrent_users: 1000,
            session_timeout: 30,
            require_mfa: true,
            password_policy: "strong".to_string(),
            ip_whitelist: String::new(),
            webhook_url: String::new(),
            api_rate_limit: 1000,
            enable_webhooks: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("unknown setting '{0}'")]
    UnknownKey(String),
    #[error("setting '{key}' expects {expected}, got '{value}'")]
    InvalidValue {
        key: String,
        expected: &'static str,
        value: String,
    },
    #[error("failed to load settings: {0}")]
    Load(String),
    #[error("failed to save settings: {0}")]
    Save(String),
    #[error("settings could not be encoded: {0}")]
    Encode(String),
}

impl SystemSettings {
    /// Overlays non-null server values onto the defaults. A server value
    /// whose JSON type differs from the default's is ignored.
    #[must_use]
    pub fn from_server(server: &Value) -> Self {
        let defaults = Self::default();
        let Ok(Value::Object(mut merged)) = serde_json::to_value(&defaults) else {
            return defaults;
        };
        if let Some(incoming) = server.as_object() {
            for (key, slot) in &mut merged {
                if let Some(candidate) = incoming.get(key)
                    && same_shape(slot, candidate)
                {
                    *slot = candidate.clone();
                }
            }
        }
        serde_json::from_value(Value::Object(merged)).unwrap_or(defaults)
    }

    pub fn to_server(&self) -> Result<Value, SettingsError> {
        serde_json::to_value(self).map_err(|error| SettingsError::Encode(error.to_string()))
    }

    /// Keys in server order.
    pub fn keys(&self) -> Result<Vec<String>, SettingsError> {
        Ok(self.as_map()?.keys().cloned().collect())
    }

    /// Sets one key from text, parsed by the key's existing type. Lists are
    /// comma separated.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), SettingsError> {
        let mut map = self.as_map()?;
        let slot = map
            .get_mut(key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        *slot = parse_like(key, slot, raw)?;
        *self = serde_json::from_value(Value::Object(map))
            .map_err(|error| SettingsError::Encode(error.to_string()))?;
        Ok(())
    }

    fn as_map(&self) -> Result<Map<String, Value>, SettingsError> {
        match self.to_server()? {
            Value::Object(map) => Ok(map),
            _ => Err(SettingsError::Encode("settings are not an object".to_string())),
        }
    }
}

fn same_shape(default: &Value, candidate: &Value) -> bool {
    match (default, candidate) {
        (Value::Bool(_), Value::Bool(_)) | (Value::String(_), Value::String(_)) => true,
        (Value::Number(_), Value::Number(number)) => number.is_u64(),
        (Value::Array(_), Value::Array(items)) => items.iter().all(Value::is_string),
        _ => false,
    }
}

fn parse_like(key: &str, current: &Value, raw: &str) -> Result<Value, SettingsError> {
    let invalid = |expected| SettingsError::InvalidValue {
        key: key.to_string(),
        expected,
        value: raw.to_string(),
    };
    let trimmed = raw.trim();
    match current {
        Value::Bool(_) => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid("a boolean")),
        },
        Value::Number(_) => trimmed
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| invalid("a non-negative integer")),
        Value::Array(_) => Ok(Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        )),
        _ => Ok(Value::String(raw.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
}

impl Banner {
    fn success(text: &str) -> Self {
        Self {
            kind: BannerKind::Success,
            text: text.to_string(),
        }
    }

    fn error(text: &str) -> Self {
        Self {
            kind: BannerKind::Error,
            text: text.to_string(),
        }
    }
}

#[async_trait]
pub trait SettingsTransport: Send + Sync {
    type Error: std::fmt::Display + Send;

    async fn fetch_settings(&self) -> Result<Value, Self::Error>;

    async fn store_settings(&self, body: &Value) -> Result<Value, Self::Error>;
}

/// Editable settings with a last-saved snapshot in server shape.
pub struct SettingsEditor<T> {
    transport: T,
    settings: SystemSettings,
    snapshot: Option<Value>,
    banner: Option<Banner>,
    saving: bool,
}

impl<T: SettingsTransport> SettingsEditor<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            settings: SystemSettings::default(),
            snapshot: None,
            banner: None,
            saving: false,
        }
    }

    pub fn settings(&self) -> &SystemSettings {
        &self.settings
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Fetches settings. On failure the defaults stay in place, become the
    /// snapshot, and an error banner is raised.
    pub async fn load(&mut self) -> Result<&SystemSettings, SettingsError> {
        match self.transport.fetch_settings().await {
            Ok(server) => {
                self.settings = SystemSettings::from_server(&server);
                self.snapshot = Some(self.settings.to_server()?);
                Ok(&self.settings)
            }
            Err(error) => {
                warn!(error = %error, "settings load failed; using defaults");
                self.settings = SystemSettings::default();
                self.snapshot = Some(self.settings.to_server()?);
                self.banner = Some(Banner::error(LOAD_FAILED_TEXT));
                Err(SettingsError::Load(error.to_string()))
            }
        }
    }

    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), SettingsError> {
        self.settings.set(key, raw)
    }

    /// False until a snapshot exists.
    pub fn is_dirty(&self) -> bool {
        let Some(snapshot) = &self.snapshot else {
            return false;
        };
        self.settings
            .to_server()
            .map_or(true, |current| &current != snapshot)
    }

    pub fn reset(&mut self) {
        if let Some(snapshot) = &self.snapshot {
            self.settings = SystemSettings::from_server(snapshot);
            self.banner = None;
        }
    }

    pub async fn save(&mut self) -> Result<(), SettingsError> {
        self.banner = None;
        let payload = self.settings.to_server()?;
        self.saving = true;
        let result = self.transport.store_settings(&payload).await;
        self.saving = false;
        match result {
            Ok(_) => {
                info!("settings saved");
                self.snapshot = Some(payload);
                self.banner = Some(Banner::success(SAVE_SUCCEEDED_TEXT));
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "settings save failed");
                self.banner = Some(Banner::error(SAVE_FAILED_TEXT));
                Err(SettingsError::Save(error.to_string()))
            }
        }
    }
}
