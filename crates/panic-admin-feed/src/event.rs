//! Alert events and the bounded log they are kept in.

use std::collections::VecDeque;

use panic_admin_core::display_column;
use serde_json::{Map, Value};

use crate::error::FeedError;

pub const DEFAULT_LOG_CAPACITY: usize = 50;

/// One pushed alert. Field names follow the alert server shape; unknown
/// fields are kept as received.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    payload: Map<String, Value>,
}

impl AlertEvent {
    /// Parses a text frame. Anything other than a JSON object is malformed.
    pub fn parse(raw: &str) -> Result<Self, FeedError> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(payload)) => Ok(Self { payload }),
            Ok(other) => Err(FeedError::Malformed {
                message: format!("expected a JSON object, got {}", json_kind(&other)),
                raw: raw.to_string(),
            }),
            Err(error) => Err(FeedError::Malformed {
                message: error.to_string(),
                raw: raw.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.payload.get("id")
    }

    #[must_use]
    pub fn alert_type(&self) -> Option<&str> {
        self.payload
            .get("alert_type")
            .or_else(|| self.payload.get("type"))
            .and_then(Value::as_str)
    }

    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.payload.get("status").and_then(Value::as_str)
    }

    /// Single-line rendering for terminal output.
    #[must_use]
    pub fn summary(&self) -> String {
        let record = Value::Object(self.payload.clone());
        let mut line = format!(
            "[{}] {}",
            self.status().unwrap_or("-"),
            self.alert_type().unwrap_or("alert")
        );
        let sender = display_column(&record, "sender_email");
        if !sender.is_empty() {
            line.push_str(&format!(" from {sender}"));
        }
        let location = display_column(&record, "location");
        if !location.is_empty() {
            line.push_str(&format!(" at {location}"));
        }
        line
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Newest-first log that discards the oldest entries past `capacity`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog {
    capacity: usize,
    entries: VecDeque<AlertEvent>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl EventLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn prepend(&mut self, event: AlertEvent) {
        self.entries.push_front(event);
        self.entries.truncate(self.capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlertEvent> {
        self.entries.iter()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<AlertEvent> {
        self.entries.iter().cloned().collect()
    }
}
