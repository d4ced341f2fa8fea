//! Conversion between UI-shaped records and server payloads.
//!
//! Fields without a matching [`FieldSpec`] are dropped in both directions,
//! and a composite value that fails to parse is omitted from the payload
//! rather than reported.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::schema::{EntitySchema, FieldCodec, FieldSpec};

static NULL: Value = Value::Null;

/// Server-assigned identifier, kept exactly as the server sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordId(Value);

impl RecordId {
    /// Accepts non-empty strings and numbers; anything else is not an id.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(Self(value.clone())),
            Value::Number(_) => Some(Self(value.clone())),
            _ => None,
        }
    }

    /// Reads the identifier of a server record.
    #[must_use]
    pub fn of_record(record: &Value, id_key: &str) -> Option<Self> {
        record.get(id_key).and_then(Self::from_value)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Text used in resource paths such as `/users/{id}`.
    #[must_use]
    pub fn path_segment(&self) -> String {
        match &self.0 {
            Value::String(text) => text.trim().to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_segment())
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(Value::from(value))
    }
}

/// Flat, string-valued record as presented to an editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiRecord {
    id: Option<RecordId>,
    values: BTreeMap<String, String>,
}

impl UiRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    #[must_use]
    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    pub fn set_id(&mut self, id: Option<RecordId>) {
        self.id = id;
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Field values without the identifier.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl<K, V> FromIterator<(K, V)> for UiRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.set(key, value);
        }
        record
    }
}

/// Server record to UI record. Missing values become empty strings.
#[must_use]
pub fn to_ui(server: &Value, schema: &EntitySchema) -> UiRecord {
    let mut record = UiRecord::new();
    for field in schema.fields {
        let raw = server.get(field.wire_key()).unwrap_or(&NULL);
        record.set(field.key, field_from_server(field, raw));
    }
    record.set_id(RecordId::of_record(server, schema.id_key));
    record
}

/// UI record to server payload. Fields with no value are omitted, never null.
#[must_use]
pub fn to_server(ui: &UiRecord, schema: &EntitySchema) -> Value {
    let mut body = Map::new();
    for field in schema.fields {
        let Some(raw) = ui.get(field.key) else {
            continue;
        };
        if let Some(value) = field_to_server(field, raw) {
            body.insert(field.wire_key().to_string(), value);
        }
    }
    Value::Object(body)
}

/// Cell text for a list column read straight from a server record.
#[must_use]
pub fn display_column(server: &Value, column: &str) -> String {
    let raw = server.get(column).unwrap_or(&NULL);
    if column == "location"
        && let Some(text) = lat_lng_text(raw)
    {
        return text;
    }
    scalar_text(raw)
}

fn field_from_server(field: &FieldSpec, raw: &Value) -> String {
    match field.codec {
        FieldCodec::Scalar => scalar_text(raw),
        FieldCodec::LatLng => lat_lng_text(raw).unwrap_or_default(),
    }
}

fn field_to_server(field: &FieldSpec, raw: &str) -> Option<Value> {
    match field.codec {
        FieldCodec::Scalar => Some(Value::String(raw.to_string())),
        FieldCodec::LatLng => {
            let parsed = parse_lat_lng(raw);
            if parsed.is_none() && !raw.trim().is_empty() {
                debug!(field = field.key, value = raw, "dropping unparseable lat/lng value");
            }
            parsed.map(|(lat, lng)| json!({ "lat": lat, "lng": lng }))
        }
    }
}

/// Parses `"lat, lng"`. Both halves must be finite numbers.
#[must_use]
pub fn parse_lat_lng(raw: &str) -> Option<(f64, f64)> {
    let (lat, lng) = raw.split_once(',')?;
    if lng.contains(',') {
        return None;
    }
    let lat = lat.trim().parse::<f64>().ok().filter(|value| value.is_finite())?;
    let lng = lng.trim().parse::<f64>().ok().filter(|value| value.is_finite())?;
    Some((lat, lng))
}

fn lat_lng_text(raw: &Value) -> Option<String> {
    let object = raw.as_object()?;
    let lat = object.get("lat")?;
    let lng = object.get("lng")?;
    if lat.is_null() || lng.is_null() {
        return None;
    }
    Some(format!("{}, {}", scalar_text(lat), scalar_text(lng)))
}

fn scalar_text(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntityKind;

    #[test]
    fn to_ui_fills_missing_values_and_keeps_id() {
        let schema = EntityKind::User.schema();
        let record = to_ui(
            &json!({"id": 42, "name": "Ada", "email": "ada@example.com", "extra": "dropped"}),
            schema,
        );
        assert_eq!(record.id(), Some(&RecordId::from(42)));
        assert_eq!(record.get("name"), Some("Ada"));
        assert_eq!(record.get("phone"), Some(""));
        assert_eq!(record.get("extra"), None);
        assert_eq!(record.values().len(), schema.fields.len());
    }

    #[test]
    fn to_server_omits_absent_keys_instead_of_sending_null() {
        let schema = EntityKind::User.schema();
        let ui = UiRecord::new()
            .with_value("name", "Ada")
            .with_value("email", "ada@example.com")
            .with_value("nickname", "ignored");
        assert_eq!(
            to_server(&ui, schema),
            json!({"name": "Ada", "email": "ada@example.com"})
        );
    }

    #[test]
    fn alert_type_uses_server_key_in_both_directions() {
        let schema = EntityKind::Alert.schema();
        let ui = to_ui(&json!({"alert_type": "fire"}), schema);
        assert_eq!(ui.get("type"), Some("fire"));
        let body = to_server(&ui, schema);
        assert_eq!(body.get("alert_type"), Some(&json!("fire")));
        assert!(body.get("type").is_none());
    }

    #[test]
    fn location_text_becomes_lat_lng_object() {
        let schema = EntityKind::Alert.schema();
        let ui = UiRecord::new().with_value("location", "37.42, -122.08");
        assert_eq!(
            to_server(&ui, schema),
            json!({"location": {"lat": 37.42, "lng": -122.08}})
        );
    }

    #[test]
    fn unparseable_location_is_omitted() {
        let schema = EntityKind::Alert.schema();
        for raw in ["not-a-number, x", "", "37.42", "37.42, ", "1, 2, 3", "inf, 3"] {
            let ui = UiRecord::new()
                .with_value("location", raw)
                .with_value("status", "pending");
            assert_eq!(
                to_server(&ui, schema),
                json!({"status": "pending"}),
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn server_location_renders_as_text() {
        let schema = EntityKind::Alert.schema();
        let ui = to_ui(&json!({"location": {"lat": 37.42, "lng": -122.08}}), schema);
        assert_eq!(ui.get("location"), Some("37.42, -122.08"));

        let malformed = to_ui(&json!({"location": "somewhere"}), schema);
        assert_eq!(malformed.get("location"), Some(""));
    }

    #[test]
    fn round_trip_through_mapper_is_stable_for_every_schema() {
        let samples = [
            (
                EntityKind::User,
                json!({"id": "u1", "name": "Ada", "email": "ada@example.com", "phone": 5551234,
                       "role": "admin", "status": "active"}),
            ),
            (
                EntityKind::Agent,
                json!({"id": 7, "name": "Jane", "email": "jane@x.com", "phone": "555-1111",
                       "specialization": "Hazmat", "location": "Metro",
                       "availability": "24/7", "status": "available"}),
            ),
            (
                EntityKind::Alert,
                json!({"id": 3, "alert_type": "medical", "status": "pending",
                       "location": {"lat": 37.4219983, "lng": -122.084},
                       "sender_email": "caller@example.com"}),
            ),
        ];

        for (kind, server) in samples {
            let schema = kind.schema();
            let once = to_ui(&server, schema);
            let twice = to_ui(&to_server(&once, schema), schema);
            assert_eq!(once.values(), twice.values(), "{kind}");
        }
    }

    #[test]
    fn display_column_special_cases_location() {
        let record = json!({"location": {"lat": 1.5, "lng": 2}, "status": "pending", "count": 3});
        assert_eq!(display_column(&record, "location"), "1.5, 2");
        assert_eq!(display_column(&record, "status"), "pending");
        assert_eq!(display_column(&record, "count"), "3");
        assert_eq!(display_column(&record, "missing"), "");
    }

    #[test]
    fn record_id_rejects_blank_and_structured_values() {
        assert!(RecordId::from_value(&json!("")).is_none());
        assert!(RecordId::from_value(&json!(null)).is_none());
        assert!(RecordId::from_value(&json!({"id": 1})).is_none());
        assert_eq!(
            RecordId::from_value(&json!(" a1 ")).map(|id| id.path_segment()),
            Some("a1".to_string())
        );
    }
}
