//! Static entity schemas for the console's manageable record types.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown entity type '{0}' (expected user, agent, or alert)")]
    UnknownEntity(String),
}

/// Manageable record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Agent,
    Alert,
}

impl EntityKind {
    pub const ALL: [Self; 3] = [Self::User, Self::Agent, Self::Alert];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::Alert => "alert",
        }
    }

    /// Parses an untrusted identifier; singular and plural forms are accepted.
    pub fn parse(raw: &str) -> Result<Self, SchemaError> {
        match raw.trim().to_lowercase().as_str() {
            "user" | "users" => Ok(Self::User),
            "agent" | "agents" => Ok(Self::Agent),
            "alert" | "alerts" => Ok(Self::Alert),
            _ => Err(SchemaError::UnknownEntity(raw.trim().to_string())),
        }
    }

    #[must_use]
    pub fn schema(self) -> &'static EntitySchema {
        match self {
            Self::User => &USER_SCHEMA,
            Self::Agent => &AGENT_SCHEMA,
            Self::Alert => &ALERT_SCHEMA,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input widget kind for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Select,
    Textarea,
    Url,
    Number,
}

/// Conversion rule between the UI string and the wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCodec {
    /// UI string passes through unchanged.
    Scalar,
    /// `"lat, lng"` in the UI, `{ "lat": f64, "lng": f64 }` on the wire.
    LatLng,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub server_key: Option<&'static str>,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub options: &'static [&'static str],
    pub codec: FieldCodec,
}

impl FieldSpec {
    const TEXT: Self = Self {
        key: "",
        server_key: None,
        label: "",
        kind: FieldKind::Text,
        required: false,
        options: &[],
        codec: FieldCodec::Scalar,
    };

    /// Wire key, defaulting to the UI key.
    #[must_use]
    pub fn wire_key(&self) -> &'static str {
        self.server_key.unwrap_or(self.key)
    }

    /// Value a freshly created draft starts with.
    #[must_use]
    pub fn initial_value(&self) -> &'static str {
        match self.kind {
            FieldKind::Select => self.options.first().copied().unwrap_or(""),
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl Permissions {
    pub const ALL: Self = Self {
        can_create: true,
        can_edit: true,
        can_delete: true,
    };
}

#[derive(Debug, PartialEq, Eq)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub title: &'static str,
    pub singular: &'static str,
    pub collection_endpoint: &'static str,
    pub id_key: &'static str,
    pub fields: &'static [FieldSpec],
    pub list_columns: &'static [&'static str],
    pub permissions: Permissions,
}

impl EntitySchema {
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|field| field.required)
    }
}

static USER_FIELDS: [FieldSpec; 6] = [
    FieldSpec {
        key: "name",
        label: "Full Name",
        required: true,
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "email",
        label: "Email",
        kind: FieldKind::Email,
        required: true,
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "phone",
        label: "Phone",
        kind: FieldKind::Tel,
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "role",
        label: "Role",
        kind: FieldKind::Select,
        required: true,
        options: &["admin", "user", "moderator"],
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "department",
        label: "Department",
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "status",
        label: "Status",
        kind: FieldKind::Select,
        required: true,
        options: &["active", "inactive", "suspended"],
        ..FieldSpec::TEXT
    },
];

static AGENT_FIELDS: [FieldSpec; 7] = [
    FieldSpec {
        key: "name",
        label: "Full Name",
        required: true,
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "email",
        label: "Email",
        kind: FieldKind::Email,
        required: true,
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "phone",
        label: "Phone",
        kind: FieldKind::Tel,
        required: true,
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "specialization",
        label: "Specialization",
        kind: FieldKind::Select,
        required: true,
        options: &[
            "Fire Rescue",
            "Medical Emergency",
            "Police Support",
            "Search & Rescue",
            "Hazmat",
        ],
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "location",
        label: "Location",
        required: true,
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "availability",
        label: "Availability",
        kind: FieldKind::Select,
        required: true,
        options: &["24/7", "Day Shift", "Night Shift", "Weekends", "On Call"],
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "status",
        label: "Status",
        kind: FieldKind::Select,
        required: true,
        options: &["available", "on-call", "unavailable"],
        ..FieldSpec::TEXT
    },
];

static ALERT_FIELDS: [FieldSpec; 4] = [
    FieldSpec {
        key: "type",
        server_key: Some("alert_type"),
        label: "Alert Type",
        kind: FieldKind::Select,
        required: true,
        options: &["medical", "fire", "police", "utility"],
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "location",
        label: "Location (lat,lng)",
        required: true,
        codec: FieldCodec::LatLng,
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "status",
        label: "Status",
        kind: FieldKind::Select,
        required: true,
        options: &["pending", "assigned", "in-progress", "resolved"],
        ..FieldSpec::TEXT
    },
    FieldSpec {
        key: "sender_email",
        label: "Sender Email",
        kind: FieldKind::Email,
        required: true,
        ..FieldSpec::TEXT
    },
];

static USER_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::User,
    title: "Users",
    singular: "user",
    collection_endpoint: "/users",
    id_key: "id",
    fields: &USER_FIELDS,
    list_columns: &["name", "email", "role", "status"],
    permissions: Permissions::ALL,
};

static AGENT_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Agent,
    title: "Agents",
    singular: "agent",
    collection_endpoint: "/agents",
    id_key: "id",
    fields: &AGENT_FIELDS,
    list_columns: &["name", "email", "specialization", "status"],
    permissions: Permissions::ALL,
};

static ALERT_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Alert,
    title: "Alerts",
    singular: "alert",
    collection_endpoint: "/alerts",
    id_key: "id",
    fields: &ALERT_FIELDS,
    list_columns: &["alert_type", "sender_email", "status"],
    permissions: Permissions::ALL,
};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn parse_accepts_singular_and_plural() {
        assert_eq!(EntityKind::parse("users"), Ok(EntityKind::User));
        assert_eq!(EntityKind::parse(" Agent "), Ok(EntityKind::Agent));
        assert_eq!(EntityKind::parse("alert"), Ok(EntityKind::Alert));
        assert_eq!(
            EntityKind::parse("vehicles"),
            Err(SchemaError::UnknownEntity("vehicles".to_string()))
        );
    }

    #[test]
    fn field_keys_are_unique_and_selects_have_options() {
        for kind in EntityKind::ALL {
            let schema = kind.schema();
            let mut seen = HashSet::new();
            for field in schema.fields {
                assert!(seen.insert(field.key), "{kind}: duplicate key {}", field.key);
                if field.kind == FieldKind::Select {
                    assert!(!field.options.is_empty(), "{kind}: {} has no options", field.key);
                }
            }
        }
    }

    #[test]
    fn user_schema_matches_console_field_set() {
        let schema = EntityKind::User.schema();
        let required = schema
            .required_fields()
            .map(|field| field.key)
            .collect::<Vec<_>>();
        assert_eq!(required, vec!["name", "email", "role", "status"]);
        assert_eq!(
            schema.field("role").map(|field| field.options),
            Some(&["admin", "user", "moderator"][..])
        );
        assert_eq!(schema.collection_endpoint, "/users");
    }

    #[test]
    fn agent_fields_are_required_and_keep_their_keys() {
        let schema = EntityKind::Agent.schema();
        assert_eq!(schema.fields.len(), 7);
        assert!(schema.fields.iter().all(|field| field.required));
        assert!(schema.fields.iter().all(|field| field.server_key.is_none()));
    }

    #[test]
    fn alert_schema_renames_type_and_encodes_location() {
        let schema = EntityKind::Alert.schema();
        let alert_type = schema.field("type").expect("type field");
        assert_eq!(alert_type.wire_key(), "alert_type");
        let location = schema.field("location").expect("location field");
        assert_eq!(location.codec, FieldCodec::LatLng);
        assert_eq!(location.wire_key(), "location");
    }

    #[test]
    fn initial_value_uses_first_select_option() {
        let schema = EntityKind::Agent.schema();
        assert_eq!(
            schema.field("specialization").map(FieldSpec::initial_value),
            Some("Fire Rescue")
        );
        assert_eq!(schema.field("name").map(FieldSpec::initial_value), Some(""));
    }
}
