//! Edit/create form state: drafts, validation, dirtiness, and the saving flag.

use serde_json::Value;

use crate::mapping::{RecordId, UiRecord, to_server, to_ui};
use crate::schema::EntitySchema;

/// Required fields whose trimmed value is empty, reported together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("please fill required: {}", missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("no form is open")]
    NotOpen,
    #[error("a save is already in flight")]
    SubmitInFlight,
    #[error("field '{0}' is not part of this form")]
    UnknownField(String),
    #[error("record has no identifier and cannot be edited")]
    MissingIdentifier,
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// Checks every required field of `schema` against `record`.
pub fn validate(schema: &EntitySchema, record: &UiRecord) -> Result<(), ValidationError> {
    let missing = schema
        .required_fields()
        .filter(|field| record.get(field.key).is_none_or(|value| value.trim().is_empty()))
        .map(|field| field.label.to_string())
        .collect::<Vec<_>>();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { missing })
    }
}

/// Draft pre-filled for creation: first option for selects, empty otherwise.
#[must_use]
pub fn blank_record(schema: &EntitySchema) -> UiRecord {
    schema
        .fields
        .iter()
        .map(|field| (field.key, field.initial_value()))
        .collect()
}

/// One in-progress record plus the server-shape snapshot it is compared to.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDraft {
    schema: &'static EntitySchema,
    record: UiRecord,
    editing_id: Option<RecordId>,
    last_saved: Value,
}

impl FormDraft {
    #[must_use]
    pub fn for_create(schema: &'static EntitySchema) -> Self {
        let record = blank_record(schema);
        let last_saved = to_server(&record, schema);
        Self {
            schema,
            record,
            editing_id: None,
            last_saved,
        }
    }

    pub fn for_edit(schema: &'static EntitySchema, server: &Value) -> Result<Self, FormError> {
        let record = to_ui(server, schema);
        let editing_id = record.id().cloned().ok_or(FormError::MissingIdentifier)?;
        let last_saved = to_server(&record, schema);
        Ok(Self {
            schema,
            record,
            editing_id: Some(editing_id),
            last_saved,
        })
    }

    #[must_use]
    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    #[must_use]
    pub fn record(&self) -> &UiRecord {
        &self.record
    }

    #[must_use]
    pub fn editing_id(&self) -> Option<&RecordId> {
        self.editing_id.as_ref()
    }

    #[must_use]
    pub fn mode(&self) -> FormMode {
        if self.editing_id.is_some() {
            FormMode::Editing
        } else {
            FormMode::Creating
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), FormError> {
        if self.schema.field(key).is_none() {
            return Err(FormError::UnknownField(key.to_string()));
        }
        self.record.set(key, value);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(self.schema, &self.record)
    }

    #[must_use]
    pub fn payload(&self) -> Value {
        to_server(&self.record, self.schema)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.payload() != self.last_saved
    }

    /// Discards edits, restoring the last saved shape.
    pub fn reset(&mut self) {
        let mut restored = to_ui(&self.last_saved, self.schema);
        restored.set_id(self.editing_id.clone());
        self.record = restored;
    }

    /// Moves the snapshot to the current draft.
    pub fn mark_saved(&mut self) {
        self.last_saved = self.payload();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Creating,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    Idle,
    Creating,
    Editing,
    Submitting,
}

#[derive(Debug, Clone, PartialEq)]
enum FormState {
    Idle,
    Open(FormDraft),
    Submitting(FormDraft),
}

/// Validated draft handed to the persistence layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub mode: FormMode,
    pub editing_id: Option<RecordId>,
    pub record: UiRecord,
    pub payload: Value,
}

/// idle -> creating/editing -> submitting -> idle, or back to the open
/// state when persistence fails.
#[derive(Debug, Clone, PartialEq)]
pub struct FormController {
    state: FormState,
    last_error: Option<String>,
}

impl Default for FormController {
    fn default() -> Self {
        Self::new()
    }
}

impl FormController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: FormState::Idle,
            last_error: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> FormStatus {
        match &self.state {
            FormState::Idle => FormStatus::Idle,
            FormState::Open(draft) => match draft.mode() {
                FormMode::Creating => FormStatus::Creating,
                FormMode::Editing => FormStatus::Editing,
            },
            FormState::Submitting(_) => FormStatus::Submitting,
        }
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        matches!(self.state, FormState::Submitting(_))
    }

    #[must_use]
    pub fn draft(&self) -> Option<&FormDraft> {
        match &self.state {
            FormState::Idle => None,
            FormState::Open(draft) | FormState::Submitting(draft) => Some(draft),
        }
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn start_create(&mut self, schema: &'static EntitySchema) -> Result<&FormDraft, FormError> {
        self.ensure_not_saving()?;
        self.open(FormDraft::for_create(schema))
    }

    pub fn start_edit(
        &mut self,
        schema: &'static EntitySchema,
        server: &Value,
    ) -> Result<&FormDraft, FormError> {
        self.ensure_not_saving()?;
        let draft = FormDraft::for_edit(schema, server)?;
        self.open(draft)
    }

    pub fn set_field(&mut self, key: &str, value: impl Into<String>) -> Result<(), FormError> {
        match &mut self.state {
            FormState::Idle => Err(FormError::NotOpen),
            FormState::Submitting(_) => Err(FormError::SubmitInFlight),
            FormState::Open(draft) => draft.set(key, value),
        }
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.draft().is_some_and(FormDraft::is_dirty)
    }

    pub fn reset(&mut self) -> Result<(), FormError> {
        match &mut self.state {
            FormState::Idle => Err(FormError::NotOpen),
            FormState::Submitting(_) => Err(FormError::SubmitInFlight),
            FormState::Open(draft) => {
                draft.reset();
                Ok(())
            }
        }
    }

    pub fn cancel(&mut self) -> Result<(), FormError> {
        self.ensure_not_saving()?;
        self.state = FormState::Idle;
        self.last_error = None;
        Ok(())
    }

    /// Validates and enters `submitting`. Fails without a state change when
    /// validation fails or a save is already running.
    pub fn begin_submit(&mut self) -> Result<SubmitRequest, FormError> {
        let draft = match &self.state {
            FormState::Idle => return Err(FormError::NotOpen),
            FormState::Submitting(_) => return Err(FormError::SubmitInFlight),
            FormState::Open(draft) => draft,
        };
        draft.validate()?;
        let request = SubmitRequest {
            mode: draft.mode(),
            editing_id: draft.editing_id().cloned(),
            record: draft.record().clone(),
            payload: draft.payload(),
        };
        if let FormState::Open(draft) = std::mem::replace(&mut self.state, FormState::Idle) {
            self.state = FormState::Submitting(draft);
        }
        self.last_error = None;
        Ok(request)
    }

    /// Persistence succeeded: the draft is destroyed.
    pub fn complete_submit(&mut self) {
        if self.is_saving() {
            self.state = FormState::Idle;
        }
    }

    /// Persistence failed: the draft reopens with its data intact.
    pub fn fail_submit(&mut self, message: impl Into<String>) {
        if let FormState::Submitting(draft) = std::mem::replace(&mut self.state, FormState::Idle) {
            self.state = FormState::Open(draft);
            self.last_error = Some(message.into());
        }
    }

    fn open(&mut self, draft: FormDraft) -> Result<&FormDraft, FormError> {
        self.last_error = None;
        self.state = FormState::Open(draft);
        self.draft().ok_or(FormError::NotOpen)
    }

    fn ensure_not_saving(&self) -> Result<(), FormError> {
        if self.is_saving() {
            Err(FormError::SubmitInFlight)
        } else {
            Ok(())
        }
    }
}
