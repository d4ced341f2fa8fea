//! Generic list/CRUD orchestration over one entity schema.
//!
//! Writes are followed by a full reload of the collection instead of merging
//! the returned record locally. Deletes are the exception: the deleted record
//! is removed from the in-memory list by identifier.

use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::form::{FormController, FormDraft, FormError, FormMode, ValidationError, validate};
use crate::mapping::{RecordId, UiRecord, to_server};
use crate::schema::EntitySchema;

/// REST operations the orchestrator needs, keyed by collection endpoint.
#[async_trait]
pub trait CollectionTransport: Send + Sync {
    type Error: Display + Send;

    async fn fetch_collection(&self, endpoint: &str) -> Result<Value, Self::Error>;

    async fn create_record(&self, endpoint: &str, body: &Value) -> Result<Value, Self::Error>;

    async fn update_record(
        &self,
        endpoint: &str,
        id: &RecordId,
        body: &Value,
    ) -> Result<Value, Self::Error>;

    async fn delete_record(&self, endpoint: &str, id: &RecordId) -> Result<(), Self::Error>;
}

/// Accepts a bare array or an `{ "items": [...] }` envelope.
#[must_use]
pub fn normalize_collection(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut envelope) => match envelope.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Interactive confirmation for destructive actions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Liveness flag shared between a view and its in-flight requests.
#[derive(Debug, Clone)]
pub struct ViewScope(Arc<AtomicBool>);

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn teardown(&self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrudError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Form(FormError),
    #[error("{operation} is not permitted for {collection}")]
    NotPermitted {
        operation: &'static str,
        collection: &'static str,
    },
    #[error("failed to {operation} {collection}: {message}")]
    Transport {
        operation: &'static str,
        collection: &'static str,
        message: String,
    },
    #[error("saved, but reloading {collection} failed: {message}")]
    ReloadFailed {
        collection: &'static str,
        message: String,
    },
    #[error("view was closed before the response arrived")]
    ViewClosed,
    #[error("no {singular} with id {id} in the current list")]
    UnknownRecord { singular: &'static str, id: String },
}

impl From<FormError> for CrudError {
    fn from(error: FormError) -> Self {
        match error {
            FormError::Validation(validation) => Self::Validation(validation),
            other => Self::Form(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(Value),
    Updated(Value),
}

/// List state, form state, and persistence for one entity schema.
pub struct CrudOrchestrator<T> {
    schema: &'static EntitySchema,
    transport: T,
    items: Vec<Value>,
    form: FormController,
    scope: ViewScope,
}

impl<T: CollectionTransport> CrudOrchestrator<T> {
    pub fn new(schema: &'static EntitySchema, transport: T) -> Self {
        Self::with_scope(schema, transport, ViewScope::new())
    }

    pub fn with_scope(schema: &'static EntitySchema, transport: T, scope: ViewScope) -> Self {
        Self {
            schema,
            transport,
            items: Vec::new(),
            form: FormController::new(),
            scope,
        }
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn form(&self) -> &FormController {
        &self.form
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub fn is_saving(&self) -> bool {
        self.form.is_saving()
    }

    /// Replaces the list with the server collection. On failure the previous
    /// list is kept.
    pub async fn load(&mut self) -> Result<&[Value], CrudError> {
        let endpoint = self.schema.collection_endpoint;
        let result = self.transport.fetch_collection(endpoint).await;
        self.ensure_live()?;
        match result {
            Ok(payload) => {
                self.items = normalize_collection(payload);
                debug!(collection = endpoint, count = self.items.len(), "collection loaded");
                Ok(&self.items)
            }
            Err(error) => {
                warn!(collection = endpoint, error = %error, "collection load failed; keeping previous list");
                Err(self.transport_error("load", &error))
            }
        }
    }

    /// Validates, maps, and creates a record, then reloads the collection.
    pub async fn create(&mut self, record: &UiRecord) -> Result<Value, CrudError> {
        self.ensure_permitted("create", self.schema.permissions.can_create)?;
        validate(self.schema, record)?;
        let body = to_server(record, self.schema);
        let created = self.write(FormMode::Creating, None, &body).await?;
        self.reload_after_write().await?;
        Ok(created)
    }

    /// Validates, maps, and updates `id`, then reloads the collection.
    pub async fn update(&mut self, id: &RecordId, record: &UiRecord) -> Result<Value, CrudError> {
        self.ensure_permitted("update", self.schema.permissions.can_edit)?;
        validate(self.schema, record)?;
        let body = to_server(record, self.schema);
        let updated = self.write(FormMode::Editing, Some(id), &body).await?;
        self.reload_after_write().await?;
        Ok(updated)
    }

    /// Deletes `id` after confirmation and drops it from the list.
    pub async fn delete(
        &mut self,
        id: &RecordId,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, CrudError> {
        self.ensure_permitted("delete", self.schema.permissions.can_delete)?;
        let prompt = format!("Delete this {}?", self.schema.singular);
        if !confirm.confirm(&prompt) {
            return Ok(DeleteOutcome::Cancelled);
        }
        let endpoint = self.schema.collection_endpoint;
        let result = self.transport.delete_record(endpoint, id).await;
        self.ensure_live()?;
        if let Err(error) = result {
            return Err(self.transport_error("delete", &error));
        }
        let target = id.path_segment();
        let id_key = self.schema.id_key;
        self.items.retain(|item| {
            RecordId::of_record(item, id_key).is_none_or(|item_id| item_id.path_segment() != target)
        });
        info!(collection = endpoint, id = %id, "record deleted");
        Ok(DeleteOutcome::Deleted)
    }

    pub fn begin_create(&mut self) -> Result<&FormDraft, CrudError> {
        self.ensure_permitted("create", self.schema.permissions.can_create)?;
        Ok(self.form.start_create(self.schema)?)
    }

    /// Opens the edit form for a record already in the loaded list.
    pub fn begin_edit(&mut self, id: &RecordId) -> Result<&FormDraft, CrudError> {
        self.ensure_permitted("update", self.schema.permissions.can_edit)?;
        let target = id.path_segment();
        let id_key = self.schema.id_key;
        let record = self
            .items
            .iter()
            .find(|item| {
                RecordId::of_record(item, id_key).is_some_and(|item_id| item_id.path_segment() == target)
            })
            .ok_or_else(|| CrudError::UnknownRecord {
                singular: self.schema.singular,
                id: target.clone(),
            })?;
        Ok(self.form.start_edit(self.schema, record)?)
    }

    pub fn set_field(&mut self, key: &str, value: impl Into<String>) -> Result<(), CrudError> {
        Ok(self.form.set_field(key, value)?)
    }

    pub fn cancel_form(&mut self) -> Result<(), CrudError> {
        Ok(self.form.cancel()?)
    }

    /// Persists the open form. A write failure leaves the form open with its
    /// data; a reload failure after a committed write closes it.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, CrudError> {
        let request = self.form.begin_submit()?;
        let result = self
            .write(request.mode, request.editing_id.as_ref(), &request.payload)
            .await;
        let saved = match result {
            Ok(saved) => saved,
            Err(error) => {
                self.form.fail_submit(error.to_string());
                return Err(error);
            }
        };
        self.form.complete_submit();
        self.reload_after_write().await?;
        Ok(match request.mode {
            FormMode::Creating => SubmitOutcome::Created(saved),
            FormMode::Editing => SubmitOutcome::Updated(saved),
        })
    }

    async fn write(
        &self,
        mode: FormMode,
        id: Option<&RecordId>,
        body: &Value,
    ) -> Result<Value, CrudError> {
        let endpoint = self.schema.collection_endpoint;
        let (operation, result) = match (mode, id) {
            (FormMode::Editing, Some(id)) => {
                ("update", self.transport.update_record(endpoint, id, body).await)
            }
            (FormMode::Editing, None) => return Err(CrudError::Form(FormError::MissingIdentifier)),
            (FormMode::Creating, _) => ("create", self.transport.create_record(endpoint, body).await),
        };
        self.ensure_live()?;
        match result {
            Ok(saved) => {
                info!(collection = endpoint, operation, "record saved");
                Ok(saved)
            }
            Err(error) => {
                warn!(collection = endpoint, operation, error = %error, "record save failed");
                Err(self.transport_error(operation, &error))
            }
        }
    }

    async fn reload_after_write(&mut self) -> Result<(), CrudError> {
        match self.load().await {
            Ok(_) => Ok(()),
            Err(CrudError::Transport { message, .. }) => Err(CrudError::ReloadFailed {
                collection: self.schema.collection_endpoint,
                message,
            }),
            Err(other) => Err(other),
        }
    }

    fn ensure_live(&self) -> Result<(), CrudError> {
        if self.scope.is_live() {
            Ok(())
        } else {
            Err(CrudError::ViewClosed)
        }
    }

    fn ensure_permitted(&self, operation: &'static str, allowed: bool) -> Result<(), CrudError> {
        if allowed {
            Ok(())
        } else {
            Err(CrudError::NotPermitted {
                operation,
                collection: self.schema.collection_endpoint,
            })
        }
    }

    fn transport_error(&self, operation: &'static str, error: &T::Error) -> CrudError {
        CrudError::Transport {
            operation,
            collection: self.schema.collection_endpoint,
            message: error.to_string(),
        }
    }
}
