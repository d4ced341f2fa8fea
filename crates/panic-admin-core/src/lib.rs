//! Transport-agnostic core of the panic alert console.
//!
//! Entity differences live entirely in [`schema`] data; every CRUD screen is
//! driven by the same mapper, form controller, and orchestrator.

pub mod crud;
pub mod form;
pub mod mapping;
pub mod reports;
pub mod schema;
pub mod session;
pub mod settings;

pub use crud::{
    CollectionTransport, Confirm, CrudError, CrudOrchestrator, DeleteOutcome, SubmitOutcome,
    ViewScope, normalize_collection,
};
pub use form::{FormController, FormDraft, FormError, FormMode, FormStatus, ValidationError};
pub use mapping::{RecordId, UiRecord, display_column, to_server, to_ui};
pub use schema::{
    EntityKind, EntitySchema, FieldCodec, FieldKind, FieldSpec, Permissions, SchemaError,
};
pub use session::{
    FileTokenStore, Gate, GuardDecision, MemoryTokenStore, Session, SessionContext, TokenStore,
    TokenStoreError, TokenVerdict, evaluate_token,
};
pub use settings::{Banner, BannerKind, SettingsEditor, SettingsError, SettingsTransport, SystemSettings};
