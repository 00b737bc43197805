//! Core module containing fundamental traits and types for the framework

pub mod entity;
pub mod error;
pub mod field;
pub mod helpers;
pub mod permission;
pub mod projection;
pub mod query;
pub mod serializer;
pub mod slug;
pub mod store;
pub mod validation;

pub use entity::{DisplayText, Entity, PROTECTED_FIELDS, Sluggable};
pub use error::{
    ConfigurationError, ErrorResponse, FoundationError, NON_FIELD_ERRORS, NotFoundError,
    PermissionError, StorageError, ValidationError,
};
pub use field::{Attachment, FieldDescriptor, FieldKind, UniqueRule};
pub use permission::{AuthContext, Permission, PermissionMap, resolve_permissions};
pub use projection::{FieldSelection, ProjectedView, build_view, validate_payload};
pub use query::{ListQuery, PaginatedResponse, PaginationMeta};
pub use serializer::{Action, ModelSerializer, Serializer, SerializerContext, ValidatedData};
pub use slug::{Persist, PlainSave, SlugAssigner, ensure_slug};
pub use store::{EntityStore, Lookup, Scope, SharedStore};
