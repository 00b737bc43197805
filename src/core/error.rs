//! Typed error handling for the foundation crate
//!
//! Every failure the core can produce falls into one of a few categories,
//! each of which maps onto one protocol-level response at the transport
//! boundary.
//!
//! # Error Categories
//!
//! - [`ConfigurationError`]: a programming-time invariant was violated
//! - [`ValidationError`]: caller-supplied data failed a field or cross-field rule
//! - [`PermissionError`]: the resolved permission policy denied the action
//! - [`NotFoundError`]: the target entity is absent or deactivated
//! - [`StorageError`]: the persistence collaborator refused a write
//!
//! # Example
//!
//! ```rust,ignore
//! match viewset.dispatch(request).await {
//!     Ok(response) => response,
//!     Err(FoundationError::Validation(errors)) => {
//!         for (field, messages) in errors.errors() {
//!             eprintln!("{field}: {messages:?}");
//!         }
//!         ...
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Key under which messages that do not belong to a single field are stored
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// The main error type for the foundation crate
#[derive(Debug, Error)]
pub enum FoundationError {
    /// Programming-time invariant violated
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Caller-supplied data failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Permission policy denied the action
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// Target entity missing or excluded by active-flag filtering
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Persistence collaborator errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No capability unit or custom action claims this verb
    #[error("Method \"{method}\" not allowed on {path}")]
    MethodNotAllowed { method: Method, path: String },

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Field-addressed details, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl FoundationError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            FoundationError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FoundationError::Validation(_) => StatusCode::BAD_REQUEST,
            FoundationError::Permission(e) => e.status_code(),
            FoundationError::NotFound(_) => StatusCode::NOT_FOUND,
            FoundationError::Storage(e) => e.status_code(),
            FoundationError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            FoundationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            FoundationError::Configuration(_) => "CONFIGURATION_ERROR",
            FoundationError::Validation(_) => "VALIDATION_ERROR",
            FoundationError::Permission(e) => e.error_code(),
            FoundationError::NotFound(_) => "NOT_FOUND",
            FoundationError::Storage(e) => e.error_code(),
            FoundationError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            FoundationError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            FoundationError::Validation(e) => Some(serde_json::json!({ "fields": e.errors() })),
            FoundationError::NotFound(e) => Some(serde_json::json!({
                "entity_type": e.entity_type,
                "id": e.id,
            })),
            FoundationError::Storage(StorageError::UniqueViolation { field, .. }) => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for FoundationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Programming-time invariant violations
///
/// Not recoverable at request time. Composition and settings errors surface
/// from builders, so they fail at startup rather than on the first request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A sluggable entity exposes no display text
    #[error("{entity_type} declares no display field to derive a slug from")]
    MissingDisplayField { entity_type: String },

    /// The bounded disambiguation loop ran out of candidates
    #[error("could not find a unique slug for '{base}' after {attempts} attempts")]
    SlugExhausted { base: String, attempts: usize },

    /// Two capability units or custom actions claim the same verb
    #[error("'{second}' claims {verb}, already claimed by '{first}'")]
    DuplicateVerb {
        verb: String,
        first: String,
        second: String,
    },

    /// A viewset was built without any capability
    #[error("a viewset needs at least one capability or custom action")]
    EmptyComposition,

    /// A builder is missing a required collaborator
    #[error("viewset for {entity_type} is missing its {missing}")]
    Incomplete {
        entity_type: String,
        missing: &'static str,
    },

    /// Settings failed validation
    #[error("invalid settings: {message}")]
    InvalidSettings { message: String },
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Field-addressable validation failure
///
/// Messages are grouped by field name in the order they were raised.
/// Messages that belong to no single field are stored under
/// [`NON_FIELD_ERRORS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationError {
    errors: IndexMap<String, Vec<String>>,
}

impl ValidationError {
    /// Create an empty error collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Single message addressed to a field
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut error = Self::new();
        error.add(field, message);
        error
    }

    /// Single message not addressed to any field
    pub fn message(message: impl Into<String>) -> Self {
        Self::field(NON_FIELD_ERRORS, message)
    }

    /// Append a message for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Absorb all messages of another error
    pub fn merge(&mut self, other: ValidationError) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    /// Move unaddressed messages under `field`
    ///
    /// Used when a library validator, which knows nothing about field names,
    /// runs as a field rule.
    pub fn for_field(mut self, field: &str) -> Self {
        if let Some(messages) = self.errors.shift_remove(NON_FIELD_ERRORS) {
            self.errors
                .entry(field.to_string())
                .or_default()
                .extend(messages);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &IndexMap<String, Vec<String>> {
        &self.errors
    }

    /// Messages raised for one field
    pub fn messages(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                first = false;
                if field == NON_FIELD_ERRORS {
                    write!(f, "{}", message)?;
                } else {
                    write!(f, "{}: {}", field, message)?;
                }
            }
        }
        if first {
            write!(f, "Invalid input")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

// =============================================================================
// Permission Errors
// =============================================================================

/// The resolved permission policy refused the request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// No credentials were supplied
    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    /// Credentials are valid but insufficient for the action
    #[error("You do not have permission to perform this action.")]
    Denied { action: String },
}

impl PermissionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PermissionError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            PermissionError::Denied { .. } => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PermissionError::NotAuthenticated => "NOT_AUTHENTICATED",
            PermissionError::Denied { .. } => "PERMISSION_DENIED",
        }
    }
}

// =============================================================================
// Not Found Errors
// =============================================================================

/// Target entity absent, or hidden because it was deactivated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity_type} with id '{id}' not found")]
pub struct NotFoundError {
    pub entity_type: String,
    pub id: String,
}

impl NotFoundError {
    pub fn new(entity_type: impl Into<String>, id: impl ToString) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// A unique constraint rejected the write
    #[error("{entity_type} with {field} '{value}' already exists")]
    UniqueViolation {
        entity_type: String,
        field: String,
        value: String,
    },

    /// Backend failure (lock poisoning, I/O, ...)
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::UniqueViolation { .. } => StatusCode::CONFLICT,
            StorageError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::UniqueViolation { .. } => "UNIQUE_VIOLATION",
            StorageError::Backend(_) => "STORAGE_ERROR",
        }
    }

    /// Whether this is a unique violation on `field`
    pub fn is_unique_violation_on(&self, field: &str) -> bool {
        matches!(self, StorageError::UniqueViolation { field: f, .. } if f == field)
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<serde_json::Error> for FoundationError {
    fn from(err: serde_json::Error) -> Self {
        FoundationError::Internal(format!("entity (de)serialization failed: {}", err))
    }
}

impl From<anyhow::Error> for FoundationError {
    fn from(err: anyhow::Error) -> Self {
        FoundationError::Internal(err.to_string())
    }
}
