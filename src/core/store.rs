//! Persistence collaborator
//!
//! The core never talks to a database directly. It goes through
//! [`EntityStore`], which gives attribute lookups, an atomic `save` that
//! enforces the entity's unique fields and stamps timestamps, and active-flag
//! filtering.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::entity::Entity;
use crate::core::error::StorageError;

/// Which rows a read sees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Only rows with `is_active = true`
    #[default]
    Active,
    /// Every stored row
    All,
}

impl Scope {
    pub fn admits<T: Entity>(&self, entity: &T) -> bool {
        match self {
            Scope::Active => entity.is_active(),
            Scope::All => true,
        }
    }
}

/// Attribute equality lookup used by uniqueness checks
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub field: String,
    pub value: Value,
    pub case_insensitive: bool,
    /// Row ignored by the lookup, usually the instance being updated
    pub exclude_id: Option<Uuid>,
    pub scope: Scope,
}

impl Lookup {
    /// Exact match over every stored row
    pub fn exact(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            value,
            case_insensitive: false,
            exclude_id: None,
            scope: Scope::All,
        }
    }

    /// Case-insensitive match over every stored row
    pub fn iexact(field: impl Into<String>, value: Value) -> Self {
        Self {
            case_insensitive: true,
            ..Self::exact(field, value)
        }
    }

    pub fn excluding(mut self, id: Option<Uuid>) -> Self {
        self.exclude_id = id;
        self
    }

    pub fn within(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn matches<T: Entity>(&self, entity: &T) -> bool {
        if self.exclude_id == Some(entity.id()) || !self.scope.admits(entity) {
            return false;
        }
        let Some(stored) = entity.field_value(&self.field) else {
            return false;
        };
        values_equal(&stored, &self.value, self.case_insensitive)
    }
}

/// Equality with optional case folding for strings
pub fn values_equal(left: &Value, right: &Value, case_insensitive: bool) -> bool {
    match (left, right) {
        (Value::String(a), Value::String(b)) if case_insensitive => {
            a.to_lowercase() == b.to_lowercase()
        }
        _ => left == right,
    }
}

/// Whether a value takes part in unique constraints
///
/// Nulls and empty strings never collide.
pub fn is_constrained(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Async persistence contract for one entity type
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Fetch by id, whatever its active flag
    async fn get(&self, id: &Uuid) -> Result<Option<T>, StorageError>;

    /// All rows visible in `scope`, in insertion order
    async fn list(&self, scope: Scope) -> Result<Vec<T>, StorageError>;

    /// Insert or update atomically.
    ///
    /// Fails with [`StorageError::UniqueViolation`] when another row holds the
    /// same value for one of [`Entity::unique_fields`], comparing the fields
    /// of [`Entity::unique_ignoring_case`] without case. Sets `created_at` on
    /// insert and `modified_at` on every call; the returned entity carries them.
    async fn save(&self, entity: T) -> Result<T, StorageError>;

    /// Physically remove a row. Returns whether it existed.
    async fn delete(&self, id: &Uuid) -> Result<bool, StorageError>;

    /// Whether any row matches `lookup`
    async fn exists(&self, lookup: &Lookup) -> Result<bool, StorageError>;
}

/// Shared handle to a store
pub type SharedStore<T> = Arc<dyn EntityStore<T>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_equal_case_folding() {
        assert!(values_equal(&json!("Ada@X.com"), &json!("ada@x.com"), true));
        assert!(!values_equal(&json!("Ada@X.com"), &json!("ada@x.com"), false));
        assert!(values_equal(&json!(3), &json!(3), true));
    }

    #[test]
    fn test_is_constrained() {
        assert!(!is_constrained(&Value::Null));
        assert!(!is_constrained(&json!("")));
        assert!(is_constrained(&json!("books")));
        assert!(is_constrained(&json!(false)));
    }
}
