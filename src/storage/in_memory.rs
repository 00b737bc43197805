//! In-memory implementation of EntityStore for testing and development

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::core::entity::Entity;
use crate::core::error::StorageError;
use crate::core::store::{EntityStore, Lookup, Scope, is_constrained, values_equal};

/// In-memory entity store
///
/// Rows keep insertion order. Unique constraints are checked and the row is
/// written under the same write lock, so concurrent saves cannot both claim
/// a value.
#[derive(Clone)]
pub struct InMemoryStore<T: Entity> {
    rows: Arc<RwLock<IndexMap<Uuid, T>>>,
}

impl<T: Entity> InMemoryStore<T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    /// Number of stored rows, active or not
    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_unique(rows: &IndexMap<Uuid, T>, entity: &T) -> Result<(), StorageError> {
        for field in T::unique_fields() {
            let ignore_case = T::unique_ignoring_case().contains(field);
            let Some(value) = entity.field_value(field) else {
                continue;
            };
            if !is_constrained(&value) {
                continue;
            }
            let taken = rows.values().any(|other| {
                other.id() != entity.id()
                    && other
                        .field_value(field)
                        .is_some_and(|stored| values_equal(&stored, &value, ignore_case))
            });
            if taken {
                return Err(StorageError::UniqueViolation {
                    entity_type: T::entity_type().to_string(),
                    field: field.to_string(),
                    value: value
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| value.to_string()),
                });
            }
        }
        Ok(())
    }
}

impl<T: Entity> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> EntityStore<T> for InMemoryStore<T> {
    async fn get(&self, id: &Uuid) -> Result<Option<T>, StorageError> {
        let rows = self
            .rows
            .read()
            .map_err(|e| StorageError::Backend(format!("Failed to acquire read lock: {}", e)))?;

        Ok(rows.get(id).cloned())
    }

    async fn list(&self, scope: Scope) -> Result<Vec<T>, StorageError> {
        let rows = self
            .rows
            .read()
            .map_err(|e| StorageError::Backend(format!("Failed to acquire read lock: {}", e)))?;

        Ok(rows
            .values()
            .filter(|row| scope.admits(*row))
            .cloned()
            .collect())
    }

    async fn save(&self, mut entity: T) -> Result<T, StorageError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|e| StorageError::Backend(format!("Failed to acquire write lock: {}", e)))?;

        Self::check_unique(&rows, &entity)?;

        let now = Utc::now();
        let created_at = rows
            .get(&entity.id())
            .map(|existing| existing.created_at())
            .unwrap_or(now);
        entity.set_timestamps(created_at, now);

        rows.insert(entity.id(), entity.clone());

        Ok(entity)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, StorageError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|e| StorageError::Backend(format!("Failed to acquire write lock: {}", e)))?;

        Ok(rows.shift_remove(id).is_some())
    }

    async fn exists(&self, lookup: &Lookup) -> Result<bool, StorageError> {
        let rows = self
            .rows
            .read()
            .map_err(|e| StorageError::Backend(format!("Failed to acquire read lock: {}", e)))?;

        Ok(rows.values().any(|row| lookup.matches(row)))
    }
}
