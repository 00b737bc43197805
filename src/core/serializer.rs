//! Serializer contracts
//!
//! A serializer declares the fields of a representation for a given
//! [`SerializerContext`], optionally some creation-only virtual fields, and a
//! cross-field validation step. Model serializers additionally know how to
//! turn validated data into an entity.

use axum::http::Method;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Settings;
use crate::core::entity::Entity;
use crate::core::error::{FoundationError, ValidationError};
use crate::core::field::FieldDescriptor;
use crate::core::permission::AuthContext;

/// Operation being performed on a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    List,
    Retrieve,
    Update,
    PartialUpdate,
    Destroy,
    /// Named custom action
    Custom(String),
}

impl Action {
    /// Name used as key in permission maps
    pub fn name(&self) -> &str {
        match self {
            Action::Create => "create",
            Action::List => "list",
            Action::Retrieve => "retrieve",
            Action::Update => "update",
            Action::PartialUpdate => "partial_update",
            Action::Destroy => "destroy",
            Action::Custom(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "create" => Action::Create,
            "list" => Action::List,
            "retrieve" => Action::Retrieve,
            "update" => Action::Update,
            "partial_update" => Action::PartialUpdate,
            "destroy" => Action::Destroy,
            other => Action::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a serializer may look at while building fields or validating
///
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SerializerContext {
    pub action: Action,
    pub method: Method,
    /// Id of the existing instance targeted by the request, if any
    pub instance_id: Option<Uuid>,
    /// Missing required fields are tolerated
    pub partial: bool,
    pub auth: AuthContext,
    pub settings: Arc<Settings>,
}

impl SerializerContext {
    pub fn new(action: Action, method: Method, settings: Arc<Settings>) -> Self {
        Self {
            action,
            method,
            instance_id: None,
            partial: false,
            auth: AuthContext::Anonymous,
            settings,
        }
    }

    pub fn with_instance(mut self, id: Uuid) -> Self {
        self.instance_id = Some(id);
        self
    }

    pub fn with_auth(mut self, auth: AuthContext) -> Self {
        self.auth = auth;
        self
    }

    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// A `create` action arriving as `POST`
    pub fn is_creation(&self) -> bool {
        self.action == Action::Create && self.method == Method::POST
    }

    pub fn instance_exists(&self) -> bool {
        self.instance_id.is_some()
    }
}

/// Validated values in field order
///
/// Values of virtual fields are kept for cross-field validation and
/// `create`, but never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedData {
    values: IndexMap<String, Value>,
    virtual_fields: HashSet<String>,
}

impl ValidatedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value, is_virtual: bool) {
        let name = name.into();
        if is_virtual {
            self.virtual_fields.insert(name.clone());
        }
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String value of a field, `None` when absent, null or not a string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.virtual_fields.remove(name);
        self.values.shift_remove(name)
    }

    pub fn is_virtual(&self, name: &str) -> bool {
        self.virtual_fields.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values destined for the entity
    pub fn persisted(&self) -> Map<String, Value> {
        self.values
            .iter()
            .filter(|(name, _)| !self.virtual_fields.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Field declarations and cross-field validation for a representation
pub trait Serializer: Send + Sync {
    /// Declared fields, in representation order
    fn fields(&self, ctx: &SerializerContext) -> Vec<FieldDescriptor>;

    /// Virtual fields accepted only when creating (`create` + `POST`)
    fn creation_fields(&self, _ctx: &SerializerContext) -> Vec<FieldDescriptor> {
        Vec::new()
    }

    /// Cross-field validation, run once every field is valid
    fn validate(
        &self,
        data: ValidatedData,
        _ctx: &SerializerContext,
    ) -> Result<ValidatedData, ValidationError> {
        Ok(data)
    }
}

/// Serializer backed by an entity type
pub trait ModelSerializer<T: Entity>: Serializer {
    /// Build a new, unsaved entity
    fn create(&self, data: &ValidatedData, _ctx: &SerializerContext) -> Result<T, FoundationError> {
        let mut entity = T::default();
        entity.apply_fields(&data.persisted())?;
        Ok(entity)
    }

    /// Apply validated changes to an existing entity, without saving
    fn update(
        &self,
        mut instance: T,
        data: &ValidatedData,
        _ctx: &SerializerContext,
    ) -> Result<T, FoundationError> {
        instance.apply_fields(&data.persisted())?;
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_names_round_trip_through_permission_keys() {
        for action in [
            Action::Create,
            Action::List,
            Action::Retrieve,
            Action::Update,
            Action::PartialUpdate,
            Action::Destroy,
            Action::Custom("change_password".into()),
        ] {
            assert_eq!(Action::from_name(action.name()), action);
        }
    }

    #[test]
    fn test_creation_context_needs_create_and_post() {
        let settings = Arc::new(Settings::default());
        assert!(SerializerContext::new(Action::Create, Method::POST, settings.clone()).is_creation());
        assert!(!SerializerContext::new(Action::Create, Method::PUT, settings.clone()).is_creation());
        assert!(
            !SerializerContext::new(Action::Custom("register".into()), Method::POST, settings)
                .is_creation()
        );
    }

    #[test]
    fn test_persisted_skips_virtual_fields() {
        let mut data = ValidatedData::new();
        data.insert("email", json!("ada@example.com"), false);
        data.insert("password1", json!("secret"), true);

        let persisted = data.persisted();
        assert_eq!(persisted.len(), 1);
        assert!(persisted.contains_key("email"));
        assert_eq!(data.get_str("password1"), Some("secret"));

        data.remove("password1");
        assert!(!data.is_virtual("password1"));
        assert_eq!(data.len(), 1);
    }
}
