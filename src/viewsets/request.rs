//! Transport-neutral request and response of a viewset

use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::entity::Entity;
use crate::core::error::NotFoundError;
use crate::core::permission::AuthContext;
use crate::core::projection::FieldSelection;
use crate::viewsets::capability::Verb;

/// Query parameters that may be repeated to list several field names
const LIST_HINTS: [&str; 2] = ["fields", "exclude"];

/// What the transport hands to [`ViewSet::dispatch`](crate::viewsets::ViewSet::dispatch)
#[derive(Debug, Clone)]
pub struct ViewRequest {
    pub method: Method,
    /// Raw id segment, parsed lazily so a malformed id becomes a 404
    pub id: Option<String>,
    /// Extra segment naming a custom action
    pub action_path: Option<String>,
    pub auth: AuthContext,
    pub query: HashMap<String, String>,
    pub body: Value,
}

impl ViewRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            id: None,
            action_path: None,
            auth: AuthContext::Anonymous,
            query: HashMap::new(),
            body: Value::Object(Map::new()),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post(body: Value) -> Self {
        Self::new(Method::POST).with_body(body)
    }

    pub fn put(id: impl ToString, body: Value) -> Self {
        Self::new(Method::PUT).with_id(id).with_body(body)
    }

    pub fn patch(id: impl ToString, body: Value) -> Self {
        Self::new(Method::PATCH).with_id(id).with_body(body)
    }

    pub fn delete(id: impl ToString) -> Self {
        Self::new(Method::DELETE).with_id(id)
    }

    pub fn with_id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_action(mut self, path: impl Into<String>) -> Self {
        self.action_path = Some(path.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthContext) -> Self {
        self.auth = auth;
        self
    }

    /// Add a query parameter
    ///
    /// Repeated `fields` / `exclude` parameters accumulate as a
    /// comma-separated list; any other key keeps its last value.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let (key, value) = (key.into(), value.into());
        match self.query.get_mut(&key) {
            Some(existing) if LIST_HINTS.contains(&key.as_str()) => {
                existing.push(',');
                existing.push_str(&value);
            }
            _ => {
                self.query.insert(key, value);
            }
        }
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Dispatch key of this request
    pub fn verb(&self) -> Verb {
        Verb {
            method: self.method.clone(),
            detail: self.id.is_some(),
            path: self.action_path.clone(),
        }
    }

    /// `fields` / `exclude` hints of the query string
    pub fn selection(&self) -> FieldSelection {
        FieldSelection::from_hints(
            self.query.get("fields").map(String::as_str),
            self.query.get("exclude").map(String::as_str),
        )
    }

    /// Parse the id segment; missing or malformed ids are not found
    pub fn target_id<T: Entity>(&self) -> Result<Uuid, NotFoundError> {
        let raw = self.id.as_deref().unwrap_or_default();
        Uuid::parse_str(raw).map_err(|_| NotFoundError::new(T::entity_type(), raw))
    }
}

/// Status and optional JSON body produced by a viewset
#[derive(Debug, Clone, PartialEq)]
pub struct ViewResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl ViewResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    pub fn created(body: Value) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }

    /// Body as an object, empty when absent
    pub fn object(&self) -> Map<String, Value> {
        self.body
            .as_ref()
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}

/// Ordered representation into a JSON object
pub fn into_object(representation: IndexMap<String, Value>) -> Value {
    Value::Object(representation.into_iter().collect())
}

impl IntoResponse for ViewResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}
