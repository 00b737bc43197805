//! REST adapter: axum routes in front of a [`ViewSet`]
//!
//! Every viewset gets three catch-all routes, one per URL shape:
//!
//! - `/{resource}`
//! - `/{resource}/{id}` (also a collection-level custom action)
//! - `/{resource}/{id}/{action}`
//!
//! The method, the `AuthContext` found in the request extensions, the query
//! string and the JSON body are handed to [`ViewSet::dispatch`].

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::Method;
use axum::routing::any;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::entity::Entity;
use crate::core::error::{FoundationError, ValidationError};
use crate::core::permission::AuthContext;
use crate::viewsets::{ViewRequest, ViewResponse, ViewSet};

/// Router exposing one viewset under its resource name
pub fn viewset_router<T: Entity>(viewset: Arc<ViewSet<T>>) -> Router {
    let resource = viewset.resource_name();
    Router::new()
        .route(&format!("/{}", resource), any(collection_handler::<T>))
        .route(&format!("/{}/{{id}}", resource), any(detail_handler::<T>))
        .route(
            &format!("/{}/{{id}}/{{action}}", resource),
            any(action_handler::<T>),
        )
        .with_state(viewset)
}

/// JSON body of a request; an empty body is an empty object
pub fn parse_body(body: &[u8]) -> Result<Value, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body)
        .map_err(|e| ValidationError::message(format!("JSON parse error - {}", e)))
}

fn view_request(
    method: Method,
    auth: AuthContext,
    query: Vec<(String, String)>,
    body: &[u8],
) -> Result<ViewRequest, FoundationError> {
    let request = ViewRequest::new(method)
        .with_auth(auth)
        .with_body(parse_body(body)?);
    Ok(query
        .into_iter()
        .fold(request, |request, (key, value)| request.with_query(key, value)))
}

async fn collection_handler<T: Entity>(
    State(viewset): State<Arc<ViewSet<T>>>,
    method: Method,
    auth: AuthContext,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<ViewResponse, FoundationError> {
    let request = view_request(method, auth, query, &body)?;
    viewset.dispatch(request).await
}

async fn detail_handler<T: Entity>(
    State(viewset): State<Arc<ViewSet<T>>>,
    Path(id): Path<String>,
    method: Method,
    auth: AuthContext,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<ViewResponse, FoundationError> {
    let request = view_request(method, auth, query, &body)?.with_id(id);
    viewset.dispatch(request).await
}

async fn action_handler<T: Entity>(
    State(viewset): State<Arc<ViewSet<T>>>,
    Path((id, action)): Path<(String, String)>,
    method: Method,
    auth: AuthContext,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<ViewResponse, FoundationError> {
    let request = view_request(method, auth, query, &body)?
        .with_id(id)
        .with_action(action);
    viewset.dispatch(request).await
}
