//! Capability units and the verbs they claim

use axum::http::Method;
use std::fmt;

/// One orthogonal CRUD operation set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Create,
    List,
    Retrieve,
    /// Full (`PUT`) and partial (`PATCH`) update
    Update,
    Destroy,
}

impl Capability {
    /// Verbs this capability claims
    pub fn verbs(&self) -> Vec<Verb> {
        match self {
            Capability::Create => vec![Verb::collection(Method::POST)],
            Capability::List => vec![Verb::collection(Method::GET)],
            Capability::Retrieve => vec![Verb::detail(Method::GET)],
            Capability::Update => vec![Verb::detail(Method::PUT), Verb::detail(Method::PATCH)],
            Capability::Destroy => vec![Verb::detail(Method::DELETE)],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Capability::Create => "create",
            Capability::List => "list",
            Capability::Retrieve => "retrieve",
            Capability::Update => "update",
            Capability::Destroy => "destroy",
        }
    }
}

/// Method + route shape, the dispatch key of a viewset
///
/// `detail` routes carry an id segment; `path` is the extra segment of a
/// custom action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Verb {
    pub method: Method,
    pub detail: bool,
    pub path: Option<String>,
}

impl Verb {
    /// `<METHOD> /resource`
    pub fn collection(method: Method) -> Self {
        Self {
            method,
            detail: false,
            path: None,
        }
    }

    /// `<METHOD> /resource/{id}`
    pub fn detail(method: Method) -> Self {
        Self {
            method,
            detail: true,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} /{{resource}}", self.method)?;
        if self.detail {
            write!(f, "/{{id}}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "/{}", path)?;
        }
        Ok(())
    }
}

/// Named capability combinations
pub mod presets {
    use super::Capability::{self, *};

    pub const LIST: &[Capability] = &[List];
    pub const CREATE: &[Capability] = &[Create];
    pub const RETRIEVE: &[Capability] = &[Retrieve];
    pub const UPDATE: &[Capability] = &[Update];
    pub const DESTROY: &[Capability] = &[Destroy];
    pub const READ_ONLY: &[Capability] = &[List, Retrieve];
    pub const CREATE_RETRIEVE: &[Capability] = &[Create, Retrieve];
    pub const LIST_UPDATE: &[Capability] = &[List, Update];
    pub const RETRIEVE_UPDATE: &[Capability] = &[Retrieve, Update];
    pub const LIST_RETRIEVE_UPDATE: &[Capability] = &[List, Retrieve, Update];
    pub const CREATE_LIST: &[Capability] = &[Create, List];
    pub const CREATE_UPDATE: &[Capability] = &[Create, Update];
    pub const CREATE_RETRIEVE_UPDATE: &[Capability] = &[Create, Retrieve, Update];
    pub const CREATE_LIST_RETRIEVE_UPDATE: &[Capability] = &[Create, List, Retrieve, Update];
    pub const CREATE_LIST_UPDATE: &[Capability] = &[Create, List, Update];
    pub const CREATE_LIST_UPDATE_DESTROY: &[Capability] = &[Create, List, Update, Destroy];
    pub const CREATE_LIST_DESTROY: &[Capability] = &[Create, List, Destroy];
    pub const LIST_RETRIEVE_UPDATE_DESTROY: &[Capability] = &[List, Retrieve, Update, Destroy];
    /// Every capability
    pub const MODEL: &[Capability] = &[Create, List, Retrieve, Update, Destroy];
}
