//! Action-to-permission resolution
//!
//! Each viewset carries a default permission policy and an optional mapping
//! from action name to policy. The mapping is consulted fresh on every
//! request:
//!
//! - an empty mapping always yields the default
//! - an action missing from a non-empty mapping yields the default
//! - an explicit empty entry means no permission is required
//!
//! All permissions of a policy must pass.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use uuid::Uuid;

use crate::core::error::PermissionError;

/// Identity of the caller, resolved by the authentication layer
///
/// The transport adapter reads it from the request extensions, so an auth
/// middleware only has to insert one. Requests without it are anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthContext {
    /// No credentials
    #[default]
    Anonymous,

    /// Authenticated user
    User {
        user_id: Uuid,
        is_staff: bool,
        roles: Vec<String>,
    },
}

impl AuthContext {
    /// Regular authenticated user
    pub fn user(user_id: Uuid) -> Self {
        AuthContext::User {
            user_id,
            is_staff: false,
            roles: Vec::new(),
        }
    }

    /// Staff (admin) user
    pub fn staff(user_id: Uuid) -> Self {
        AuthContext::User {
            user_id,
            is_staff: true,
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        if let AuthContext::User { roles, .. } = &mut self {
            roles.push(role.into());
        }
        self
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthContext::User { .. })
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, AuthContext::User { is_staff: true, .. })
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::User { user_id, .. } => Some(*user_id),
            AuthContext::Anonymous => None,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        match self {
            AuthContext::User { roles, .. } => roles.iter().any(|r| r == role),
            AuthContext::Anonymous => false,
        }
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// A single permission check
#[derive(Clone)]
pub enum Permission {
    /// Always passes
    AllowAny,

    /// Any authenticated user
    IsAuthenticated,

    /// Staff users only
    IsAdminUser,

    /// Users holding the role
    HasRole(String),

    /// Authenticated at view level; on a loaded object, staff or the user the
    /// object's id designates
    IsSelfOrAdmin,

    /// Custom check, named for logs and comparisons
    Custom {
        name: &'static str,
        check: fn(&AuthContext) -> bool,
    },
}

impl Permission {
    /// View-level check, before any object is loaded
    pub fn has_permission(&self, auth: &AuthContext) -> bool {
        match self {
            Permission::AllowAny => true,
            Permission::IsAuthenticated => auth.is_authenticated(),
            Permission::IsAdminUser => auth.is_staff(),
            Permission::HasRole(role) => auth.has_role(role),
            Permission::IsSelfOrAdmin => auth.is_authenticated(),
            Permission::Custom { check, .. } => check(auth),
        }
    }

    /// Object-level check, once the target entity is loaded
    pub fn has_object_permission(&self, auth: &AuthContext, object_id: Uuid) -> bool {
        match self {
            Permission::IsSelfOrAdmin => auth.is_staff() || auth.user_id() == Some(object_id),
            _ => true,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Permission::AllowAny => "AllowAny",
            Permission::IsAuthenticated => "IsAuthenticated",
            Permission::IsAdminUser => "IsAdminUser",
            Permission::HasRole(role) => role,
            Permission::IsSelfOrAdmin => "IsSelfOrAdmin",
            Permission::Custom { name, .. } => name,
        }
    }
}

impl fmt::Debug for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::HasRole(role) => write!(f, "HasRole({})", role),
            Permission::Custom { name, .. } => write!(f, "Custom({})", name),
            other => f.write_str(other.name()),
        }
    }
}

impl PartialEq for Permission {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Permission::HasRole(a), Permission::HasRole(b)) => a == b,
            (Permission::Custom { name: a, .. }, Permission::Custom { name: b, .. }) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

/// Per-action overrides of a viewset's default policy
pub type PermissionMap = HashMap<String, Vec<Permission>>;

/// The policy applying to `action`
pub fn resolve_permissions<'a>(
    action: &str,
    mapper: &'a PermissionMap,
    default: &'a [Permission],
) -> &'a [Permission] {
    if mapper.is_empty() {
        return default;
    }
    mapper.get(action).map(Vec::as_slice).unwrap_or(default)
}

fn refuse(auth: &AuthContext, action: &str, permission: &Permission) -> PermissionError {
    tracing::warn!(
        action,
        permission = permission.name(),
        user_id = ?auth.user_id(),
        "permission denied"
    );
    if auth.is_authenticated() {
        PermissionError::Denied {
            action: action.to_string(),
        }
    } else {
        PermissionError::NotAuthenticated
    }
}

/// Run view-level checks of every permission in the policy
pub fn check_permissions(
    permissions: &[Permission],
    auth: &AuthContext,
    action: &str,
) -> Result<(), PermissionError> {
    match permissions.iter().find(|p| !p.has_permission(auth)) {
        Some(failed) => Err(refuse(auth, action, failed)),
        None => Ok(()),
    }
}

/// Run object-level checks of every permission in the policy
pub fn check_object_permissions(
    permissions: &[Permission],
    auth: &AuthContext,
    action: &str,
    object_id: Uuid,
) -> Result<(), PermissionError> {
    match permissions
        .iter()
        .find(|p| !p.has_object_permission(auth, object_id))
    {
        Some(failed) => Err(refuse(auth, action, failed)),
        None => Ok(()),
    }
}
