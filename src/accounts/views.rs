//! User viewset

use axum::http::Method;
use std::sync::Arc;

use crate::accounts::model::User;
use crate::accounts::serializers::{PasswordChangeSerializer, UserDetailSerializer};
use crate::config::Settings;
use crate::core::error::{ConfigurationError, FoundationError, ValidationError};
use crate::core::permission::Permission;
use crate::core::store::SharedStore;
use crate::viewsets::{
    ActionInvocation, CustomAction, DestroyPolicy, ViewResponse, ViewSet, into_object, presets,
};

/// Users: create (open to anyone), list, update, deactivate, and an
/// admin-only password change
///
/// | Verb | Path |
/// |------|------|
/// | `POST` | `/users` |
/// | `GET` | `/users?search=&is_staff=&ordering=&page=&limit=` |
/// | `PUT`, `PATCH` | `/users/{id}` |
/// | `DELETE` | `/users/{id}` (sets `is_active = false`) |
/// | `PUT` | `/users/{id}/password_change` |
pub fn user_viewset(
    store: SharedStore<User>,
    settings: Arc<Settings>,
) -> Result<ViewSet<User>, ConfigurationError> {
    ViewSet::builder()
        .capabilities(presets::CREATE_LIST_UPDATE_DESTROY)
        .store(store)
        .serializer(UserDetailSerializer)
        .settings(settings)
        .permission_classes(vec![Permission::IsAuthenticated])
        .permission("create", vec![])
        .search_fields(&["full_name", "email", "phone_number"])
        .filter_fields(&["is_staff"])
        .destroy_policy(DestroyPolicy::Deactivate)
        .action(change_password())
        .build()
}

/// `PUT /users/{id}/password_change`
pub fn change_password() -> CustomAction<User> {
    CustomAction::new("change_password", |invocation: ActionInvocation<User>| async move {
        let mut user = invocation.target()?.clone();
        let password = invocation
            .data
            .get_str("password1")
            .ok_or_else(|| ValidationError::field("password1", "This field is required."))?;
        user.set_password(password)?;
        let user = invocation.save(user).await?;

        tracing::info!(user_id = %user.id, "password changed");
        Ok::<_, FoundationError>(ViewResponse::ok(into_object(
            invocation.view.represent_data(&invocation.data),
        )))
    })
    .url_path("password_change")
    .methods(&[Method::PUT])
    .detail(true)
    .permissions(vec![Permission::IsAdminUser])
    .serializer(PasswordChangeSerializer)
}
