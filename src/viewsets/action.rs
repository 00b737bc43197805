//! Custom actions attached to a viewset
//!
//! A custom action claims `<METHOD> /resource[/{id}]/<url_path>` for each of
//! its methods. Its declared permissions are the default policy for its name,
//! so the viewset's permission map can still override them.

use axum::http::Method;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use crate::core::entity::Entity;
use crate::core::error::FoundationError;
use crate::core::permission::Permission;
use crate::core::projection::{FieldSelection, ProjectedView, build_view, validate_payload};
use crate::core::serializer::{Action, Serializer, SerializerContext, ValidatedData};
use crate::core::slug::Persist;
use crate::core::store::SharedStore;
use crate::viewsets::capability::Verb;
use crate::viewsets::request::{ViewRequest, ViewResponse};
use crate::viewsets::viewset::ViewSetCore;

/// Everything a custom action handler receives
pub struct ActionInvocation<T: Entity> {
    /// Loaded target for detail actions
    pub instance: Option<T>,
    /// Validated body, empty for methods without one
    pub data: ValidatedData,
    pub view: ProjectedView,
    pub store: SharedStore<T>,
    pub context: SerializerContext,
    persist: Arc<dyn Persist<T>>,
}

impl<T: Entity> ActionInvocation<T> {
    /// Target of a detail action
    pub fn target(&self) -> Result<&T, FoundationError> {
        self.instance
            .as_ref()
            .ok_or_else(|| FoundationError::Internal("action has no target instance".into()))
    }

    /// Persist through the viewset's hook
    pub async fn save(&self, entity: T) -> Result<T, FoundationError> {
        self.persist.persist(entity, self.store.as_ref()).await
    }
}

pub type ActionHandler<T> = Arc<
    dyn Fn(ActionInvocation<T>) -> BoxFuture<'static, Result<ViewResponse, FoundationError>>
        + Send
        + Sync,
>;

/// Named extra endpoint of a viewset
pub struct CustomAction<T: Entity> {
    name: String,
    url_path: String,
    methods: Vec<Method>,
    detail: bool,
    permissions: Vec<Permission>,
    serializer: Option<Arc<dyn Serializer>>,
    handler: ActionHandler<T>,
}

impl<T: Entity> CustomAction<T> {
    /// `GET` collection action at `/resource/<name>`, open to everyone until
    /// permissions are declared
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ActionInvocation<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ViewResponse, FoundationError>> + Send + 'static,
    {
        let name = name.into();
        Self {
            url_path: name.clone(),
            name,
            methods: vec![Method::GET],
            detail: false,
            permissions: vec![Permission::AllowAny],
            serializer: None,
            handler: Arc::new(
                move |invocation: ActionInvocation<T>| -> BoxFuture<'static, Result<ViewResponse, FoundationError>> {
                    Box::pin(handler(invocation))
                },
            ),
        }
    }

    pub fn url_path(mut self, path: impl Into<String>) -> Self {
        self.url_path = path.into();
        self
    }

    pub fn methods(mut self, methods: &[Method]) -> Self {
        self.methods = methods.to_vec();
        self
    }

    /// Whether the action targets one instance
    pub fn detail(mut self, detail: bool) -> Self {
        self.detail = detail;
        self
    }

    pub fn permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Serializer used instead of the viewset's model serializer
    pub fn serializer<S: Serializer + 'static>(mut self, serializer: S) -> Self {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verbs(&self) -> Vec<Verb> {
        self.methods
            .iter()
            .map(|method| Verb {
                method: method.clone(),
                detail: self.detail,
                path: Some(self.url_path.clone()),
            })
            .collect()
    }

    pub(crate) async fn invoke(
        &self,
        core: &ViewSetCore<T>,
        request: ViewRequest,
    ) -> Result<ViewResponse, FoundationError> {
        let ctx = core
            .context(Action::Custom(self.name.clone()), &request)
            .partial(request.method == Method::PATCH);
        let policy = core.policy(&self.name, &self.permissions);
        core.authorize(&ctx, policy)?;

        let (ctx, instance) = if self.detail {
            let id = request.target_id::<T>()?;
            let ctx = ctx.with_instance(id);
            let instance = core.get_object(id, &ctx, policy).await?;
            (ctx, Some(instance))
        } else {
            (ctx, None)
        };

        // viewset field defaults describe the model serializer only
        let (view, data) = match &self.serializer {
            Some(serializer) => {
                let selection = request.selection();
                prepare(serializer.as_ref(), core, &ctx, &request, &selection).await?
            }
            None => {
                let selection = core.field_defaults.merge(&request.selection());
                prepare(core.serializer.as_ref(), core, &ctx, &request, &selection).await?
            }
        };

        tracing::debug!(
            resource = T::resource_name(),
            action = %self.name,
            detail = self.detail,
            "invoking custom action"
        );

        (self.handler)(ActionInvocation {
            instance,
            data,
            view,
            store: core.store.clone(),
            context: ctx,
            persist: core.persist.clone(),
        })
        .await
    }
}

fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

async fn prepare<T, S>(
    serializer: &S,
    core: &ViewSetCore<T>,
    ctx: &SerializerContext,
    request: &ViewRequest,
    selection: &FieldSelection,
) -> Result<(ProjectedView, ValidatedData), FoundationError>
where
    T: Entity,
    S: Serializer + ?Sized,
{
    let view = build_view(serializer, ctx, selection);
    let data = if carries_body(&request.method) {
        validate_payload(&view, serializer, ctx, &request.body, core.store.as_ref()).await?
    } else {
        ValidatedData::new()
    };
    Ok((view, data))
}
