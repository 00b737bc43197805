//! Viewset composition and dispatch

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Settings;
use crate::core::entity::{Entity, Sluggable};
use crate::core::error::{ConfigurationError, FoundationError, NotFoundError};
use crate::core::permission::{
    Permission, PermissionMap, check_object_permissions, check_permissions, resolve_permissions,
};
use crate::core::projection::{FieldSelection, ProjectedView, build_view, validate_payload};
use crate::core::serializer::{Action, ModelSerializer, SerializerContext, ValidatedData};
use crate::core::slug::{Persist, PlainSave, SlugAssigner};
use crate::core::store::SharedStore;
use crate::viewsets::action::CustomAction;
use crate::viewsets::capability::{Capability, Verb};
use crate::viewsets::request::{ViewRequest, ViewResponse};
use crate::viewsets::units::{CapabilityUnit, unit_for};

/// What `DELETE` does to the row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DestroyPolicy {
    /// Delete it from the store
    #[default]
    Remove,
    /// Keep it with `is_active = false`
    Deactivate,
}

/// Services shared by every unit and custom action of a viewset
pub struct ViewSetCore<T: Entity> {
    pub(crate) store: SharedStore<T>,
    pub(crate) serializer: Arc<dyn ModelSerializer<T>>,
    pub(crate) permission_classes: Vec<Permission>,
    pub(crate) permission_map: PermissionMap,
    pub(crate) field_defaults: FieldSelection,
    pub(crate) destroy_policy: DestroyPolicy,
    pub(crate) search_fields: Vec<String>,
    pub(crate) filter_fields: Vec<String>,
    pub(crate) persist: Arc<dyn Persist<T>>,
    pub(crate) settings: Arc<Settings>,
}

impl<T: Entity> ViewSetCore<T> {
    pub fn store(&self) -> &SharedStore<T> {
        &self.store
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn destroy_policy(&self) -> DestroyPolicy {
        self.destroy_policy
    }

    /// Serializer context of a request, without instance
    pub fn context(&self, action: Action, request: &ViewRequest) -> SerializerContext {
        SerializerContext::new(action, request.method.clone(), self.settings.clone())
            .with_auth(request.auth.clone())
    }

    /// Policy of `action`, falling back to `default`
    pub fn policy<'a>(&'a self, action: &str, default: &'a [Permission]) -> &'a [Permission] {
        resolve_permissions(action, &self.permission_map, default)
    }

    /// View-level permission checks
    pub fn authorize(&self, ctx: &SerializerContext, policy: &[Permission]) -> Result<(), FoundationError> {
        check_permissions(policy, &ctx.auth, ctx.action.name())?;
        Ok(())
    }

    /// Load an active entity, then run object-level checks
    pub async fn get_object(
        &self,
        id: Uuid,
        ctx: &SerializerContext,
        policy: &[Permission],
    ) -> Result<T, FoundationError> {
        let entity = self
            .store
            .get(&id)
            .await?
            .filter(|entity| entity.is_active())
            .ok_or_else(|| NotFoundError::new(T::entity_type(), id))?;
        check_object_permissions(policy, &ctx.auth, ctx.action.name(), entity.id())?;
        Ok(entity)
    }

    /// Projected view of the model serializer for this request
    pub fn view(&self, ctx: &SerializerContext, request: &ViewRequest) -> ProjectedView {
        let selection = self.field_defaults.merge(&request.selection());
        build_view(self.serializer.as_ref(), ctx, &selection)
    }

    /// Full validation pipeline against the model serializer
    pub async fn validate(
        &self,
        view: &ProjectedView,
        ctx: &SerializerContext,
        payload: &Value,
    ) -> Result<ValidatedData, FoundationError> {
        validate_payload(view, self.serializer.as_ref(), ctx, payload, self.store.as_ref()).await
    }

    /// Persist through the configured hook
    pub async fn save(&self, entity: T) -> Result<T, FoundationError> {
        self.persist.persist(entity, self.store.as_ref()).await
    }
}

pub(crate) enum Route<T: Entity> {
    Unit(Arc<dyn CapabilityUnit<T>>),
    Custom(Arc<CustomAction<T>>),
}

impl<T: Entity> Route<T> {
    fn owner(&self) -> String {
        match self {
            Route::Unit(unit) => unit.capability().name().to_string(),
            Route::Custom(action) => action.name().to_string(),
        }
    }
}

/// A composed handler for one entity type
///
/// Built by [`ViewSetBuilder`]; dispatch is a lookup in the verb table.
pub struct ViewSet<T: Entity> {
    core: ViewSetCore<T>,
    routes: IndexMap<Verb, Route<T>>,
}

impl<T: Entity> ViewSet<T> {
    pub fn builder() -> ViewSetBuilder<T> {
        ViewSetBuilder::new()
    }

    pub fn resource_name(&self) -> &'static str {
        T::resource_name()
    }

    pub fn entity_type(&self) -> &'static str {
        T::entity_type()
    }

    pub fn core(&self) -> &ViewSetCore<T> {
        &self.core
    }

    /// Claimed verbs, in registration order
    pub fn verbs(&self) -> impl Iterator<Item = &Verb> {
        self.routes.keys()
    }

    /// Route a request to the unit or custom action claiming its verb
    pub async fn dispatch(&self, mut request: ViewRequest) -> Result<ViewResponse, FoundationError> {
        // `/resource/{segment}` names a collection action when one claims it
        if request.action_path.is_none()
            && let Some(segment) = request.id.clone()
            && self
                .routes
                .contains_key(&Verb::collection(request.method.clone()).with_path(segment))
        {
            request.action_path = request.id.take();
        }

        let verb = request.verb();
        let Some(route) = self.routes.get(&verb) else {
            tracing::debug!(resource = T::resource_name(), verb = %verb, "no route for verb");
            return Err(FoundationError::MethodNotAllowed {
                method: request.method.clone(),
                path: verb.to_string().replace("{resource}", T::resource_name()),
            });
        };

        tracing::debug!(resource = T::resource_name(), verb = %verb, "dispatching");
        match route {
            Route::Unit(unit) => unit.handle(&self.core, request).await,
            Route::Custom(action) => action.invoke(&self.core, request).await,
        }
    }
}

/// Builder for [`ViewSet`]
pub struct ViewSetBuilder<T: Entity> {
    capabilities: Vec<Capability>,
    actions: Vec<CustomAction<T>>,
    store: Option<SharedStore<T>>,
    serializer: Option<Arc<dyn ModelSerializer<T>>>,
    permission_classes: Vec<Permission>,
    permission_map: PermissionMap,
    field_defaults: FieldSelection,
    destroy_policy: DestroyPolicy,
    search_fields: Vec<String>,
    filter_fields: Vec<String>,
    persist: Arc<dyn Persist<T>>,
    settings: Arc<Settings>,
}

impl<T: Entity> Default for ViewSetBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> ViewSetBuilder<T> {
    /// Empty builder; the default policy requires authentication
    pub fn new() -> Self {
        Self {
            capabilities: Vec::new(),
            actions: Vec::new(),
            store: None,
            serializer: None,
            permission_classes: vec![Permission::IsAuthenticated],
            permission_map: PermissionMap::new(),
            field_defaults: FieldSelection::all(),
            destroy_policy: DestroyPolicy::default(),
            search_fields: Vec::new(),
            filter_fields: Vec::new(),
            persist: Arc::new(PlainSave),
            settings: Arc::new(Settings::default()),
        }
    }

    /// Add capabilities, typically one of the [`presets`](crate::viewsets::presets)
    pub fn capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities.extend_from_slice(capabilities);
        self
    }

    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn store(mut self, store: SharedStore<T>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn serializer<S>(mut self, serializer: S) -> Self
    where
        S: ModelSerializer<T> + 'static,
    {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    /// Default permission policy
    pub fn permission_classes(mut self, permissions: Vec<Permission>) -> Self {
        self.permission_classes = permissions;
        self
    }

    /// Override the policy of one action; an empty list lifts every check
    pub fn permission(mut self, action: impl Into<String>, permissions: Vec<Permission>) -> Self {
        self.permission_map.insert(action.into(), permissions);
        self
    }

    /// Default field selection, merged with request hints
    pub fn fields(mut self, selection: FieldSelection) -> Self {
        self.field_defaults = selection;
        self
    }

    pub fn destroy_policy(mut self, policy: DestroyPolicy) -> Self {
        self.destroy_policy = policy;
        self
    }

    pub fn search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn filter_fields(mut self, fields: &[&str]) -> Self {
        self.filter_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn persist<P>(mut self, persist: P) -> Self
    where
        P: Persist<T> + 'static,
    {
        self.persist = Arc::new(persist);
        self
    }

    pub fn settings(mut self, settings: Arc<Settings>) -> Self {
        self.settings = settings;
        self
    }

    pub fn action(mut self, action: CustomAction<T>) -> Self {
        self.actions.push(action);
        self
    }

    /// Assemble the verb table.
    ///
    /// Fails when two units or actions claim the same verb, when nothing was
    /// composed, or when the store or serializer is missing.
    pub fn build(self) -> Result<ViewSet<T>, ConfigurationError> {
        let incomplete = |missing| ConfigurationError::Incomplete {
            entity_type: T::entity_type().to_string(),
            missing,
        };
        let store = self.store.ok_or_else(|| incomplete("store"))?;
        let serializer = self.serializer.ok_or_else(|| incomplete("serializer"))?;

        if self.capabilities.is_empty() && self.actions.is_empty() {
            return Err(ConfigurationError::EmptyComposition);
        }

        let mut routes: IndexMap<Verb, Route<T>> = IndexMap::new();
        let mut claim = |verb: Verb, route: Route<T>| -> Result<(), ConfigurationError> {
            if let Some(existing) = routes.get(&verb) {
                return Err(ConfigurationError::DuplicateVerb {
                    verb: verb.to_string(),
                    first: existing.owner(),
                    second: route.owner(),
                });
            }
            routes.insert(verb, route);
            Ok(())
        };

        for capability in self.capabilities {
            let unit = unit_for::<T>(capability);
            for verb in capability.verbs() {
                claim(verb, Route::Unit(unit.clone()))?;
            }
        }
        for action in self.actions {
            let action = Arc::new(action);
            for verb in action.verbs() {
                claim(verb, Route::Custom(action.clone()))?;
            }
        }

        tracing::debug!(
            resource = T::resource_name(),
            verbs = ?routes.keys().map(ToString::to_string).collect::<Vec<_>>(),
            "viewset built"
        );

        Ok(ViewSet {
            core: ViewSetCore {
                store,
                serializer,
                permission_classes: self.permission_classes,
                permission_map: self.permission_map,
                field_defaults: self.field_defaults,
                destroy_policy: self.destroy_policy,
                search_fields: self.search_fields,
                filter_fields: self.filter_fields,
                persist: self.persist,
                settings: self.settings,
            },
            routes,
        })
    }
}

impl<T: Sluggable> ViewSetBuilder<T> {
    /// Assign unique slugs on every save
    pub fn slugged(self) -> Self {
        self.persist(SlugAssigner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::{FieldDescriptor, FieldKind};
    use crate::core::permission::AuthContext;
    use crate::core::serializer::Serializer;
    use crate::impl_base_model;
    use crate::storage::InMemoryStore;
    use crate::viewsets::capability::presets;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    impl_base_model!(Note, "note", "notes", {
        title: String,
        code: String,
    }, unique = ["code"]);

    struct NoteSerializer;

    impl Serializer for NoteSerializer {
        fn fields(&self, _ctx: &SerializerContext) -> Vec<FieldDescriptor> {
            vec![
                FieldDescriptor::new("id", FieldKind::Uuid).read_only(),
                FieldDescriptor::new("title", FieldKind::Text).required(),
                FieldDescriptor::new("code", FieldKind::Text)
                    .required()
                    .create_only()
                    .unique(false, "Code already used."),
            ]
        }
    }

    impl ModelSerializer<Note> for NoteSerializer {}

    fn builder(store: Arc<InMemoryStore<Note>>) -> ViewSetBuilder<Note> {
        ViewSet::builder()
            .store(store)
            .serializer(NoteSerializer)
            .permission_classes(vec![Permission::AllowAny])
    }

    #[test]
    fn test_duplicate_capability_is_rejected() {
        let err = builder(Arc::new(InMemoryStore::new()))
            .capabilities(presets::READ_ONLY)
            .capability(Capability::List)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigurationError::DuplicateVerb { ref first, ref second, .. }
            if first == "list" && second == "list"));
    }

    #[test]
    fn test_empty_and_incomplete_compositions() {
        let empty = builder(Arc::new(InMemoryStore::new())).build().err().unwrap();
        assert_eq!(empty, ConfigurationError::EmptyComposition);

        let incomplete = ViewSet::<Note>::builder()
            .capabilities(presets::MODEL)
            .serializer(NoteSerializer)
            .build()
            .err()
            .unwrap();
        assert!(matches!(incomplete, ConfigurationError::Incomplete { missing: "store", .. }));
    }

    #[tokio::test]
    async fn test_unclaimed_verb_is_method_not_allowed() {
        let viewset = builder(Arc::new(InMemoryStore::new()))
            .capabilities(presets::READ_ONLY)
            .build()
            .unwrap();
        let err = viewset
            .dispatch(ViewRequest::post(json!({"title": "x", "code": "a"})))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_create_only_field_survives_update() {
        let store = Arc::new(InMemoryStore::new());
        let viewset = builder(store.clone())
            .capabilities(presets::MODEL)
            .build()
            .unwrap();

        let created = viewset
            .dispatch(ViewRequest::post(json!({"title": "First", "code": "n-1"})))
            .await
            .unwrap();
        assert_eq!(created.status, StatusCode::CREATED);
        let id = created.object()["id"].as_str().unwrap().to_string();

        let updated = viewset
            .dispatch(ViewRequest::put(&id, json!({"title": "Renamed", "code": "n-2"})))
            .await
            .unwrap();
        assert_eq!(updated.object()["title"], json!("Renamed"));
        assert_eq!(updated.object()["code"], json!("n-1"));
    }

    #[tokio::test]
    async fn test_malformed_id_is_not_found() {
        let viewset = builder(Arc::new(InMemoryStore::new()))
            .capabilities(presets::READ_ONLY)
            .build()
            .unwrap();
        let err = viewset
            .dispatch(ViewRequest::get().with_id("not-a-uuid"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_default_policy_requires_authentication() {
        let viewset = ViewSet::builder()
            .store(Arc::new(InMemoryStore::<Note>::new()))
            .serializer(NoteSerializer)
            .capabilities(presets::LIST)
            .build()
            .unwrap();

        let anonymous = viewset.dispatch(ViewRequest::get()).await.unwrap_err();
        assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);

        let ok = viewset
            .dispatch(ViewRequest::get().with_auth(AuthContext::user(Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(ok.status, StatusCode::OK);
        assert_eq!(viewset.verbs().next(), Some(&Verb::collection(Method::GET)));
    }
}
