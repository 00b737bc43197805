//! The five CRUD capability units

use async_trait::async_trait;
use axum::http::Method;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::entity::Entity;
use crate::core::error::FoundationError;
use crate::core::query::{ListQuery, PaginatedResponse};
use crate::core::serializer::Action;
use crate::core::store::Scope;
use crate::viewsets::capability::Capability;
use crate::viewsets::request::{ViewRequest, ViewResponse, into_object};
use crate::viewsets::viewset::{DestroyPolicy, ViewSetCore};

/// Handler for the verbs of one capability
#[async_trait]
pub trait CapabilityUnit<T: Entity>: Send + Sync {
    fn capability(&self) -> Capability;

    async fn handle(
        &self,
        core: &ViewSetCore<T>,
        request: ViewRequest,
    ) -> Result<ViewResponse, FoundationError>;
}

/// Unit implementing `capability`
pub fn unit_for<T: Entity>(capability: Capability) -> Arc<dyn CapabilityUnit<T>> {
    match capability {
        Capability::Create => Arc::new(CreateUnit),
        Capability::List => Arc::new(ListUnit),
        Capability::Retrieve => Arc::new(RetrieveUnit),
        Capability::Update => Arc::new(UpdateUnit),
        Capability::Destroy => Arc::new(DestroyUnit),
    }
}

/// `POST /resource` → 201 with the representation of the saved entity
pub struct CreateUnit;

#[async_trait]
impl<T: Entity> CapabilityUnit<T> for CreateUnit {
    fn capability(&self) -> Capability {
        Capability::Create
    }

    async fn handle(
        &self,
        core: &ViewSetCore<T>,
        request: ViewRequest,
    ) -> Result<ViewResponse, FoundationError> {
        let ctx = core.context(Action::Create, &request);
        core.authorize(&ctx, core.policy(ctx.action.name(), &core.permission_classes))?;

        let view = core.view(&ctx, &request);
        let data = core.validate(&view, &ctx, &request.body).await?;
        let entity = core.serializer.create(&data, &ctx)?;
        let saved = core.save(entity).await?;

        tracing::info!(entity_type = T::entity_type(), id = %saved.id(), "entity created");
        Ok(ViewResponse::created(into_object(view.represent(&saved)?)))
    }
}

/// `GET /resource` → searched, filtered, ordered and paginated active entities
pub struct ListUnit;

#[async_trait]
impl<T: Entity> CapabilityUnit<T> for ListUnit {
    fn capability(&self) -> Capability {
        Capability::List
    }

    async fn handle(
        &self,
        core: &ViewSetCore<T>,
        request: ViewRequest,
    ) -> Result<ViewResponse, FoundationError> {
        let ctx = core.context(Action::List, &request);
        core.authorize(&ctx, core.policy(ctx.action.name(), &core.permission_classes))?;

        let view = core.view(&ctx, &request);
        let query = ListQuery::parse(&request.query, &core.filter_fields, &core.settings);

        let mut rows: Vec<(T, Map<String, Value>)> = Vec::new();
        for entity in core.store.list(Scope::Active).await? {
            let attributes = entity.to_fields()?;
            if query.matches(&attributes, &core.search_fields) {
                rows.push((entity, attributes));
            }
        }
        query.sort(&mut rows, |row| &row.1, |field| view.is_visible(field));

        let (page, pagination) = query.paginate(rows);
        let data = page
            .iter()
            .map(|(entity, _)| view.represent(entity).map(into_object))
            .collect::<Result<Vec<_>, _>>()?;

        let body = serde_json::to_value(PaginatedResponse { data, pagination })?;
        Ok(ViewResponse::ok(body))
    }
}

/// `GET /resource/{id}`
pub struct RetrieveUnit;

#[async_trait]
impl<T: Entity> CapabilityUnit<T> for RetrieveUnit {
    fn capability(&self) -> Capability {
        Capability::Retrieve
    }

    async fn handle(
        &self,
        core: &ViewSetCore<T>,
        request: ViewRequest,
    ) -> Result<ViewResponse, FoundationError> {
        let ctx = core.context(Action::Retrieve, &request);
        let policy = core.policy(ctx.action.name(), &core.permission_classes);
        core.authorize(&ctx, policy)?;

        let id = request.target_id::<T>()?;
        let ctx = ctx.with_instance(id);
        let instance = core.get_object(id, &ctx, policy).await?;

        let view = core.view(&ctx, &request);
        Ok(ViewResponse::ok(into_object(view.represent(&instance)?)))
    }
}

/// `PUT` (full) and `PATCH` (partial) `/resource/{id}`
pub struct UpdateUnit;

#[async_trait]
impl<T: Entity> CapabilityUnit<T> for UpdateUnit {
    fn capability(&self) -> Capability {
        Capability::Update
    }

    async fn handle(
        &self,
        core: &ViewSetCore<T>,
        request: ViewRequest,
    ) -> Result<ViewResponse, FoundationError> {
        let partial = request.method == Method::PATCH;
        let action = if partial {
            Action::PartialUpdate
        } else {
            Action::Update
        };
        let ctx = core.context(action, &request).partial(partial);
        let policy = core.policy(ctx.action.name(), &core.permission_classes);
        core.authorize(&ctx, policy)?;

        let id = request.target_id::<T>()?;
        let ctx = ctx.with_instance(id);
        let instance = core.get_object(id, &ctx, policy).await?;

        let view = core.view(&ctx, &request);
        let data = core.validate(&view, &ctx, &request.body).await?;
        let entity = core.serializer.update(instance, &data, &ctx)?;
        let saved = core.save(entity).await?;

        tracing::debug!(entity_type = T::entity_type(), id = %id, partial, "entity updated");
        Ok(ViewResponse::ok(into_object(view.represent(&saved)?)))
    }
}

/// `DELETE /resource/{id}` → 204, removing or deactivating per policy
pub struct DestroyUnit;

#[async_trait]
impl<T: Entity> CapabilityUnit<T> for DestroyUnit {
    fn capability(&self) -> Capability {
        Capability::Destroy
    }

    async fn handle(
        &self,
        core: &ViewSetCore<T>,
        request: ViewRequest,
    ) -> Result<ViewResponse, FoundationError> {
        let ctx = core.context(Action::Destroy, &request);
        let policy = core.policy(ctx.action.name(), &core.permission_classes);
        core.authorize(&ctx, policy)?;

        let id = request.target_id::<T>()?;
        let ctx = ctx.with_instance(id);
        let mut instance = core.get_object(id, &ctx, policy).await?;

        match core.destroy_policy {
            DestroyPolicy::Remove => {
                core.store.delete(&id).await?;
            }
            DestroyPolicy::Deactivate => {
                instance.set_active(false);
                core.save(instance).await?;
            }
        }

        tracing::info!(
            entity_type = T::entity_type(),
            id = %id,
            policy = ?core.destroy_policy,
            "entity destroyed"
        );
        Ok(ViewResponse::no_content())
    }
}
