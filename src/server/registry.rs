//! Resource registry collecting the routers of every registered viewset

use axum::Router;
use indexmap::IndexMap;
use std::sync::Arc;

use crate::core::entity::Entity;
use crate::server::rest::viewset_router;
use crate::viewsets::ViewSet;

/// Something that can expose itself as a router
pub trait RouteProvider: Send + Sync {
    /// The entity type name (singular, e.g., "user")
    fn entity_type(&self) -> &str;

    /// URL segment of the resource (e.g., "users")
    fn resource_name(&self) -> &str;

    fn build_routes(&self) -> Router;
}

impl<T: Entity> RouteProvider for Arc<ViewSet<T>> {
    fn entity_type(&self) -> &str {
        T::entity_type()
    }

    fn resource_name(&self) -> &str {
        T::resource_name()
    }

    fn build_routes(&self) -> Router {
        viewset_router(self.clone())
    }
}

/// Registry of exposed resources, keyed by resource name
#[derive(Default)]
pub struct ResourceRegistry {
    providers: IndexMap<String, Box<dyn RouteProvider>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider; a second one for the same resource replaces the first
    pub fn register(&mut self, provider: Box<dyn RouteProvider>) {
        let resource = provider.resource_name().to_string();
        if self.providers.contains_key(&resource) {
            tracing::warn!(resource = %resource, "resource registered twice, replacing");
        }
        self.providers.insert(resource, provider);
    }

    /// Merge the routes of every provider
    pub fn build_routes(&self) -> Router {
        self.providers
            .values()
            .fold(Router::new(), |router, provider| {
                router.merge(provider.build_routes())
            })
    }

    /// Registered resource names, in registration order
    pub fn resources(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockProvider {
        entity_type: &'static str,
        resource: &'static str,
    }

    impl RouteProvider for MockProvider {
        fn entity_type(&self) -> &str {
            self.entity_type
        }

        fn resource_name(&self) -> &str {
            self.resource
        }

        fn build_routes(&self) -> Router {
            Router::new()
        }
    }

    fn mock(entity_type: &'static str, resource: &'static str) -> Box<dyn RouteProvider> {
        Box::new(MockProvider {
            entity_type,
            resource,
        })
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut registry = ResourceRegistry::new();
        registry.register(mock("user", "users"));
        registry.register(mock("category", "categories"));
        assert_eq!(registry.resources(), vec!["users", "categories"]);
    }

    #[test]
    fn test_duplicate_resource_replaces() {
        let mut registry = ResourceRegistry::new();
        registry.register(mock("user", "users"));
        registry.register(mock("member", "users"));
        assert_eq!(registry.len(), 1);
        let _router = registry.build_routes();
    }
}
