//! # API Foundation
//!
//! Shared building blocks for REST backends: base models, unique slugs,
//! dynamic field projection, action-based permissions, composable CRUD
//! viewsets and reusable input validators.
//!
//! ## Features
//!
//! - **Base models**: `id`, `created_at`, `modified_at` and `is_active` on every entity
//! - **Slugs**: unique, URL-safe identifiers derived from a declared display field
//! - **Field projection**: per-request field sets from `fields` / `exclude` hints
//! - **Permissions**: per-action policies with a viewset-wide default
//! - **Viewsets**: create/list/retrieve/update/destroy units composed into a verb table
//! - **Validators**: names, phone numbers, OTPs, dates of birth, attachments
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use foundation::prelude::*;
//!
//! impl_slug_model!(Category, "category", "categories", display = name, {
//!     name: String,
//! });
//!
//! struct CategorySerializer;
//!
//! impl Serializer for CategorySerializer {
//!     fn fields(&self, _ctx: &SerializerContext) -> Vec<FieldDescriptor> {
//!         vec![
//!             FieldDescriptor::new("id", FieldKind::Uuid).read_only(),
//!             FieldDescriptor::new("slug", FieldKind::Text).read_only(),
//!             FieldDescriptor::new("name", FieldKind::Text).required(),
//!         ]
//!     }
//! }
//!
//! impl ModelSerializer<Category> for CategorySerializer {}
//!
//! let categories = ViewSet::builder()
//!     .capabilities(presets::MODEL)
//!     .store(Arc::new(InMemoryStore::<Category>::new()))
//!     .serializer(CategorySerializer)
//!     .slugged()
//!     .build()?;
//!
//! ServerBuilder::new().register(categories).serve().await?;
//! ```

pub mod accounts;
pub mod config;
pub mod core;
pub mod entities;
pub mod logging;
pub mod server;
pub mod storage;
pub mod viewsets;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        entity::{DisplayText, Entity, Sluggable},
        error::{
            ConfigurationError, FoundationError, NotFoundError, PermissionError, StorageError,
            ValidationError,
        },
        field::{Attachment, FieldDescriptor, FieldKind},
        helpers::{combine_date_parts, today, upload_path},
        permission::{AuthContext, Permission, PermissionMap},
        projection::{FieldSelection, ProjectedView, build_view},
        query::{PaginatedResponse, PaginationMeta},
        serializer::{Action, ModelSerializer, Serializer, SerializerContext, ValidatedData},
        slug::{PlainSave, SlugAssigner},
        store::{EntityStore, Lookup, Scope, SharedStore},
        validation::{filters, rules},
    };

    // === Macros ===
    pub use crate::{impl_base_model, impl_slug_model};

    // === Viewsets ===
    pub use crate::viewsets::{
        ActionInvocation, Capability, CustomAction, DestroyPolicy, ViewRequest, ViewResponse,
        ViewSet, into_object, presets,
    };

    // === Storage ===
    pub use crate::storage::InMemoryStore;

    // === Config ===
    pub use crate::config::Settings;

    // === Server ===
    pub use crate::server::{ResourceRegistry, RouteProvider, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
    pub use uuid::Uuid;
}
