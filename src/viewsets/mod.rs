//! Composable CRUD viewsets
//!
//! A [`ViewSet`] is assembled from independent capability units (create,
//! list, retrieve, update, destroy) plus optional custom actions. Each unit
//! claims its verbs in a table; dispatch is a lookup in that table.
//!
//! # Example
//!
//! ```rust,ignore
//! let users = ViewSet::builder()
//!     .capabilities(presets::CREATE_LIST_UPDATE_DESTROY)
//!     .store(store)
//!     .serializer(UserDetailSerializer)
//!     .permission("create", vec![])
//!     .destroy_policy(DestroyPolicy::Deactivate)
//!     .build()?;
//! ```

pub mod action;
pub mod capability;
pub mod request;
pub mod units;
pub mod viewset;

pub use action::{ActionHandler, ActionInvocation, CustomAction};
pub use capability::{Capability, Verb, presets};
pub use request::{ViewRequest, ViewResponse, into_object};
pub use units::CapabilityUnit;
pub use viewset::{DestroyPolicy, ViewSet, ViewSetBuilder, ViewSetCore};
