//! Server module for building HTTP servers from viewsets
//!
//! This module provides a `ServerBuilder` that registers:
//! - the routes of every registered viewset, under the API prefix
//! - health check routes
//! - custom routes

pub mod builder;
pub mod registry;
pub mod rest;

pub use builder::ServerBuilder;
pub use registry::{ResourceRegistry, RouteProvider};
pub use rest::{parse_body, viewset_router};
