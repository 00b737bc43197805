//! Entity definition macros
//!
//! `impl_base_model!` and `impl_slug_model!` are exported at the crate root.

pub mod macros;
