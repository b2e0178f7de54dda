//! Builders to construct gate components from configuration.

pub mod router_builder;

pub use router_builder::{build_router, router_from_env};
