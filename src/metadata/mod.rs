//! Metadata identifiers, items, the dependency graph, and the caching
//! service that ties providers together.

pub mod dependency;
pub mod id;
pub mod item;
pub mod provider;
pub mod service;
