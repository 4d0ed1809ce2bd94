//! The inter-type declaration merge engine.

pub mod assembly;
pub mod builder;
pub mod render;
