//! Structural model of Java source: identifiers, members, and types.

pub mod annotation;
pub mod custom_data;
pub mod java_type;
pub mod member;
pub mod type_details;
