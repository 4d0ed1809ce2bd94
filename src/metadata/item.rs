//! Cached units of derived information.

use std::sync::Arc;

use crate::itd::builder::Contribution;
use crate::metadata::id::MetadataId;
use crate::model::java_type::JavaType;
use crate::model::type_details::ClassOrInterfaceTypeDetails;

/// The assembled output for one governor.
#[derive(Debug, Clone, PartialEq)]
pub struct Companion {
    /// Name of the generated artifact, e.g. `com.foo.Foo_Itd`.
    pub artifact_type: JavaType,
    /// Generated members only.
    pub itd: Arc<ClassOrInterfaceTypeDetails>,
    /// Governor plus every generated member.
    pub merged: Arc<ClassOrInterfaceTypeDetails>,
    /// Rendered artifact text.
    pub rendered: String,
}

/// What an item holds.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataBody {
    /// The assembled ITD for a governor.
    Companion(Companion),
    /// Members one provider requested for a governor.
    Contribution(Contribution),
    /// A parsed hand-written type.
    PhysicalType(Arc<ClassOrInterfaceTypeDetails>),
    /// The plural of a type's simple name.
    Plural(String),
}

/// A keyed piece of derived information. Items compare by value so the
/// service can tell whether a recompute changed anything.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataItem {
    /// Payload.
    body: MetadataBody,
    /// Identifier the item was computed for.
    id: MetadataId,
}

impl MetadataItem {
    /// Wrap a payload.
    pub const fn new(id: MetadataId, body: MetadataBody) -> Self {
        return Self { body, id };
    }

    /// Payload.
    pub const fn body(&self) -> &MetadataBody {
        return &self.body;
    }

    /// Identifier the item was computed for.
    pub const fn id(&self) -> &MetadataId {
        return &self.id;
    }

    /// The companion payload, if this is one.
    pub const fn companion(&self) -> Option<&Companion> {
        return match &self.body {
            MetadataBody::Companion(companion) => Some(companion),
            _ => None,
        };
    }

    /// The contribution payload, if this is one.
    pub const fn contribution(&self) -> Option<&Contribution> {
        return match &self.body {
            MetadataBody::Contribution(contribution) => Some(contribution),
            _ => None,
        };
    }

    /// The parsed type, if this is a physical-type item.
    pub const fn physical_type(&self) -> Option<&Arc<ClassOrInterfaceTypeDetails>> {
        return match &self.body {
            MetadataBody::PhysicalType(details) => Some(details),
            _ => None,
        };
    }

    /// The plural, if this is a plural item.
    pub fn plural(&self) -> Option<&str> {
        return match &self.body {
            MetadataBody::Plural(plural) => Some(plural),
            _ => None,
        };
    }
}
