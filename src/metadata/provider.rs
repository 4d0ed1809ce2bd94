//! The provider contract: one provider per metadata kind.

use crate::error::Error;
use crate::metadata::dependency::DependencyRegistry;
use crate::metadata::id::{MetadataId, ProviderKind};
use crate::metadata::item::MetadataItem;
use crate::metadata::service::MetadataService;

/// Computes metadata items of one kind.
pub trait MetadataProvider: Send + Sync {
    /// The kind this provider owns.
    fn kind(&self) -> ProviderKind;

    /// Compute the item for an instance id of this provider's kind.
    /// `Ok(None)` means the item does not apply (or an upstream is not
    /// available yet).
    ///
    /// # Errors
    ///
    /// Provider specific; contract violations in the governor are the
    /// common case.
    fn get_metadata(&self, id: &MetadataId, service: &MetadataService) -> Result<Option<MetadataItem>, Error>;

    /// Map a change of `upstream`, delivered to this kind's class-level id,
    /// to the instance that must be recomputed. Defaults to the same type
    /// and path under this kind.
    fn resolve_downstream(&self, upstream: &MetadataId) -> Option<MetadataId> {
        if upstream.is_class_level() {
            return None;
        }
        return Some(upstream.with_kind(self.kind()));
    }

    /// Register class-level dependency edges.
    ///
    /// # Errors
    ///
    /// Propagates registry errors.
    fn start(&self, _registry: &DependencyRegistry) -> Result<(), Error> {
        return Ok(());
    }

    /// Remove whatever `start` registered.
    fn stop(&self, _registry: &DependencyRegistry) {}
}

/// Reject ids that belong to another provider.
///
/// # Errors
///
/// Returns `Error::IllegalArgument` when `id` is class-level or of a
/// different kind.
pub fn ensure_owned(kind: ProviderKind, id: &MetadataId) -> Result<(), Error> {
    if !kind.owns(id) || id.is_class_level() {
        return Err(Error::IllegalArgument {
            reason: format!("`{id}` is not an instance id of kind `{kind}`"),
        });
    }
    return Ok(());
}
