//! Entry point for file-system changes.
//!
//! A changed path is mapped to the physical-type id it declares; that id
//! is evicted, recomputed, and its downstream notified. Generated artifacts
//! and non-Java files map to nothing, which is what stops the
//! write-notify-regenerate loop.

use std::path::Path;
use std::sync::Arc;

use crate::error::Error;
use crate::metadata::id::MetadataId;
use crate::metadata::service::MetadataService;
use crate::path_resolver::PathResolverRegistry;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileOperation {
    /// The file appeared.
    Created,
    /// The file is gone.
    Deleted,
    /// The file's content changed.
    Updated,
}

/// Routes low-level change notifications into the metadata system.
pub struct ChangeDispatcher {
    /// Maps paths to physical-type ids.
    resolvers: Arc<PathResolverRegistry>,
    /// Evicts and recomputes.
    service: Arc<MetadataService>,
}

impl ChangeDispatcher {
    /// A dispatcher over `service`.
    pub const fn new(resolvers: Arc<PathResolverRegistry>, service: Arc<MetadataService>) -> Self {
        return Self { resolvers, service };
    }

    /// Handle a change to `path` (relative to the project root). Returns
    /// the physical-type id that was invalidated, if any.
    ///
    /// # Errors
    ///
    /// `IllegalArgument` when no path resolver is active; the recompute
    /// error of the changed type (its downstream has been notified first).
    pub fn on_low_level_change(&self, path: &Path, operation: FileOperation) -> Result<Option<MetadataId>, Error> {
        let resolver = self.resolvers.active()?;
        let Some(id) = resolver.physical_type_id(path) else {
            tracing::trace!(path = %path.display(), ?operation, "change ignored");
            return Ok(None);
        };
        tracing::debug!(%id, ?operation, "source changed");
        self.service.evict_and_notify(&id)?;
        return Ok(Some(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::dependency::DependencyRegistry;
    use crate::metadata::id::ProviderKind;
    use crate::metadata::service::ServiceSettings;
    use crate::model::java_type::{JavaType, LogicalPath};
    use crate::path_resolver::MavenLayout;
    use crate::project::InMemorySources;
    use crate::providers::physical::PhysicalTypeProvider;
    use crate::providers::plural::PluralProvider;

    fn setup(sources: &Arc<InMemorySources>) -> (ChangeDispatcher, Arc<MetadataService>) {
        let resolvers = Arc::new(PathResolverRegistry::new());
        resolvers.activate(Arc::new(MavenLayout::single_module("_Itd"))).unwrap();
        let service = MetadataService::new(Arc::new(DependencyRegistry::new()), ServiceSettings::default());
        let repository: Arc<dyn crate::project::SourceRepository> = sources.clone();
        service.register_provider(Arc::new(PhysicalTypeProvider::new(Arc::clone(&resolvers), repository))).unwrap();
        service.register_provider(Arc::new(PluralProvider)).unwrap();
        return (ChangeDispatcher::new(resolvers, Arc::clone(&service)), service);
    }

    fn plural() -> MetadataId {
        return ProviderKind::PLURAL.instance_id(&JavaType::new("com.foo.Person"), &LogicalPath::main_java());
    }

    #[test]
    fn source_edits_reach_downstream_items() {
        let sources = Arc::new(InMemorySources::new());
        sources.put("src/main/java/com/foo/Person.java", "package com.foo; class Person {}");
        let (dispatcher, service) = setup(&sources);
        assert_eq!(service.get(&plural()).unwrap().unwrap().plural(), Some("Persons"));

        sources.put(
            "src/main/java/com/foo/Person.java",
            "package com.foo; import org.itdgen.annotations.Plural; @Plural(\"People\") class Person {}",
        );
        let id = dispatcher
            .on_low_level_change(Path::new("src/main/java/com/foo/Person.java"), FileOperation::Updated)
            .unwrap();
        assert_eq!(id, Some(MetadataId::physical_type(&JavaType::new("com.foo.Person"), &LogicalPath::main_java())));
        assert_eq!(service.peek(&plural()).flatten().unwrap().plural(), Some("People"));
    }

    #[test]
    fn deletions_make_items_absent() {
        let sources = Arc::new(InMemorySources::new());
        sources.put("src/main/java/com/foo/Person.java", "package com.foo; class Person {}");
        let (dispatcher, service) = setup(&sources);
        service.get(&plural()).unwrap();

        sources.remove("src/main/java/com/foo/Person.java");
        dispatcher
            .on_low_level_change(Path::new("src/main/java/com/foo/Person.java"), FileOperation::Deleted)
            .unwrap();
        assert_eq!(service.peek(&plural()), Some(None));
    }

    #[test]
    fn artifacts_and_other_files_are_ignored() {
        let sources = Arc::new(InMemorySources::new());
        let (dispatcher, _service) = setup(&sources);
        let artifact = dispatcher.on_low_level_change(Path::new("src/main/java/com/foo/Person_Itd.aj"), FileOperation::Updated);
        assert_eq!(artifact.unwrap(), None);
        let readme = dispatcher.on_low_level_change(Path::new("README.md"), FileOperation::Created);
        assert_eq!(readme.unwrap(), None);
    }
}
