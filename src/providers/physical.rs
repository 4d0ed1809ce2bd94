//! Parsed hand-written types.

use std::sync::Arc;

use crate::error::Error;
use crate::metadata::id::{MetadataId, ProviderKind};
use crate::metadata::item::{MetadataBody, MetadataItem};
use crate::metadata::provider::{self, MetadataProvider};
use crate::metadata::service::MetadataService;
use crate::model::java_type::{JavaType, LogicalPath};
use crate::model::type_details::{ClassOrInterfaceTypeDetails, ClassOrInterfaceTypeDetailsBuilder};
use crate::parser;
use crate::path_resolver::PathResolverRegistry;
use crate::project::SourceRepository;
use crate::providers::ParentLinks;

/// Root of every class hierarchy; never looked up.
const OBJECT: &str = "java.lang.Object";

/// Serves `MID#physical` items by parsing sources through the active
/// path resolver.
pub struct PhysicalTypeProvider {
    /// Edges from each type to its superclass's physical item.
    parents: ParentLinks,
    /// Locates the file declaring a type.
    resolvers: Arc<PathResolverRegistry>,
    /// Where file contents come from.
    sources: Arc<dyn SourceRepository>,
}

impl PhysicalTypeProvider {
    /// A provider reading `sources`.
    pub fn new(resolvers: Arc<PathResolverRegistry>, sources: Arc<dyn SourceRepository>) -> Self {
        return Self { parents: ParentLinks::default(), resolvers, sources };
    }

    /// Fetch the superclass's own physical item and record the edge so a
    /// change to the parent relinks this type. `None` when the parent is
    /// not part of the project, not available yet, or would close a cycle.
    fn link_superclass(
        &self,
        details: &ClassOrInterfaceTypeDetails,
        id: &MetadataId,
        path: &LogicalPath,
        service: &MetadataService,
    ) -> Result<Option<Arc<ClassOrInterfaceTypeDetails>>, Error> {
        let parent = details.superclass_type().filter(|p| return p.fully_qualified_name() != OBJECT);
        let parent_id = parent.map(|p| return MetadataId::physical_type(p, path));
        self.parents.relink(service.registry(), id, parent_id.as_ref())?;
        let (Some(parent), Some(parent_id)) = (parent, parent_id) else {
            return Ok(None);
        };

        let Some(item) = service.get(&parent_id)? else {
            tracing::trace!(%id, parent = %parent, "superclass not available");
            return Ok(None);
        };
        let Some(parent_details) = item.physical_type() else {
            return Ok(None);
        };
        if closes_cycle(parent_details, details.name()) {
            tracing::warn!(java_type = %details.name(), parent = %parent, "cyclic superclass chain left unlinked");
            return Ok(None);
        }
        return Ok(Some(Arc::clone(parent_details)));
    }
}

impl MetadataProvider for PhysicalTypeProvider {
    fn kind(&self) -> ProviderKind {
        return ProviderKind::PHYSICAL_TYPE;
    }

    fn get_metadata(&self, id: &MetadataId, service: &MetadataService) -> Result<Option<MetadataItem>, Error> {
        provider::ensure_owned(self.kind(), id)?;
        let (Some(java_type), Some(path)) = (id.java_type(), id.path()) else {
            return Ok(None);
        };
        let resolver = self.resolvers.active()?;
        let Some(file) = resolver.source_path(java_type, path) else {
            return Ok(None);
        };
        let Some(source) = self.sources.read(&file)? else {
            tracing::trace!(%id, file = %file.display(), "no source");
            self.parents.relink(service.registry(), id, None)?;
            return Ok(None);
        };
        let unit = parser::parse_compilation_unit(&file, &source, path)?;
        let Some(details) = unit.find_type(java_type) else {
            tracing::debug!(%id, file = %file.display(), "file does not declare the type");
            self.parents.relink(service.registry(), id, None)?;
            return Ok(None);
        };

        let superclass = self.link_superclass(details, id, path, service)?;
        let mut builder = ClassOrInterfaceTypeDetailsBuilder::from_existing(details);
        builder.set_superclass(superclass);
        let details = builder.build()?;

        return Ok(Some(MetadataItem::new(id.clone(), MetadataBody::PhysicalType(Arc::new(details)))));
    }
}

/// Whether linking `parent` as the superclass of `child` would loop.
fn closes_cycle(parent: &ClassOrInterfaceTypeDetails, child: &JavaType) -> bool {
    return parent.name() == child || parent.ancestors().iter().any(|a| return a.name() == child);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::dependency::DependencyRegistry;
    use crate::metadata::service::ServiceSettings;
    use crate::path_resolver::MavenLayout;
    use crate::project::InMemorySources;

    fn setup(sources: Arc<InMemorySources>) -> Arc<MetadataService> {
        let resolvers = Arc::new(PathResolverRegistry::new());
        resolvers.activate(Arc::new(MavenLayout::single_module("_Itd"))).unwrap();
        let service = MetadataService::new(Arc::new(DependencyRegistry::new()), ServiceSettings::default());
        service.register_provider(Arc::new(PhysicalTypeProvider::new(resolvers, sources))).unwrap();
        return service;
    }

    fn physical(name: &str) -> MetadataId {
        return MetadataId::physical_type(&JavaType::new(name), &LogicalPath::main_java());
    }

    #[test]
    fn parses_and_links_superclass() {
        let sources = Arc::new(InMemorySources::new());
        sources.put("src/main/java/com/foo/Base.java", "package com.foo; public class Base { private Long id; }");
        sources.put("src/main/java/com/foo/Foo.java", "package com.foo; public class Foo extends Base { }");
        let service = setup(Arc::clone(&sources));

        let foo = service.get(&physical("com.foo.Foo")).unwrap().unwrap();
        let details = foo.physical_type().unwrap();
        assert_eq!(details.superclass().unwrap().name(), &JavaType::new("com.foo.Base"));
        assert_eq!(service.registry().downstream(&physical("com.foo.Base")), vec![physical("com.foo.Foo")]);
    }

    #[test]
    fn superclass_changes_replace_only_the_parent_edge() {
        let sources = Arc::new(InMemorySources::new());
        sources.put("src/main/java/com/foo/Base.java", "package com.foo; public class Base { }");
        sources.put("src/main/java/com/foo/Other.java", "package com.foo; public class Other { }");
        sources.put("src/main/java/com/foo/Foo.java", "package com.foo; public class Foo extends Base { }");
        let service = setup(Arc::clone(&sources));
        let watcher = MetadataId::parse("MID#project?com.foo.Foo|SRC_MAIN_JAVA").unwrap();
        service.registry().register_dependency(&watcher, &physical("com.foo.Foo")).unwrap();

        service.get(&physical("com.foo.Foo")).unwrap().unwrap();
        assert_eq!(service.registry().upstream(&physical("com.foo.Foo")), vec![watcher.clone(), physical("com.foo.Base")]);

        sources.put("src/main/java/com/foo/Foo.java", "package com.foo; public class Foo extends Other { }");
        service.evict(&physical("com.foo.Foo"));
        service.get(&physical("com.foo.Foo")).unwrap().unwrap();
        assert_eq!(service.registry().upstream(&physical("com.foo.Foo")), vec![watcher.clone(), physical("com.foo.Other")]);

        assert!(sources.remove("src/main/java/com/foo/Foo.java"));
        service.evict(&physical("com.foo.Foo"));
        assert!(service.get(&physical("com.foo.Foo")).unwrap().is_none());
        assert_eq!(service.registry().upstream(&physical("com.foo.Foo")), vec![watcher]);
    }

    #[test]
    fn missing_files_are_absent_not_errors() {
        let service = setup(Arc::new(InMemorySources::new()));
        assert!(service.get(&physical("com.foo.Nope")).unwrap().is_none());
    }

    #[test]
    fn cyclic_hierarchies_stay_unlinked() {
        let sources = Arc::new(InMemorySources::new());
        sources.put("src/main/java/com/foo/A.java", "package com.foo; class A extends B {}");
        sources.put("src/main/java/com/foo/B.java", "package com.foo; class B extends A {}");
        let service = setup(sources);

        let a = service.get(&physical("com.foo.A")).unwrap().unwrap();
        let a = a.physical_type().unwrap();
        assert!(a.ancestors().len() <= 1);
    }

    #[test]
    fn parse_failures_propagate() {
        let sources = Arc::new(InMemorySources::new());
        sources.put("src/main/java/com/foo/Foo.java", "package com.foo; class Foo {");
        let service = setup(sources);
        assert!(matches!(service.get(&physical("com.foo.Foo")), Err(Error::ParseFailed { .. })));
    }
}
