//! Mapping between files and types.
//!
//! A `PathResolver` turns a project-relative file path into the physical
//! type id it declares, and a type back into its source and artifact paths.
//! Exactly one strategy may be active at a time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Error;
use crate::grammar;
use crate::metadata::id::MetadataId;
use crate::model::java_type::{JavaSymbolName, JavaType, LogicalPath, SourceRoot};
use crate::project;

/// Extension of generated artifacts.
pub const ARTIFACT_EXTENSION: &str = "aj";

/// Source roots searched inside every module, in lookup order.
const SOURCE_ROOTS: [SourceRoot; 2] = [SourceRoot::SrcMainJava, SourceRoot::SrcTestJava];

/// A strategy for locating types on disk.
pub trait PathResolver: Send + Sync {
    /// Where the generated artifact of `artifact_type` lives.
    fn artifact_path(&self, artifact_type: &JavaType, logical_path: &LogicalPath) -> Option<PathBuf>;

    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Physical-type id of the type declared by a source file. `None` for
    /// files outside every source root, non-Java files, and generated
    /// artifacts.
    fn physical_type_id(&self, path: &Path) -> Option<MetadataId>;

    /// Where the source of `java_type` lives.
    fn source_path(&self, java_type: &JavaType, logical_path: &LogicalPath) -> Option<PathBuf>;
}

/// Conventional `module/src/{main,test}/java/com/foo/Foo.java` layout.
#[derive(Debug, Clone)]
pub struct MavenLayout {
    /// Appended to a governor's simple name to form the artifact name.
    artifact_suffix: String,
    /// Module name to module directory; the root module is `""`.
    modules: BTreeMap<String, PathBuf>,
}

impl MavenLayout {
    /// A layout over the given modules.
    pub fn new(modules: BTreeMap<String, PathBuf>, artifact_suffix: &str) -> Self {
        let modules = modules.into_iter().map(|(name, dir)| return (name, project::normalize(&dir))).collect();
        return Self { artifact_suffix: artifact_suffix.to_string(), modules };
    }

    /// Just the root module.
    pub fn single_module(artifact_suffix: &str) -> Self {
        return Self::new(BTreeMap::from([(String::new(), PathBuf::new())]), artifact_suffix);
    }

    /// Directory of a source root, if the module is known.
    fn root_dir(&self, logical_path: &LogicalPath) -> Option<PathBuf> {
        let module_dir = self.modules.get(logical_path.module())?;
        return Some(module_dir.join(logical_path.root().directory()));
    }

    /// Modules with the deepest directory first, so nested modules win.
    fn modules_by_depth(&self) -> Vec<(&String, &PathBuf)> {
        let mut modules: Vec<(&String, &PathBuf)> = self.modules.iter().collect();
        modules.sort_by_key(|(_, dir)| return std::cmp::Reverse(dir.components().count()));
        return modules;
    }
}

impl PathResolver for MavenLayout {
    fn artifact_path(&self, artifact_type: &JavaType, logical_path: &LogicalPath) -> Option<PathBuf> {
        let mut path = self.root_dir(logical_path)?;
        path.push(artifact_type.fully_qualified_name().replace('.', "/"));
        path.set_extension(ARTIFACT_EXTENSION);
        return Some(path);
    }

    fn name(&self) -> &'static str {
        return "maven-layout";
    }

    fn physical_type_id(&self, path: &Path) -> Option<MetadataId> {
        if !grammar::is_java_source(path) {
            return None;
        }
        let path = project::normalize(path);
        let stem = path.file_stem()?.to_str()?;
        if !self.artifact_suffix.is_empty() && stem.ends_with(&self.artifact_suffix) {
            return None;
        }
        for (module, dir) in self.modules_by_depth() {
            for root in SOURCE_ROOTS {
                let Ok(relative) = path.strip_prefix(dir.join(root.directory())) else {
                    continue;
                };
                let java_type = type_from_relative(relative)?;
                return Some(MetadataId::physical_type(&java_type, &LogicalPath::new(module, root)));
            }
        }
        return None;
    }

    fn source_path(&self, java_type: &JavaType, logical_path: &LogicalPath) -> Option<PathBuf> {
        let mut outermost = java_type;
        while let Some(enclosing) = outermost.enclosing() {
            outermost = enclosing;
        }
        let mut path = self.root_dir(logical_path)?;
        path.push(outermost.fully_qualified_name().replace('.', "/"));
        path.set_extension(grammar::JAVA_EXTENSION);
        return Some(path);
    }
}

/// `com/foo/Foo.java` → `com.foo.Foo`; `None` if a segment is not an identifier.
fn type_from_relative(relative: &Path) -> Option<JavaType> {
    let without_extension = relative.with_extension("");
    let mut segments = Vec::new();
    for component in without_extension.components() {
        let segment = component.as_os_str().to_str()?;
        JavaSymbolName::new(segment).ok()?;
        segments.push(segment);
    }
    if segments.is_empty() {
        return None;
    }
    return Some(JavaType::new(&segments.join(".")));
}

/// Holds the single active strategy.
#[derive(Default)]
pub struct PathResolverRegistry {
    /// The active strategy, if any.
    active: RwLock<Option<Arc<dyn PathResolver>>>,
}

impl PathResolverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Make `resolver` the active strategy.
    ///
    /// # Errors
    ///
    /// Returns `Error::ResolverConflict` if a strategy is already active.
    pub fn activate(&self, resolver: Arc<dyn PathResolver>) -> Result<(), Error> {
        let mut active = self.active.write();
        if let Some(current) = active.as_ref() {
            return Err(Error::ResolverConflict {
                active: current.name().to_string(),
                requested: resolver.name().to_string(),
            });
        }
        tracing::debug!(resolver = resolver.name(), "path resolver activated");
        *active = Some(resolver);
        return Ok(());
    }

    /// Deactivate the named strategy. Returns whether it was active.
    pub fn deactivate(&self, name: &str) -> bool {
        let mut active = self.active.write();
        if active.as_ref().is_some_and(|r| return r.name() == name) {
            *active = None;
            return true;
        }
        return false;
    }

    /// The active strategy.
    ///
    /// # Errors
    ///
    /// Returns `Error::IllegalArgument` when none is active.
    pub fn active(&self) -> Result<Arc<dyn PathResolver>, Error> {
        return self.active.read().clone().ok_or_else(|| {
            return Error::IllegalArgument { reason: "no path resolver is active".to_string() };
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> MavenLayout {
        let modules = BTreeMap::from([(String::new(), PathBuf::from(".")), ("core".to_string(), PathBuf::from("core"))]);
        return MavenLayout::new(modules, "_Itd");
    }

    #[test]
    fn source_paths_map_to_physical_ids() {
        let layout = layout();
        let id = layout.physical_type_id(Path::new("src/main/java/com/foo/Foo.java")).unwrap();
        assert_eq!(id.as_str(), "MID#physical?com.foo.Foo|SRC_MAIN_JAVA");

        let id = layout.physical_type_id(Path::new("core/src/test/java/com/foo/FooTest.java")).unwrap();
        assert_eq!(id.as_str(), "MID#physical?com.foo.FooTest|core:SRC_TEST_JAVA");
    }

    #[test]
    fn artifacts_and_foreign_files_resolve_to_nothing() {
        let layout = layout();
        assert!(layout.physical_type_id(Path::new("src/main/java/com/foo/Foo_Itd.java")).is_none());
        assert!(layout.physical_type_id(Path::new("src/main/java/com/foo/Foo_Itd.aj")).is_none());
        assert!(layout.physical_type_id(Path::new("src/main/resources/app.properties")).is_none());
        assert!(layout.physical_type_id(Path::new("docs/Example.java")).is_none());
        assert!(layout.physical_type_id(Path::new("src/main/java/com/my-pkg/Foo.java")).is_none());
    }

    #[test]
    fn types_map_back_to_paths() {
        let layout = layout();
        let path = LogicalPath::new("core", SourceRoot::SrcMainJava);
        let nested = JavaType::nested(&JavaType::new("com.foo.Foo"), "Inner");
        assert_eq!(layout.source_path(&nested, &path), Some(PathBuf::from("core/src/main/java/com/foo/Foo.java")));
        assert_eq!(
            layout.artifact_path(&JavaType::new("com.foo.Foo_Itd"), &LogicalPath::main_java()),
            Some(PathBuf::from("src/main/java/com/foo/Foo_Itd.aj"))
        );
    }

    #[test]
    fn second_strategy_is_rejected_eagerly() {
        let registry = PathResolverRegistry::new();
        assert!(registry.active().is_err());
        registry.activate(Arc::new(layout())).unwrap();
        let err = registry.activate(Arc::new(MavenLayout::single_module("_Itd"))).unwrap_err();
        assert!(matches!(err, Error::ResolverConflict { .. }));
        assert!(registry.deactivate("maven-layout"));
        assert!(registry.activate(Arc::new(layout())).is_ok());
    }
}
