//! Access to hand-written sources.
//!
//! Paths handed to and returned by a `SourceRepository` are relative to the
//! project root, e.g. `src/main/java/com/foo/Foo.java`. The metadata core
//! never touches the filesystem directly.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use parking_lot::RwLock;
use walkdir::WalkDir;

use crate::error::Error;
use crate::grammar;

/// Directories never descended into when listing sources.
const SKIPPED_DIRS: &[&str] = &[".git", ".idea", "build", "node_modules", "out", "target"];

/// Read-only view of the project's Java sources.
pub trait SourceRepository: Send + Sync {
    /// Every Java source file, sorted.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the listing fails.
    fn list(&self) -> Result<Vec<PathBuf>, Error>;

    /// Contents of a source file, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` for read failures other than not-found.
    fn read(&self, path: &Path) -> Result<Option<String>, Error>;
}

/// Sources on disk under a project root.
#[derive(Debug, Clone)]
pub struct DiskSources {
    /// Project root all paths are relative to.
    root: PathBuf,
}

impl DiskSources {
    /// Sources under `root`.
    pub fn new(root: &Path) -> Self {
        return Self { root: root.to_path_buf() };
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        return &self.root;
    }
}

impl SourceRepository for DiskSources {
    fn list(&self) -> Result<Vec<PathBuf>, Error> {
        let mut found = Vec::new();
        let walker = WalkDir::new(&self.root).into_iter().filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            return entry.depth() == 0 || !(entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()));
        });
        for entry in walker {
            let entry = entry.map_err(|e| return Error::Io(std::io::Error::other(e.to_string())))?;
            if !entry.file_type().is_file() || !grammar::is_java_source(entry.path()) {
                continue;
            }
            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            found.push(normalize(relative));
        }
        found.sort();
        return Ok(found);
    }

    fn read(&self, path: &Path) -> Result<Option<String>, Error> {
        return match std::fs::read_to_string(self.root.join(path)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        };
    }
}

/// Sources held in memory; used by tests and embedders.
#[derive(Debug, Default)]
pub struct InMemorySources {
    /// Path to contents.
    files: RwLock<BTreeMap<PathBuf, String>>,
}

impl InMemorySources {
    /// An empty repository.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Add or replace a file.
    pub fn put(&self, path: &str, content: &str) {
        self.files.write().insert(normalize(Path::new(path)), content.to_string());
    }

    /// Delete a file. Returns whether it existed.
    pub fn remove(&self, path: &str) -> bool {
        return self.files.write().remove(&normalize(Path::new(path))).is_some();
    }
}

impl SourceRepository for InMemorySources {
    fn list(&self) -> Result<Vec<PathBuf>, Error> {
        return Ok(self.files.read().keys().filter(|p| return grammar::is_java_source(p)).cloned().collect());
    }

    fn read(&self, path: &Path) -> Result<Option<String>, Error> {
        return Ok(self.files.read().get(&normalize(path)).cloned());
    }
}

/// Drop `.` components so `./src/Foo.java` and `src/Foo.java` agree.
pub fn normalize(path: &Path) -> PathBuf {
    return path.components().filter(|c| return !matches!(c, Component::CurDir)).collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_lists_java_only() {
        let sources = InMemorySources::new();
        sources.put("src/main/java/com/foo/Foo.java", "class Foo {}");
        sources.put("README.md", "# hi");

        assert_eq!(sources.list().unwrap(), vec![PathBuf::from("src/main/java/com/foo/Foo.java")]);
        assert!(sources.read(Path::new("./src/main/java/com/foo/Foo.java")).unwrap().is_some());
        assert!(sources.remove("src/main/java/com/foo/Foo.java"));
        assert!(sources.read(Path::new("src/main/java/com/foo/Foo.java")).unwrap().is_none());
    }

    #[test]
    fn disk_listing_skips_build_output() {
        let dir = tempfile::tempdir().unwrap();
        let java = dir.path().join("src/main/java/com/foo");
        std::fs::create_dir_all(&java).unwrap();
        std::fs::write(java.join("Foo.java"), "class Foo {}").unwrap();
        std::fs::create_dir_all(dir.path().join("target/classes")).unwrap();
        std::fs::write(dir.path().join("target/classes/Bar.java"), "class Bar {}").unwrap();

        let sources = DiskSources::new(dir.path());
        assert_eq!(sources.list().unwrap(), vec![PathBuf::from("src/main/java/com/foo/Foo.java")]);
        assert!(sources.read(Path::new("missing/Nope.java")).unwrap().is_none());
    }
}
