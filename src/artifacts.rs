//! Writing companion items to disk and keeping the manifest in step.
//!
//! The writer never decides what to generate. It receives companion ids,
//! asks the service for their current value, and makes the file system
//! agree: write when the rendered text differs, delete when the companion
//! went away, and leave the file alone when generation failed.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use parking_lot::Mutex;

use crate::engine::Engine;
use crate::error::Error;
use crate::hasher;
use crate::lockfile::{LockEntry, Lockfile};
use crate::metadata::dependency::NotificationListener;
use crate::metadata::id::{MetadataId, ProviderKind};

/// Outcome of one sync.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Governors whose generation failed; their artifacts were not touched.
    pub failures: Vec<(MetadataId, Error)>,
    /// Artifacts deleted because nothing is generated for them any more.
    pub removed: Vec<PathBuf>,
    /// Artifacts already up to date.
    pub unchanged: usize,
    /// Artifacts written.
    pub written: Vec<PathBuf>,
}

/// Collects companion ids whose value changed during a notification walk.
/// The walk itself only records; `take` hands the ids to a sync afterwards.
#[derive(Debug, Default)]
pub struct PendingArtifacts {
    /// Changed companion ids in first-seen order.
    ids: Mutex<IndexSet<MetadataId>>,
}

impl PendingArtifacts {
    /// An empty collector.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Drain the collected ids.
    pub fn take(&self) -> Vec<MetadataId> {
        return self.ids.lock().drain(..).collect();
    }
}

impl NotificationListener for PendingArtifacts {
    fn notify(&self, upstream: &MetadataId, downstream: Option<&MetadataId>) {
        if downstream.is_none() && !upstream.is_class_level() && ProviderKind::COMPANION.owns(upstream) {
            self.ids.lock().insert(upstream.clone());
        }
    }
}

/// Companion ids for every governor in the sources plus every governor
/// the manifest still tracks, so deleted sources get their artifacts
/// cleaned up.
///
/// # Errors
///
/// Listing errors; `IllegalArgument` without an active resolver.
pub fn tracked_ids(engine: &Engine, lockfile: &Lockfile) -> Result<Vec<MetadataId>, Error> {
    let resolver = engine.resolver()?;
    let mut ids: IndexSet<MetadataId> = engine.companion_ids()?.into_iter().collect();
    for entry in &lockfile.entries {
        if let Some(id) = resolver.physical_type_id(&entry.source) {
            ids.insert(id.with_kind(ProviderKind::COMPANION));
        }
    }
    return Ok(ids.into_iter().collect());
}

/// Bring the artifacts of `ids` in line with their companion items.
///
/// # Errors
///
/// I/O errors while writing or deleting artifacts and reading sources.
/// Generation errors are collected in the report instead.
pub fn sync(engine: &Engine, root: &Path, ids: &[MetadataId], lockfile: &mut Lockfile) -> Result<SyncReport, Error> {
    let resolver = engine.resolver()?;
    let mut report = SyncReport::default();

    for id in ids {
        let (Some(governor), Some(logical_path)) = (id.java_type(), id.path()) else {
            continue;
        };
        let Some(source_path) = resolver.source_path(governor, logical_path) else {
            continue;
        };
        let governor_name = governor.fully_qualified_name().to_string();

        let item = match engine.service().get(id) {
            Ok(item) => item,
            Err(err) => {
                tracing::warn!(%id, error = %err, "generation failed; artifact left untouched");
                report.failures.push((id.clone(), err));
                continue;
            },
        };
        let Some(companion) = item.as_deref().and_then(|i| return i.companion()) else {
            if let Some(entry) = lockfile.remove(&source_path, &governor_name) {
                if remove_artifact(&root.join(&entry.artifact))? {
                    report.removed.push(entry.artifact);
                }
            }
            continue;
        };
        let Some(artifact) = resolver.artifact_path(&companion.artifact_type, logical_path) else {
            continue;
        };

        let source = engine.sources().read(&source_path)?.unwrap_or_default();
        let source_hash = hasher::source_hash(&source_path, &source)?;
        if write_if_changed(&root.join(&artifact), &companion.rendered)? {
            tracing::info!(artifact = %artifact.display(), "artifact written");
            report.written.push(artifact.clone());
        } else {
            report.unchanged = report.unchanged.saturating_add(1);
        }
        lockfile.upsert(LockEntry {
            artifact,
            artifact_hash: hasher::content_hash(&companion.rendered),
            governor: governor_name,
            source: source_path,
            source_hash,
        });
    }
    return Ok(report);
}

/// Delete an artifact. Returns whether a file was removed.
fn remove_artifact(path: &Path) -> Result<bool, Error> {
    return match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(artifact = %path.display(), "artifact removed");
            Ok(true)
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::Io(e)),
    };
}

/// Write `content` unless the file already holds exactly that. Returns
/// whether the file was written.
fn write_if_changed(path: &Path, content: &str) -> Result<bool, Error> {
    match std::fs::read_to_string(path) {
        Ok(existing) if existing == content => return Ok(false),
        Ok(_) => {},
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
        Err(e) => return Err(Error::Io(e)),
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    return Ok(true);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::model::java_type::{JavaType, LogicalPath};
    use crate::project::DiskSources;

    const ENTITY: &str = "package com.foo; import javax.persistence.Entity; @Entity public class Foo { }";

    fn project(source: &str) -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().unwrap();
        let java = dir.path().join("src/main/java/com/foo");
        std::fs::create_dir_all(&java).unwrap();
        std::fs::write(java.join("Foo.java"), source).unwrap();
        let engine = Engine::new(&Config::default(), Arc::new(DiskSources::new(dir.path()))).unwrap();
        return (dir, engine);
    }

    #[test]
    fn writes_once_then_leaves_unchanged_artifacts_alone() {
        let (dir, engine) = project(ENTITY);
        let mut lockfile = Lockfile::default();
        let ids = engine.companion_ids().unwrap();

        let first = sync(&engine, dir.path(), &ids, &mut lockfile).unwrap();
        assert_eq!(first.written, vec![PathBuf::from("src/main/java/com/foo/Foo_Itd.aj")]);
        assert_eq!(lockfile.entries.len(), 1);

        let second = sync(&engine, dir.path(), &ids, &mut lockfile).unwrap();
        assert!(second.written.is_empty());
        assert_eq!(second.unchanged, 1);
    }

    #[test]
    fn artifacts_of_vanished_companions_are_removed() {
        let (dir, engine) = project(ENTITY);
        let mut lockfile = Lockfile::default();
        let ids = engine.companion_ids().unwrap();
        sync(&engine, dir.path(), &ids, &mut lockfile).unwrap();

        let source = dir.path().join("src/main/java/com/foo/Foo.java");
        std::fs::write(&source, "package com.foo; public class Foo { }").unwrap();
        engine.service().evict_all();
        let report = sync(&engine, dir.path(), &ids, &mut lockfile).unwrap();
        assert_eq!(report.removed.len(), 1);
        assert!(lockfile.entries.is_empty());
        assert!(!dir.path().join("src/main/java/com/foo/Foo_Itd.aj").exists());
    }

    #[test]
    fn pending_collects_changed_companions_only() {
        let pending = PendingArtifacts::new();
        let companion = ProviderKind::COMPANION.instance_id(&JavaType::new("com.foo.Foo"), &LogicalPath::main_java());
        let entity = ProviderKind::ENTITY.instance_id(&JavaType::new("com.foo.Foo"), &LogicalPath::main_java());
        pending.notify(&entity, None);
        pending.notify(&companion, Some(&entity));
        pending.notify(&companion, None);
        pending.notify(&companion, None);
        assert_eq!(pending.take(), vec![companion]);
        assert!(pending.take().is_empty());
    }
}
