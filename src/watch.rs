//! File watcher: generates on startup, then feeds source changes into the
//! change dispatcher and rewrites the artifacts whose companions changed.
//!
//! The notify thread only forwards events; every metadata operation runs on
//! the calling thread.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use indexmap::{IndexMap, IndexSet};
use notify::{EventKind, RecursiveMode, Watcher as _};

use crate::artifacts::{self, PendingArtifacts};
use crate::commands;
use crate::config::Config;
use crate::diagnostics;
use crate::dispatch::FileOperation;
use crate::engine::Engine;
use crate::error::Error;
use crate::lockfile::{LOCK_FILE, Lockfile};
use crate::metadata::dependency::NotificationListener;
use crate::metadata::id::{MetadataId, ProviderKind};
use crate::project;

/// Debounce delay between filesystem events and regeneration.
const DEBOUNCE_MS: u64 = 100;

/// Map a notify event kind to a file operation; `None` for access events.
const fn classify(kind: &EventKind) -> Option<FileOperation> {
    return match *kind {
        EventKind::Create(_) => Some(FileOperation::Created),
        EventKind::Modify(_) => Some(FileOperation::Updated),
        EventKind::Remove(_) => Some(FileOperation::Deleted),
        _ => None,
    };
}

/// Create a filesystem watcher that forwards changed paths on the channel.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<(PathBuf, FileOperation)>,
) -> Result<notify::RecommendedWatcher, Error> {
    let watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        let Ok(event) = res else {
            return;
        };
        let Some(operation) = classify(&event.kind) else {
            return;
        };
        for path in event.paths {
            let _ = tx.send((path, operation));
        }
    })?;
    return Ok(watcher);
}

/// Entry point for the watch command.
///
/// Runs an initial generate, then regenerates the affected artifacts after
/// each burst of changes.
///
/// # Errors
///
/// Returns errors from manifest I/O, the initial sync, or watcher setup.
pub fn run(root: &Path, config: &Config) -> Result<ExitCode, Error> {
    let root = root.canonicalize()?;
    let lock_path = root.join(LOCK_FILE);
    let engine = commands::open(&root, config)?;
    let pending = Arc::new(PendingArtifacts::new());
    let listener: Arc<dyn NotificationListener> = Arc::<PendingArtifacts>::clone(&pending);
    let _handle = engine.registry().add_notification_listener(&listener);

    eprintln!("watch: initial generate");
    let mut lockfile = Lockfile::read_or_default(&lock_path)?;
    let ids = artifacts::tracked_ids(&engine, &lockfile)?;
    commands::print_report(&artifacts::sync(&engine, &root, &ids, &mut lockfile)?);
    lockfile.write(&lock_path)?;
    pending.take();

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    let dirs = watch_dirs(&root, config);
    for dir in &dirs {
        if dir.exists() {
            watcher.watch(dir, RecursiveMode::Recursive)?;
        }
    }
    eprintln!("watch: monitoring {} directories, press Ctrl+C to stop", dirs.len());

    while let Ok((path, operation)) = rx.recv() {
        let mut changes = IndexMap::from([(path, operation)]);
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while let Ok((path, operation)) = rx.recv_timeout(debounce) {
            changes.insert(path, operation);
        }

        let changed = dispatch_changes(&engine, &root, &changes);
        let mut ids: IndexSet<MetadataId> = changed.into_iter().collect();
        ids.extend(pending.take());
        if ids.is_empty() {
            continue;
        }
        eprintln!("watch: {} governors affected, regenerating...", ids.len());
        let ids: Vec<MetadataId> = ids.into_iter().collect();
        match artifacts::sync(&engine, &root, &ids, &mut lockfile) {
            Ok(report) => commands::print_report(&report),
            Err(e) => diagnostics::print_error(&e),
        }
        if let Err(e) = lockfile.write(&lock_path) {
            diagnostics::print_error(&e);
        }
    }

    return Ok(ExitCode::SUCCESS);
}

/// Feed each change to the dispatcher. Returns the companion ids of the
/// sources that changed, so new and deleted governors are synced even when
/// nothing was listening to them yet.
fn dispatch_changes(engine: &Engine, root: &Path, changes: &IndexMap<PathBuf, FileOperation>) -> Vec<MetadataId> {
    let mut companions = Vec::new();
    for (path, operation) in changes {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        match engine.dispatcher().on_low_level_change(relative, *operation) {
            Ok(Some(id)) => companions.push(id.with_kind(ProviderKind::COMPANION)),
            Ok(None) => {},
            Err(e) => {
                if let Some(id) = engine.resolver().ok().and_then(|r| return r.physical_type_id(relative)) {
                    companions.push(id.with_kind(ProviderKind::COMPANION));
                }
                diagnostics::print_error(&e);
            },
        }
    }
    return companions;
}

/// Module directories to watch, dropping any nested inside another.
fn watch_dirs(root: &Path, config: &Config) -> Vec<PathBuf> {
    let all: BTreeSet<PathBuf> = config.modules.values().map(|dir| return project::normalize(&root.join(dir))).collect();
    let mut kept: Vec<PathBuf> = Vec::new();
    for dir in all {
        if kept.iter().any(|outer| return dir.starts_with(outer)) {
            continue;
        }
        kept.push(dir);
    }
    return kept;
}
