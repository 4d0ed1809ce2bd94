//! CLI commands for itdgen: generate, check, deps.

use std::fmt::Write as _;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use crate::artifacts::{self, SyncReport};
use crate::config::Config;
use crate::diagnostics;
use crate::engine::Engine;
use crate::error::Error;
use crate::freshness::{self, CheckResult};
use crate::lockfile::{LOCK_FILE, Lockfile};
use crate::metadata::id::{MetadataId, ProviderKind};
use crate::model::java_type::{JavaType, LogicalPath};
use crate::project::DiskSources;

/// Compare every artifact with what generation would produce now.
///
/// Exit code priority: broken (2) > stale (1) > fresh (0).
///
/// # Errors
///
/// Returns errors from manifest reading, source listing, or artifact reads.
pub fn check(root: &Path, config: &Config) -> Result<ExitCode, Error> {
    let engine = open(root, config)?;
    let lockfile = Lockfile::read(&root.join(LOCK_FILE))?;
    let findings = freshness::check_project(&engine, root, &lockfile)?;
    print!("{}", diagnostics::render_findings(&findings));

    let broken = findings.iter().filter(|f| return matches!(f.result, CheckResult::Broken(_))).count();
    let stale = findings.iter().filter(|f| return matches!(f.result, CheckResult::Stale(_))).count();
    if broken > 0 {
        println!("{broken} broken, {stale} stale");
        return Ok(ExitCode::from(2));
    }
    if stale > 0 {
        println!("{stale} stale");
        eprintln!("hint: run `itdgen generate` to bring the artifacts up to date");
        return Ok(ExitCode::from(1));
    }
    println!("All {} artifacts fresh", findings.len());
    return Ok(ExitCode::SUCCESS);
}

/// Print every dependency edge touching the ids of one type.
///
/// # Errors
///
/// Returns `IllegalArgument` for a malformed logical path, and listing
/// errors. Generation errors are logged; the edges computed so far are
/// still printed.
pub fn deps(root: &Path, config: &Config, java_type: &str, logical_path: Option<&str>) -> Result<(), Error> {
    let engine = open(root, config)?;
    let logical_path = match logical_path {
        Some(text) => LogicalPath::parse(text)?,
        None => LogicalPath::main_java(),
    };
    materialize(&engine)?;
    print!("{}", describe_dependencies(&engine, &JavaType::new(java_type), &logical_path)?);
    return Ok(());
}

/// Bring every artifact in line with its governor and write the manifest.
///
/// Exits 2 when any governor failed to generate; its artifact is left as it
/// was.
///
/// # Errors
///
/// Returns errors from manifest I/O, source listing, or artifact writes.
pub fn generate(root: &Path, config: &Config) -> Result<ExitCode, Error> {
    let engine = open(root, config)?;
    let lock_path = root.join(LOCK_FILE);
    let mut lockfile = Lockfile::read_or_default(&lock_path)?;

    let ids = artifacts::tracked_ids(&engine, &lockfile)?;
    let report = artifacts::sync(&engine, root, &ids, &mut lockfile)?;
    lockfile.write(&lock_path)?;
    print_report(&report);

    if report.failures.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    return Ok(ExitCode::from(2));
}

/// An engine over the sources on disk under `root`.
///
/// # Errors
///
/// Returns provider registration errors.
pub fn open(root: &Path, config: &Config) -> Result<Engine, Error> {
    return Engine::new(config, Arc::new(DiskSources::new(root)));
}

/// Print what a sync did; failures get a full diagnostic each.
pub fn print_report(report: &SyncReport) {
    for (id, err) in &report.failures {
        eprintln!("failed: {id}");
        diagnostics::print_error(err);
    }
    for path in &report.written {
        eprintln!("wrote   {}", path.display());
    }
    for path in &report.removed {
        eprintln!("removed {}", path.display());
    }
    eprintln!(
        "{} written, {} removed, {} unchanged, {} failed",
        report.written.len(),
        report.removed.len(),
        report.unchanged,
        report.failures.len()
    );
}

/// Render the upstream and downstream ids of every kind's id for one type.
/// Class-level edges are expanded to the same type under the other kind.
fn describe_dependencies(engine: &Engine, java_type: &JavaType, logical_path: &LogicalPath) -> Result<String, Error> {
    let registry = engine.registry();
    let kinds = engine
        .service()
        .provider_kinds()
        .into_iter()
        .map(ProviderKind::custom)
        .collect::<Result<Vec<_>, _>>()?;
    let mut out = format!("# {java_type} ({logical_path})\n");

    for kind in &kinds {
        let id = kind.instance_id(java_type, logical_path);
        let mut upstream = registry.upstream(&id);
        let mut downstream = registry.downstream(&id);
        let class_upstream = registry.upstream(&kind.class_id());
        let class_downstream = registry.downstream(&kind.class_id());
        for other in &kinds {
            if class_upstream.contains(&other.class_id()) {
                upstream.push(other.instance_id(java_type, logical_path));
            }
            if class_downstream.contains(&other.class_id()) {
                downstream.push(other.instance_id(java_type, logical_path));
            }
        }
        if upstream.is_empty() && downstream.is_empty() {
            continue;
        }
        upstream.sort();
        upstream.dedup();
        downstream.sort();
        downstream.dedup();

        let _ = write!(out, "\n## {kind}\n\n{id}\n");
        write_edges(&mut out, "upstream", &upstream);
        write_edges(&mut out, "downstream", &downstream);
    }
    return Ok(out);
}

/// Compute every companion so the providers register their edges.
fn materialize(engine: &Engine) -> Result<(), Error> {
    for id in engine.companion_ids()? {
        if let Err(err) = engine.service().get(&id) {
            tracing::warn!(%id, error = %err, "generation failed");
        }
    }
    return Ok(());
}

/// Append a labelled id list.
fn write_edges(out: &mut String, label: &str, ids: &[MetadataId]) {
    if ids.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{label}:");
    for id in ids {
        let _ = writeln!(out, "- {id}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deps_shows_the_provider_chain_of_an_entity() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/main/java/com/foo")).unwrap();
        std::fs::write(
            dir.path().join("src/main/java/com/foo/Foo.java"),
            "package com.foo; import javax.persistence.Entity; @Entity public class Foo { }",
        )
        .unwrap();
        let engine = open(dir.path(), &Config::default()).unwrap();
        materialize(&engine).unwrap();

        let out = describe_dependencies(&engine, &JavaType::new("com.foo.Foo"), &LogicalPath::main_java()).unwrap();
        assert!(out.starts_with("# com.foo.Foo (SRC_MAIN_JAVA)"));
        assert!(out.contains("## entity\n\nMID#entity?com.foo.Foo|SRC_MAIN_JAVA\n"));
        assert!(out.contains("- MID#physical?com.foo.Foo|SRC_MAIN_JAVA"));
        assert!(out.contains("- MID#itd?com.foo.Foo|SRC_MAIN_JAVA"));
    }

    #[test]
    fn generate_then_check_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/main/java/com/foo")).unwrap();
        std::fs::write(
            dir.path().join("src/main/java/com/foo/Foo.java"),
            "package com.foo; import javax.persistence.Entity; @Entity public class Foo { }",
        )
        .unwrap();
        let config = Config::default();
        assert_eq!(generate(dir.path(), &config).unwrap(), ExitCode::SUCCESS);
        assert!(dir.path().join(LOCK_FILE).exists());
        assert_eq!(check(dir.path(), &config).unwrap(), ExitCode::SUCCESS);
    }
}
