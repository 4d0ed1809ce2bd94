//! Freshness checking: do the artifacts on disk match what generation would
//! produce now?

use std::path::{Path, PathBuf};

use crate::artifacts;
use crate::engine::Engine;
use crate::error::Error;
use crate::hasher;
use crate::lockfile::Lockfile;

/// Result of checking one governor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    /// Generation failed; the message is the rendered error.
    Broken(String),
    /// The artifact matches the current generation output.
    Fresh,
    /// The artifact differs from what would be generated.
    Stale(&'static str),
}

/// One checked governor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Artifact path relative to the project root, when one is known.
    pub artifact: Option<PathBuf>,
    /// Fully-qualified governor name.
    pub governor: String,
    /// Outcome.
    pub result: CheckResult,
}

impl Finding {
    /// Whether the governor needs attention.
    pub const fn is_fresh(&self) -> bool {
        return matches!(self.result, CheckResult::Fresh);
    }
}

/// Check every governor in the sources and every governor the manifest
/// tracks. Governors with nothing to generate and no manifest entry are
/// left out.
///
/// # Errors
///
/// Listing and artifact read errors. Generation errors become `Broken`.
pub fn check_project(engine: &Engine, root: &Path, lockfile: &Lockfile) -> Result<Vec<Finding>, Error> {
    let resolver = engine.resolver()?;
    let mut findings = Vec::new();

    for id in artifacts::tracked_ids(engine, lockfile)? {
        let (Some(governor), Some(logical_path)) = (id.java_type(), id.path()) else {
            continue;
        };
        let Some(source_path) = resolver.source_path(governor, logical_path) else {
            continue;
        };
        let governor_name = governor.fully_qualified_name().to_string();
        let entry = lockfile.entry(&source_path, &governor_name);

        let item = match engine.service().get(&id) {
            Ok(item) => item,
            Err(err) => {
                findings.push(Finding {
                    artifact: entry.map(|e| return e.artifact.clone()),
                    governor: governor_name,
                    result: CheckResult::Broken(err.to_string()),
                });
                continue;
            },
        };
        let Some(companion) = item.as_deref().and_then(|i| return i.companion()) else {
            if let Some(entry) = entry {
                findings.push(Finding {
                    artifact: Some(entry.artifact.clone()),
                    governor: governor_name,
                    result: CheckResult::Stale("artifact no longer generated"),
                });
            }
            continue;
        };
        let artifact = resolver.artifact_path(&companion.artifact_type, logical_path);
        let result = match (&artifact, entry) {
            (_, None) => CheckResult::Stale("never generated"),
            (None, Some(_)) => CheckResult::Broken("no artifact location".to_string()),
            (Some(path), Some(entry)) => compare(&root.join(path), &companion.rendered, &entry.artifact_hash)?,
        };
        findings.push(Finding { artifact, governor: governor_name, result });
    }
    return Ok(findings);
}

/// Compare the artifact on disk with the freshly rendered text.
fn compare(path: &Path, rendered: &str, recorded: &hasher::Fingerprint) -> Result<CheckResult, Error> {
    let on_disk = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(CheckResult::Stale("artifact missing"));
        },
        Err(e) => return Err(Error::Io(e)),
    };
    if on_disk == rendered {
        return Ok(CheckResult::Fresh);
    }
    if hasher::content_hash(&on_disk) != *recorded {
        return Ok(CheckResult::Stale("artifact edited by hand"));
    }
    return Ok(CheckResult::Stale("source changed"));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::project::DiskSources;

    const SOURCE: &str = "src/main/java/com/foo/Foo.java";
    const ARTIFACT: &str = "src/main/java/com/foo/Foo_Itd.aj";

    fn project(source: &str) -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/main/java/com/foo")).unwrap();
        std::fs::write(dir.path().join(SOURCE), source).unwrap();
        let engine = Engine::new(&Config::default(), Arc::new(DiskSources::new(dir.path()))).unwrap();
        return (dir, engine);
    }

    fn generated(source: &str) -> (tempfile::TempDir, Engine, Lockfile) {
        let (dir, engine) = project(source);
        let mut lockfile = Lockfile::default();
        let ids = engine.companion_ids().unwrap();
        artifacts::sync(&engine, dir.path(), &ids, &mut lockfile).unwrap();
        return (dir, engine, lockfile);
    }

    fn results(engine: &Engine, root: &Path, lockfile: &Lockfile) -> Vec<CheckResult> {
        return check_project(engine, root, lockfile).unwrap().into_iter().map(|f| return f.result).collect();
    }

    const ENTITY: &str = "package com.foo; import javax.persistence.Entity; @Entity public class Foo { }";

    #[test]
    fn generated_projects_are_fresh() {
        let (dir, engine, lockfile) = generated(ENTITY);
        assert_eq!(results(&engine, dir.path(), &lockfile), vec![CheckResult::Fresh]);
    }

    #[test]
    fn ungenerated_projects_are_stale() {
        let (dir, engine) = project(ENTITY);
        assert_eq!(results(&engine, dir.path(), &Lockfile::default()), vec![CheckResult::Stale("never generated")]);
    }

    #[test]
    fn hand_edits_and_deletions_are_reported() {
        let (dir, engine, lockfile) = generated(ENTITY);
        std::fs::write(dir.path().join(ARTIFACT), "// mine now").unwrap();
        assert_eq!(results(&engine, dir.path(), &lockfile), vec![CheckResult::Stale("artifact edited by hand")]);

        std::fs::remove_file(dir.path().join(ARTIFACT)).unwrap();
        assert_eq!(results(&engine, dir.path(), &lockfile), vec![CheckResult::Stale("artifact missing")]);
    }

    #[test]
    fn source_changes_make_artifacts_stale() {
        let (dir, engine, lockfile) = generated(ENTITY);
        std::fs::write(
            dir.path().join(SOURCE),
            "package com.foo; import javax.persistence.Entity; import org.itdgen.annotations.JavaBean; \
             @Entity @JavaBean public class Foo { private String name; }",
        )
        .unwrap();
        engine.service().evict_all();
        assert_eq!(results(&engine, dir.path(), &lockfile), vec![CheckResult::Stale("source changed")]);
    }

    #[test]
    fn plain_types_are_not_reported() {
        let (dir, engine, lockfile) = generated("package com.foo; public class Foo { }");
        assert!(check_project(&engine, dir.path(), &lockfile).unwrap().is_empty());
    }
}
