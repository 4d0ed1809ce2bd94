//! Errors rendered as markdown diagnostics on stderr.

use std::fmt::Write as _;

use crate::error::Error;
use crate::freshness::{CheckResult, Finding};

/// ANSI bold.
const BOLD: &str = "\x1b[1m";
/// ANSI reset.
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is
/// one, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConflictingContributions { first, governor, member, reason, second } => {
            render_conflicting_contributions(first, governor, member, reason, second)
        },
        Error::ContractViolation { governor, member, reason } => render_contract_violation(governor, member, reason),
        Error::FileTooLarge { file, size_bytes, max_bytes } => render_file_too_large(file, *size_bytes, *max_bytes),
        Error::LockfileNotFound { .. } => render_lockfile_not_found(),
        Error::NamingExhausted { attempts, desired, governor } => render_naming_exhausted(*attempts, desired, governor),
        Error::ResolverConflict { active, requested } => render_resolver_conflict(active, requested),
        Error::UnknownProvider { id, kind } => render_unknown_provider(id, kind),
        Error::UnsupportedLanguage { ext } => render_unsupported_language(ext),
        _ => render_generic(e),
    };
}

/// Render the failing governors of a check or generate run.
pub fn render_findings(findings: &[Finding]) -> String {
    let mut out = String::new();
    for finding in findings {
        let artifact = finding.artifact.as_ref().map(|p| return p.display().to_string()).unwrap_or_default();
        match &finding.result {
            CheckResult::Broken(reason) => {
                let _ = writeln!(out, "BROKEN  {} {artifact}\n        {reason}", finding.governor);
            },
            CheckResult::Fresh => {},
            CheckResult::Stale(reason) => {
                let _ = writeln!(out, "STALE   {} {artifact} ({reason})", finding.governor);
            },
        }
    }
    return out;
}

/// Markdown for variants without a dedicated block.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::FileNotFound { path } => format!(
            "\
# Error: File Not Found

`{}` does not exist.
",
            path.display()
        ),

        Error::LockfileCorrupt { reason } => format!(
            "\
# Error: Lockfile Corrupt

{reason}

## Fix

Regenerate the manifest:

    itdgen generate
"
        ),

        Error::ParseFailed { file, reason } => format!(
            "\
# Error: Parse Failed

Could not parse `{}`: {reason}
",
            file.display()
        ),

        Error::Io(e) => format!(
            "\
# Error: I/O

{e}
"
        ),
        Error::TomlDe(e) => format!(
            "\
# Error: Invalid TOML

{e}

## Fix

Check `.itdgen.toml` and `.itdgen.lock` for typos or unknown keys.
"
        ),
        Error::Watch(e) => format!(
            "\
# Error: Watch

{e}
"
        ),
        _ => format!(
            "\
# Error

{e}
"
        ),
    };
}

/// Markdown for conflicting contributions.
fn render_conflicting_contributions(first: &str, governor: &str, member: &str, reason: &str, second: &str) -> String {
    return format!(
        "\
# Error: Conflicting Contributions

Two generators declared `{member}` on `{governor}` differently: {reason}.

## Contributors

- `{first}`
- `{second}`

## Fix

Declare `{member}` yourself in `{governor}` so neither generator adds it.
"
    );
}

/// Markdown for contract violation.
fn render_contract_violation(governor: &str, member: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Contract Violation

`{member}` in `{governor}` {reason}.

## Fix

Change the hand-written member to the required shape, or remove it and let
`itdgen generate` add it.
"
    );
}

/// Markdown for file too large.
fn render_file_too_large(file: &std::path::Path, size_bytes: u64, max_bytes: u64) -> String {
    return format!(
        "\
# Error: File Too Large

`{}` is {size_bytes} bytes (max {max_bytes}).
",
        file.display()
    );
}

/// Markdown for lockfile not found.
fn render_lockfile_not_found() -> String {
    return "\
# Error: Lockfile Not Found

`.itdgen.lock` does not exist.

## Fix

Generate the artifacts and the manifest:

    itdgen generate
"
    .to_string();
}

/// Markdown for naming exhausted.
fn render_naming_exhausted(attempts: usize, desired: &str, governor: &str) -> String {
    return format!(
        "\
# Error: Naming Exhausted

No free field name for `{desired}` on `{governor}` after {attempts} attempts.

## Fix

Rename some of the `_{desired}` fields in `{governor}`, or raise the limit in
`.itdgen.toml`:

    max_name_attempts = {}
",
        attempts.saturating_mul(2)
    );
}

/// Markdown for resolver conflict.
fn render_resolver_conflict(active: &str, requested: &str) -> String {
    return format!(
        "\
# Error: Resolver Conflict

Path resolver `{requested}` cannot be activated while `{active}` is active.

## Fix

Deactivate `{active}` first.
"
    );
}

/// Markdown for unknown provider.
fn render_unknown_provider(id: &str, kind: &str) -> String {
    return format!(
        "\
# Error: Unknown Provider

No provider is registered for kind `{kind}`.

Requested id: `{id}`
"
    );
}

/// Markdown for unsupported language.
fn render_unsupported_language(ext: &str) -> String {
    return format!(
        "\
# Error: Unsupported Language

No tree-sitter grammar for `.{ext}` files.

## Supported extensions

- `.java`
"
    );
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn naming_exhaustion_suggests_a_higher_limit() {
        let md = render_error(&Error::NamingExhausted {
            attempts: 64,
            desired: "id".to_string(),
            governor: "com.foo.Foo".to_string(),
        });
        assert!(md.starts_with("# Error: Naming Exhausted"));
        assert!(md.contains("max_name_attempts = 128"));
    }

    #[test]
    fn missing_manifest_points_at_generate() {
        let md = render_error(&Error::LockfileNotFound { path: PathBuf::from(".itdgen.lock") });
        assert!(md.contains("itdgen generate"));
    }

    #[test]
    fn findings_list_only_problems() {
        let findings = vec![
            Finding { artifact: None, governor: "com.foo.A".to_string(), result: CheckResult::Fresh },
            Finding {
                artifact: Some(PathBuf::from("src/main/java/com/foo/B_Itd.aj")),
                governor: "com.foo.B".to_string(),
                result: CheckResult::Stale("source changed"),
            },
        ];
        let out = render_findings(&findings);
        assert_eq!(out, "STALE   com.foo.B src/main/java/com/foo/B_Itd.aj (source changed)\n");
    }
}
