//! Generation manifest: which artifacts were written for which governors,
//! with fingerprints of both sides at the time of writing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::hasher::Fingerprint;

/// Manifest file name at the project root.
pub const LOCK_FILE: &str = ".itdgen.lock";

/// One generated artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockEntry {
    /// Artifact path relative to the project root.
    pub artifact: PathBuf,
    /// Digest of the artifact text as written.
    pub artifact_hash: Fingerprint,
    /// Fully-qualified governor name.
    pub governor: String,
    /// Governor source path relative to the project root.
    pub source: PathBuf,
    /// Semantic digest of the governor source when the artifact was written.
    pub source_hash: Fingerprint,
}

impl Ord for LockEntry {
    /// Compare entries by (source, governor) for deterministic ordering.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        return (&self.source, &self.governor).cmp(&(&other.source, &other.governor));
    }
}

impl PartialOrd for LockEntry {
    /// Delegate to `Ord` implementation.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        return Some(self.cmp(other));
    }
}

/// The manifest as a whole. Entries are sorted by (source, governor) and
/// unique per governor source.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lockfile {
    /// The ordered entries.
    #[serde(default)]
    pub entries: Vec<LockEntry>,
}

impl Lockfile {
    /// Create a manifest from unsorted entries. Sorts and keeps the first
    /// entry per (source, governor).
    pub fn new(mut entries: Vec<LockEntry>) -> Self {
        entries.sort();
        entries.dedup_by(|a, b| return a.source == b.source && a.governor == b.governor);
        return Self { entries };
    }

    /// The entry for a governor declared in `source`.
    pub fn entry(&self, source: &Path, governor: &str) -> Option<&LockEntry> {
        return self.entries.iter().find(|e| return e.source == source && e.governor == governor);
    }

    /// Insert or replace the entry with the same (source, governor).
    pub fn upsert(&mut self, entry: LockEntry) {
        match self.entries.binary_search(&entry) {
            Ok(index) => {
                if let Some(slot) = self.entries.get_mut(index) {
                    *slot = entry;
                }
            },
            Err(index) => self.entries.insert(index, entry),
        }
    }

    /// Remove and return the entry for a governor declared in `source`.
    pub fn remove(&mut self, source: &Path, governor: &str) -> Option<LockEntry> {
        let index = self.entries.iter().position(|e| return e.source == source && e.governor == governor)?;
        return Some(self.entries.remove(index));
    }

    /// Parse a manifest from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the content is not valid TOML,
    /// or `Error::LockfileCorrupt` if entries are not strictly sorted.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let lockfile: Self = toml::from_str(content)?;
        enforce_entry_ordering(&lockfile.entries)?;
        return Ok(lockfile);
    }

    /// Read and parse a manifest from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::LockfileNotFound` if the file doesn't exist,
    /// `Error::Io` for other read failures, and the errors of `parse`.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::LockfileNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Like `read`, but a missing manifest is an empty one.
    ///
    /// # Errors
    ///
    /// As for `read`, minus `LockfileNotFound`.
    pub fn read_or_default(path: &Path) -> Result<Self, Error> {
        return match Self::read(path) {
            Err(Error::LockfileNotFound { .. }) => Ok(Self::default()),
            other => other,
        };
    }

    /// Serialize to TOML.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails.
    pub fn serialize(&self) -> Result<String, Error> {
        return Ok(toml::to_string_pretty(self)?);
    }

    /// Write the manifest to disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails,
    /// or `Error::Io` if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let content = self.serialize()?;
        std::fs::write(path, content)?;
        return Ok(());
    }
}

/// Validate that entries are strictly sorted.
///
/// # Errors
///
/// Returns `Error::LockfileCorrupt` if any adjacent pair is out of order
/// or repeated.
fn enforce_entry_ordering(entries: &[LockEntry]) -> Result<(), Error> {
    for window in entries.windows(2) {
        let (Some(first), Some(second)) = (window.first(), window.get(1)) else {
            continue;
        };
        if first >= second {
            return Err(Error::LockfileCorrupt {
                reason: format!(
                    "entries not sorted: {} {} >= {} {}",
                    first.source.display(),
                    first.governor,
                    second.source.display(),
                    second.governor,
                ),
            });
        }
    }
    return Ok(());
}
