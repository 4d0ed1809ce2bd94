/// Crate-level error types for itdgen diagnostics.
use std::path::PathBuf;

/// All errors in itdgen carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the type, member, metadata id, or
/// file involved in the failure.
#[allow(clippy::error_impl_error, reason = "crate-level error type shared by lib and binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two generator contributions declared the same member with incompatible shapes.
    #[error("conflicting contributions for `{member}` on {governor}: {first} and {second} disagree ({reason})")]
    ConflictingContributions {
        /// Metadata id of the contribution that declared the member first.
        first: String,
        /// Governing type the member belongs to.
        governor: String,
        /// Signature of the contested member.
        member: String,
        /// What differs between the two declarations.
        reason: String,
        /// Metadata id of the contribution that tried to redeclare it.
        second: String,
    },

    /// A member the generator relies on exists but has the wrong shape.
    #[error("contract violation on {governor}: `{member}` {reason}")]
    ContractViolation {
        /// Governing type the member belongs to.
        governor: String,
        /// Signature of the offending member.
        member: String,
        /// Description of the required shape that was not met.
        reason: String,
    },

    /// A type was built with two declarations of the same member.
    #[error("duplicate member `{member}` in {owner}")]
    DuplicateMember {
        /// Signature of the duplicated member.
        member: String,
        /// Type that declares the member twice.
        owner: String,
    },

    /// A referenced file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Source file exceeds the parser's size limit.
    #[error("file too large: {} ({size_bytes} bytes, max {max_bytes})", file.display())]
    FileTooLarge {
        /// Path to the oversized file.
        file: PathBuf,
        /// Maximum accepted size.
        max_bytes: u64,
        /// Actual size.
        size_bytes: u64,
    },

    /// A caller passed a value the operation cannot accept.
    #[error("illegal argument: {reason}")]
    IllegalArgument {
        /// Description of what was wrong with the argument.
        reason: String,
    },

    /// A metadata identifier string could not be parsed.
    #[error("invalid metadata identifier `{id}`: {reason}")]
    InvalidIdentifier {
        /// The identifier string as given.
        id: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A string is not a legal Java identifier.
    #[error("invalid Java symbol name `{name}`")]
    InvalidSymbolName {
        /// The rejected name.
        name: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// Manifest exists but cannot be parsed.
    #[error("lockfile corrupt: {reason}")]
    LockfileCorrupt {
        /// Description of the corruption.
        reason: String,
    },

    /// Expected manifest does not exist on disk.
    #[error("lockfile not found: {}", path.display())]
    LockfileNotFound {
        /// Path to the missing manifest.
        path: PathBuf,
    },

    /// No unused field name was found within the configured number of attempts.
    #[error("could not find an unused field name for `{desired}` on {governor} after {attempts} attempts")]
    NamingExhausted {
        /// Number of underscore prefixes tried.
        attempts: usize,
        /// Name the generator asked for.
        desired: String,
        /// Governing type being generated for.
        governor: String,
    },

    /// Tree-sitter failed to parse a source file.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A second path resolution strategy was activated while one is active.
    #[error("path resolver `{requested}` cannot be activated: `{active}` is already active")]
    ResolverConflict {
        /// Name of the strategy that is already active.
        active: String,
        /// Name of the strategy that was rejected.
        requested: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// TOML serialization failed.
    #[error("toml serialize: {0}")]
    TomlSer(
        /// The wrapped TOML serialization error.
        #[from]
        toml::ser::Error,
    ),

    /// No provider is registered for the kind encoded in a metadata id.
    #[error("no metadata provider registered for kind `{kind}` (id `{id}`)")]
    UnknownProvider {
        /// The metadata id that was requested.
        id: String,
        /// The kind token parsed from the id.
        kind: String,
    },

    /// The file is not Java source.
    #[error("unsupported language for extension `{ext}`")]
    UnsupportedLanguage {
        /// The file extension that has no grammar.
        ext: String,
    },

    /// The filesystem watcher could not be created or attached.
    #[error("watch: {0}")]
    Watch(
        /// The wrapped notify error.
        #[from]
        notify::Error,
    ),
}
