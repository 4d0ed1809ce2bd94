//! Metadata identifiers: `MID#{kind}?{JavaType}|{LogicalPath}`.
//!
//! An identifier either names a whole class of metadata (`MID#entity`) or a
//! single instance of it for one Java type (`MID#entity?com.foo.Foo|SRC_MAIN_JAVA`).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;
use crate::model::java_type::{JavaType, LogicalPath};

/// Leading token of every identifier.
pub const PREFIX: &str = "MID";

/// Separates the prefix from the kind token.
const KIND_SEPARATOR: char = '#';

/// Separates the kind token from the instance part.
const INSTANCE_SEPARATOR: char = '?';

/// Separates the Java type from the logical path.
const PATH_SEPARATOR: char = '|';

/// Valid kind tokens.
#[allow(clippy::unwrap_used, reason = "pattern is a compile-time constant")]
static KIND_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

/// Valid dotted Java type names inside an identifier.
#[allow(clippy::unwrap_used, reason = "pattern is a compile-time constant")]
static TYPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$").unwrap();
});

/// Typed tag naming a family of metadata and the provider that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderKind(&'static str);

impl ProviderKind {
    /// Persistence-style active record methods.
    pub const ACTIVE_RECORD: Self = Self("active_record");
    /// The assembled inter-type declaration for one governor.
    pub const COMPANION: Self = Self("itd");
    /// Persistent entity facts (identifier and version fields).
    pub const ENTITY: Self = Self("entity");
    /// Bean accessors and mutators.
    pub const JAVA_BEAN: Self = Self("java_bean");
    /// Parsed hand-written source types.
    pub const PHYSICAL_TYPE: Self = Self("physical");
    /// Plural names of types.
    pub const PLURAL: Self = Self("plural");

    /// A custom kind. The token must match `[a-z][a-z0-9_]*`.
    ///
    /// # Errors
    ///
    /// Returns `Error::IllegalArgument` for malformed tokens.
    pub fn custom(token: &'static str) -> Result<Self, Error> {
        if !KIND_PATTERN.is_match(token) {
            return Err(Error::IllegalArgument {
                reason: format!("invalid provider kind token `{token}`"),
            });
        }
        return Ok(Self(token));
    }

    /// The class-level identifier for this kind.
    pub fn class_id(self) -> MetadataId {
        return MetadataId::class_level(self);
    }

    /// The instance identifier for a type under this kind.
    pub fn instance_id(self, java_type: &JavaType, path: &LogicalPath) -> MetadataId {
        return MetadataId::instance(self, java_type, path);
    }

    /// Whether `id` belongs to this kind.
    pub fn owns(self, id: &MetadataId) -> bool {
        return id.kind == self.0;
    }

    /// The token embedded in identifiers.
    pub const fn token(self) -> &'static str {
        return self.0;
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.0);
    }
}

/// A parsed, canonical metadata identifier.
///
/// Equality is defined by the canonical text; the parsed parts are kept
/// alongside so callers never re-parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetadataId {
    /// Instance part; `None` for class-level identifiers.
    instance: Option<(JavaType, LogicalPath)>,
    /// Kind token.
    kind: String,
    /// Canonical textual form.
    text: String,
}

impl MetadataId {
    /// The class-level identifier for a kind.
    pub fn class_level(kind: ProviderKind) -> Self {
        return Self {
            text: format!("{PREFIX}{KIND_SEPARATOR}{}", kind.0),
            kind: kind.0.to_string(),
            instance: None,
        };
    }

    /// The identifier for one type under a kind. Generic arguments of
    /// `java_type` are dropped.
    pub fn instance(kind: ProviderKind, java_type: &JavaType, path: &LogicalPath) -> Self {
        let erased = JavaType::new(java_type.fully_qualified_name());
        return Self {
            text: format!(
                "{PREFIX}{KIND_SEPARATOR}{}{INSTANCE_SEPARATOR}{}{PATH_SEPARATOR}{path}",
                kind.0,
                erased.fully_qualified_name()
            ),
            kind: kind.0.to_string(),
            instance: Some((erased, path.clone())),
        };
    }

    /// Identifier of the hand-written source type.
    pub fn physical_type(java_type: &JavaType, path: &LogicalPath) -> Self {
        return Self::instance(ProviderKind::PHYSICAL_TYPE, java_type, path);
    }

    /// Parse an identifier string.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidIdentifier` if the string is blank, lacks the
    /// `MID#` prefix, has a malformed kind token, type name, or logical path.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| {
            return Error::InvalidIdentifier { id: text.to_string(), reason: reason.to_string() };
        };
        if text.trim().is_empty() {
            return Err(invalid("identifier is blank"));
        }
        let Some(rest) = text.strip_prefix(PREFIX).and_then(|r| return r.strip_prefix(KIND_SEPARATOR))
        else {
            return Err(invalid("missing `MID#` prefix"));
        };
        let Some((kind, instance)) = rest.split_once(INSTANCE_SEPARATOR) else {
            if !KIND_PATTERN.is_match(rest) {
                return Err(invalid("malformed kind token"));
            }
            return Ok(Self { text: text.to_string(), kind: rest.to_string(), instance: None });
        };
        if !KIND_PATTERN.is_match(kind) {
            return Err(invalid("malformed kind token"));
        }
        let Some((java_type, path)) = instance.rsplit_once(PATH_SEPARATOR) else {
            return Err(invalid("missing `|` before the logical path"));
        };
        if !TYPE_PATTERN.is_match(java_type) {
            return Err(invalid("malformed Java type"));
        }
        let path = LogicalPath::parse(path).map_err(|_err| return invalid("malformed logical path"))?;
        // Re-render so equivalent spellings of the path compare equal.
        return Ok(Self {
            text: format!("{PREFIX}{KIND_SEPARATOR}{kind}{INSTANCE_SEPARATOR}{java_type}{PATH_SEPARATOR}{path}"),
            kind: kind.to_string(),
            instance: Some((JavaType::new(java_type), path)),
        });
    }

    /// The canonical text.
    pub fn as_str(&self) -> &str {
        return &self.text;
    }

    /// The class-level identifier of this id's kind.
    pub fn class_id(&self) -> Self {
        return Self {
            text: format!("{PREFIX}{KIND_SEPARATOR}{}", self.kind),
            kind: self.kind.clone(),
            instance: None,
        };
    }

    /// Whether this names a kind rather than one instance.
    pub const fn is_class_level(&self) -> bool {
        return self.instance.is_none();
    }

    /// Whether this is the identifier of a hand-written source type.
    pub fn is_physical_type(&self) -> bool {
        return self.kind == ProviderKind::PHYSICAL_TYPE.0 && self.instance.is_some();
    }

    /// The Java type of an instance identifier.
    pub fn java_type(&self) -> Option<&JavaType> {
        return self.instance.as_ref().map(|(java_type, _)| return java_type);
    }

    /// Kind token.
    pub fn kind(&self) -> &str {
        return &self.kind;
    }

    /// The logical path of an instance identifier.
    pub fn path(&self) -> Option<&LogicalPath> {
        return self.instance.as_ref().map(|(_, path)| return path);
    }

    /// The same type and path under a different kind. Class-level ids map
    /// to the other kind's class-level id.
    pub fn with_kind(&self, kind: ProviderKind) -> Self {
        return match &self.instance {
            Some((java_type, path)) => Self::instance(kind, java_type, path),
            None => Self::class_level(kind),
        };
    }
}

impl fmt::Display for MetadataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::java_type::SourceRoot;

    #[test]
    fn instance_ids_render_and_parse_back() {
        let path = LogicalPath::new("core", SourceRoot::SrcMainJava);
        let id = MetadataId::instance(ProviderKind::ENTITY, &JavaType::new("com.foo.Foo"), &path);
        assert_eq!(id.as_str(), "MID#entity?com.foo.Foo|core:SRC_MAIN_JAVA");

        let parsed = MetadataId::parse(id.as_str()).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.java_type(), Some(&JavaType::new("com.foo.Foo")));
        assert_eq!(parsed.path(), Some(&path));
        assert!(!parsed.is_class_level());
    }

    #[test]
    fn class_level_ids_have_no_instance() {
        let id = MetadataId::parse("MID#plural").unwrap();
        assert!(id.is_class_level());
        assert_eq!(id, ProviderKind::PLURAL.class_id());
        assert!(id.java_type().is_none());
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for bad in ["", "   ", "plural", "MID:plural", "MID#Plural", "MID#plural?com.foo.Foo", "MID#plural?1com|SRC_MAIN_JAVA", "MID#plural?com.Foo|NOWHERE"] {
            assert!(
                matches!(MetadataId::parse(bad), Err(Error::InvalidIdentifier { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn providers_own_only_their_kind() {
        let id = ProviderKind::ENTITY.instance_id(&JavaType::new("a.B"), &LogicalPath::main_java());
        assert!(ProviderKind::ENTITY.owns(&id));
        assert!(!ProviderKind::PLURAL.owns(&id));
        assert_eq!(id.with_kind(ProviderKind::PLURAL).kind(), "plural");
        assert!(MetadataId::physical_type(&JavaType::new("a.B"), &LogicalPath::main_java()).is_physical_type());
    }
}
