//! Source and artifact fingerprints.
//!
//! Sources are hashed semantically: comments and whitespace do not change
//! the fingerprint, so reformatting a governor does not mark its artifact
//! stale. Artifacts are hashed byte for byte.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use tree_sitter::Node;

use crate::error::Error;
use crate::parser;

/// Hex-encoded SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

/// Byte-exact digest of generated text.
pub fn content_hash(text: &str) -> Fingerprint {
    return Fingerprint(format!("{:x}", Sha256::digest(text.as_bytes())));
}

/// Digest of a Java source's non-comment tokens joined by single spaces.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if tree-sitter cannot parse the source and
/// `Error::UnsupportedLanguage` for non-Java paths.
pub fn source_hash(file: &Path, source: &str) -> Result<Fingerprint, Error> {
    let tree = parser::parse_source(file, source)?;
    let mut tokens = Vec::new();
    collect_tokens(tree.root_node(), source, &mut tokens);
    return Ok(content_hash(&tokens.join(" ")));
}

/// Recursively collect non-comment, non-whitespace leaf token text.
fn collect_tokens<'a>(node: Node<'a>, source: &'a str, tokens: &mut Vec<&'a str>) {
    if node.child_count() == 0 {
        if node.kind().contains("comment") {
            return;
        }
        let trimmed = source.get(node.start_byte()..node.end_byte()).unwrap_or("").trim();
        if !trimmed.is_empty() {
            tokens.push(trimmed);
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        // String literals keep their inner spacing as one token.
        if child.kind() == "string_literal" {
            if let Some(text) = source.get(child.start_byte()..child.end_byte()) {
                tokens.push(text);
            }
            continue;
        }
        collect_tokens(child, source, tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(source: &str) -> Fingerprint {
        return source_hash(Path::new("Foo.java"), source).unwrap();
    }

    #[test]
    fn comments_and_layout_do_not_matter() {
        let compact = hash("class Foo { int x; }");
        let spread = hash("// header\nclass Foo {\n    /** doc */\n    int x;\n}\n");
        assert_eq!(compact, spread);
    }

    #[test]
    fn tokens_and_string_contents_do() {
        assert_ne!(hash("class Foo { int x; }"), hash("class Foo { long x; }"));
        assert_ne!(hash("class Foo { String s = \"a b\"; }"), hash("class Foo { String s = \"a  b\"; }"));
    }

    #[test]
    fn content_hash_is_hex_sha256() {
        let digest = content_hash("");
        assert_eq!(digest.0, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }
}
