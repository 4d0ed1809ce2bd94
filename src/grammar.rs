/// Tree-sitter grammar resolution by file extension.
use std::path::Path;

use tree_sitter::Language;

use crate::error::Error;

/// Extension of Java compilation units.
pub const JAVA_EXTENSION: &str = "java";

/// Whether `path` names a Java compilation unit.
pub fn is_java_source(path: &Path) -> bool {
    return path.extension().and_then(|e| return e.to_str()) == Some(JAVA_EXTENSION);
}

/// Map a file extension to its tree-sitter language.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for anything but `.java`.
pub fn language_for_path(path: &Path) -> Result<Language, Error> {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

    return match ext {
        JAVA_EXTENSION => Ok(tree_sitter_java::LANGUAGE.into()),
        _ => Err(Error::UnsupportedLanguage {
            ext: ext.to_string(),
        }),
    };
}
