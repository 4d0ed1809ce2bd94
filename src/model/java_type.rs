//! Identifier primitives: Java types, member names, and logical source paths.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

/// Java keywords that can never be used as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
    "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
    "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw",
    "throws", "transient", "true", "try", "void", "volatile", "while",
];

/// Simple names that resolve to `java.lang` without an import.
const JAVA_LANG_TYPES: &[&str] = &[
    "Boolean", "Byte", "Character", "Class", "Deprecated", "Double", "Enum", "Exception", "Float",
    "IllegalArgumentException", "IllegalStateException", "Integer", "Iterable", "Long", "Number",
    "Object", "Override", "Runnable", "RuntimeException", "Short", "String", "StringBuilder",
    "SuppressWarnings", "Throwable", "Void",
];

/// Pattern for a single Java identifier.
#[allow(clippy::unwrap_used, reason = "pattern is a compile-time constant")]
static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

/// Primitive Java types, including `void` for method return types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `char`
    Char,
    /// `double`
    Double,
    /// `float`
    Float,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `short`
    Short,
    /// `void`
    Void,
}

impl Primitive {
    /// The wrapper class used when this primitive is boxed.
    pub const fn boxed_name(self) -> &'static str {
        return match self {
            Self::Boolean => "java.lang.Boolean",
            Self::Byte => "java.lang.Byte",
            Self::Char => "java.lang.Character",
            Self::Double => "java.lang.Double",
            Self::Float => "java.lang.Float",
            Self::Int => "java.lang.Integer",
            Self::Long => "java.lang.Long",
            Self::Short => "java.lang.Short",
            Self::Void => "java.lang.Void",
        };
    }

    /// Parse a primitive keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        return match keyword {
            "boolean" => Some(Self::Boolean),
            "byte" => Some(Self::Byte),
            "char" => Some(Self::Char),
            "double" => Some(Self::Double),
            "float" => Some(Self::Float),
            "int" => Some(Self::Int),
            "long" => Some(Self::Long),
            "short" => Some(Self::Short),
            "void" => Some(Self::Void),
            _ => None,
        };
    }

    /// The Java keyword for this primitive.
    pub const fn keyword(self) -> &'static str {
        return match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Double => "double",
            Self::Float => "float",
            Self::Int => "int",
            Self::Long => "long",
            Self::Short => "short",
            Self::Void => "void",
        };
    }
}

/// A Java type reference.
///
/// Equality and hashing are structural: two values with the same
/// fully-qualified name, parameters, and array dimensions are
/// interchangeable as map keys, builder lookups, and collision checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JavaType {
    /// Number of `[]` suffixes.
    array_dimensions: u8,
    /// Enclosing type for nested types, outermost last.
    enclosing: Option<Box<JavaType>>,
    /// Dotted name, e.g. `java.util.List`. For primitives, the keyword.
    fully_qualified_name: String,
    /// Generic type arguments in declaration order.
    parameters: Vec<JavaType>,
    /// Set for primitive types and `void`.
    primitive: Option<Primitive>,
}

impl JavaType {
    /// A reference to the class with the given dotted name.
    pub fn new(fully_qualified_name: &str) -> Self {
        return Self {
            array_dimensions: 0,
            enclosing: None,
            fully_qualified_name: fully_qualified_name.to_string(),
            parameters: Vec::new(),
            primitive: None,
        };
    }

    /// A primitive type.
    pub fn primitive(primitive: Primitive) -> Self {
        return Self {
            array_dimensions: 0,
            enclosing: None,
            fully_qualified_name: primitive.keyword().to_string(),
            parameters: Vec::new(),
            primitive: Some(primitive),
        };
    }

    /// `java.lang.Long`
    pub fn long_object() -> Self {
        return Self::new("java.lang.Long");
    }

    /// `java.lang.Integer`
    pub fn int_object() -> Self {
        return Self::new("java.lang.Integer");
    }

    /// `java.lang.String`
    pub fn string() -> Self {
        return Self::new("java.lang.String");
    }

    /// `void`
    pub fn void() -> Self {
        return Self::primitive(Primitive::Void);
    }

    /// A nested type declared inside `enclosing`.
    pub fn nested(enclosing: &Self, simple_name: &str) -> Self {
        let mut nested = Self::new(&format!("{}.{simple_name}", enclosing.fully_qualified_name));
        nested.enclosing = Some(Box::new(enclosing.erasure()));
        return nested;
    }

    /// Copy of this type with the given array dimension count.
    #[must_use]
    pub fn with_array_dimensions(mut self, dimensions: u8) -> Self {
        self.array_dimensions = dimensions;
        return self;
    }

    /// Copy of this type with the given generic arguments.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<Self>) -> Self {
        self.parameters = parameters;
        return self;
    }

    /// Number of array dimensions.
    pub const fn array_dimensions(&self) -> u8 {
        return self.array_dimensions;
    }

    /// Wrapper type for primitives, or a clone of `self` otherwise.
    #[must_use]
    pub fn boxed(&self) -> Self {
        return match self.primitive {
            Some(primitive) if self.array_dimensions == 0 => Self::new(primitive.boxed_name()),
            _ => self.clone(),
        };
    }

    /// The enclosing type, when this is a nested type.
    pub fn enclosing(&self) -> Option<&Self> {
        return self.enclosing.as_deref();
    }

    /// The type with generic arguments removed; array dimensions are kept.
    #[must_use]
    pub fn erasure(&self) -> Self {
        return Self {
            array_dimensions: self.array_dimensions,
            enclosing: self.enclosing.clone(),
            fully_qualified_name: self.fully_qualified_name.clone(),
            parameters: Vec::new(),
            primitive: self.primitive,
        };
    }

    /// Dotted name without parameters or array suffix.
    pub fn fully_qualified_name(&self) -> &str {
        return &self.fully_qualified_name;
    }

    /// Whether the type lives directly in `java.lang`.
    pub fn is_java_lang(&self) -> bool {
        return self.package() == "java.lang";
    }

    /// Whether this is a primitive (including `void`) and not an array.
    pub const fn is_primitive(&self) -> bool {
        return self.primitive.is_some() && self.array_dimensions == 0;
    }

    /// Whether this is `void`.
    pub fn is_void(&self) -> bool {
        return self.primitive == Some(Primitive::Void) && self.array_dimensions == 0;
    }

    /// Package portion of the name. Empty for primitives and the default package.
    pub fn package(&self) -> String {
        if self.primitive.is_some() {
            return String::new();
        }
        let mut outermost = self;
        while let Some(enclosing) = outermost.enclosing.as_deref() {
            outermost = enclosing;
        }
        return match outermost.fully_qualified_name.rsplit_once('.') {
            Some((package, _)) => package.to_string(),
            None => String::new(),
        };
    }

    /// Generic type arguments.
    pub fn parameters(&self) -> &[Self] {
        return &self.parameters;
    }

    /// Name after the last dot, e.g. `List` for `java.util.List<String>`.
    pub fn simple_type_name(&self) -> &str {
        return match self.fully_qualified_name.rsplit_once('.') {
            Some((_, simple)) => simple,
            None => &self.fully_qualified_name,
        };
    }

    /// Name relative to the package, e.g. `Outer.Inner` for a nested type.
    pub fn name_in_package(&self) -> String {
        let package = self.package();
        if package.is_empty() {
            return self.fully_qualified_name.clone();
        }
        return self
            .fully_qualified_name
            .strip_prefix(&format!("{package}."))
            .unwrap_or(&self.fully_qualified_name)
            .to_string();
    }

    /// Render the type, asking `shorten` whether each referenced class may
    /// be written by its package-relative name.
    pub fn render_with(&self, shorten: &dyn Fn(&Self) -> bool) -> String {
        let mut out = if self.primitive.is_some() {
            self.fully_qualified_name.clone()
        } else if shorten(&self.erasure()) {
            self.name_in_package()
        } else {
            self.fully_qualified_name.clone()
        };
        if !self.parameters.is_empty() {
            let rendered: Vec<String> =
                self.parameters.iter().map(|p| return p.render_with(shorten)).collect();
            out.push('<');
            out.push_str(&rendered.join(", "));
            out.push('>');
        }
        for _ in 0..self.array_dimensions {
            out.push_str("[]");
        }
        return out;
    }

    /// Resolve a source-level simple name the way the Java compiler would
    /// for an unqualified reference: primitives, then single-type imports,
    /// then `java.lang`, then the current package.
    pub fn resolve_simple(name: &str, package: &str, imports: &[Self]) -> Self {
        if let Some(primitive) = Primitive::from_keyword(name) {
            return Self::primitive(primitive);
        }
        if name.contains('.') {
            let head = name.split('.').next().unwrap_or(name);
            if let Some(import) = imports.iter().find(|i| return i.simple_type_name() == head) {
                let rest = name.strip_prefix(head).unwrap_or("");
                return Self::new(&format!("{}{rest}", import.fully_qualified_name));
            }
            return Self::new(name);
        }
        if let Some(import) = imports.iter().find(|i| return i.simple_type_name() == name) {
            return import.clone();
        }
        if JAVA_LANG_TYPES.contains(&name) {
            return Self::new(&format!("java.lang.{name}"));
        }
        if package.is_empty() {
            return Self::new(name);
        }
        return Self::new(&format!("{package}.{name}"));
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.render_with(&|_| return false));
    }
}

/// A validated Java identifier used for member and parameter names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JavaSymbolName(String);

impl JavaSymbolName {
    /// Validate and wrap a Java identifier.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSymbolName` for empty strings, illegal
    /// characters, or reserved words.
    pub fn new(name: &str) -> Result<Self, Error> {
        if !IDENTIFIER_PATTERN.is_match(name) || RESERVED_WORDS.contains(&name) {
            return Err(Error::InvalidSymbolName { name: name.to_string() });
        }
        return Ok(Self(name.to_string()));
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        return &self.0;
    }

    /// `name` with its first character upper-cased, as used in bean accessors.
    pub fn capitalized(&self) -> String {
        let mut chars = self.0.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }

    /// Bean getter name for this property, e.g. `getId`.
    pub fn getter(&self, boolean: bool) -> Self {
        let prefix = if boolean { "is" } else { "get" };
        return Self(format!("{prefix}{}", self.capitalized()));
    }

    /// Bean setter name for this property, e.g. `setId`.
    pub fn setter(&self) -> Self {
        return Self(format!("set{}", self.capitalized()));
    }

    /// This name with `prefix` prepended. Prefixing a valid identifier with
    /// `_` always yields a valid identifier.
    #[must_use]
    pub fn with_prefix(&self, prefix: &str) -> Self {
        return Self(format!("{prefix}{}", self.0));
    }
}

impl fmt::Display for JavaSymbolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

/// Source roots a logical path can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceRoot {
    /// `src/main/java`
    SrcMainJava,
    /// `src/test/java`
    SrcTestJava,
}

impl SourceRoot {
    /// Token used inside metadata identifiers.
    pub const fn token(self) -> &'static str {
        return match self {
            Self::SrcMainJava => "SRC_MAIN_JAVA",
            Self::SrcTestJava => "SRC_TEST_JAVA",
        };
    }

    /// Directory relative to a module root.
    pub const fn directory(self) -> &'static str {
        return match self {
            Self::SrcMainJava => "src/main/java",
            Self::SrcTestJava => "src/test/java",
        };
    }

    /// Parse an identifier token.
    pub fn from_token(token: &str) -> Option<Self> {
        return match token {
            "SRC_MAIN_JAVA" => Some(Self::SrcMainJava),
            "SRC_TEST_JAVA" => Some(Self::SrcTestJava),
            _ => None,
        };
    }
}

/// Module plus source root, e.g. `core:SRC_MAIN_JAVA`. The root module has
/// an empty name and renders as just the source root token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalPath {
    /// Module name; empty for the root module.
    module: String,
    /// Source root within the module.
    root: SourceRoot,
}

impl LogicalPath {
    /// Separator between module name and source root.
    pub const MODULE_SEPARATOR: char = ':';

    /// A logical path in the given module.
    pub fn new(module: &str, root: SourceRoot) -> Self {
        return Self { module: module.to_string(), root };
    }

    /// `SRC_MAIN_JAVA` of the root module.
    pub fn main_java() -> Self {
        return Self::new("", SourceRoot::SrcMainJava);
    }

    /// Module name; empty for the root module.
    pub fn module(&self) -> &str {
        return &self.module;
    }

    /// Parse the textual form produced by `Display`.
    ///
    /// # Errors
    ///
    /// Returns `Error::IllegalArgument` for unknown roots or invalid module names.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let (module, root) = match text.rsplit_once(Self::MODULE_SEPARATOR) {
            Some((module, root)) => (module, root),
            None => ("", text),
        };
        let Some(root) = SourceRoot::from_token(root) else {
            return Err(Error::IllegalArgument {
                reason: format!("unknown source root `{root}` in logical path `{text}`"),
            });
        };
        if module.contains(['#', '?', '|']) {
            return Err(Error::IllegalArgument {
                reason: format!("module name `{module}` contains a reserved character"),
            });
        }
        return Ok(Self::new(module, root));
    }

    /// Source root within the module.
    pub const fn root(&self) -> SourceRoot {
        return self.root;
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_empty() {
            return f.write_str(self.root.token());
        }
        return write!(f, "{}{}{}", self.module, Self::MODULE_SEPARATOR, self.root.token());
    }
}
