//! Java compilation units to type details.
//!
//! Only the declaration surface is read: package, imports, type headers,
//! and member signatures. Method bodies and initializers are kept as
//! opaque text.

use std::path::Path;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::Error;
use crate::grammar;
use crate::metadata::id::MetadataId;
use crate::model::annotation::{AnnotationMetadata, AnnotationMetadataBuilder, AnnotationValue};
use crate::model::java_type::{JavaSymbolName, JavaType, LogicalPath, Primitive};
use crate::model::member::{
    ConstructorMetadata, ConstructorMetadataBuilder, FieldMetadata, FieldMetadataBuilder, MethodMetadata,
    MethodMetadataBuilder, Modifiers, Parameter,
};
use crate::model::type_details::{
    ClassOrInterfaceTypeDetails, ClassOrInterfaceTypeDetailsBuilder, PhysicalTypeCategory,
};

/// Maximum source file size (16 MiB).
const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// One parsed `.java` file.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    /// Single-type imports.
    pub imports: Vec<JavaType>,
    /// Package name; empty for the default package.
    pub package: String,
    /// Top-level types in source order.
    pub types: Vec<ClassOrInterfaceTypeDetails>,
}

impl CompilationUnit {
    /// The top-level type with this name.
    pub fn find_type(&self, java_type: &JavaType) -> Option<&ClassOrInterfaceTypeDetails> {
        return self.types.iter().find(|t| return t.name().fully_qualified_name() == java_type.fully_qualified_name());
    }
}

/// Parse a Java source file.
///
/// # Errors
///
/// Returns `Error::FileTooLarge` past the size limit,
/// `Error::UnsupportedLanguage` for non-Java paths, and
/// `Error::ParseFailed` for syntax errors or malformed names.
pub fn parse_compilation_unit(file: &Path, source: &str, logical_path: &LogicalPath) -> Result<CompilationUnit, Error> {
    let tree = parse_source(file, source)?;
    let root = tree.root_node();
    if let Some(line) = first_error_line(root) {
        return Err(Error::ParseFailed {
            file: file.to_path_buf(),
            reason: format!("syntax error near line {line}"),
        });
    }

    let mut extractor = Extractor {
        file,
        imports: Vec::new(),
        logical_path,
        package: String::new(),
        source,
    };
    extractor.read_header(root);

    let mut types = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if category_of(child.kind()).is_some() {
            types.push(extractor.type_declaration(child, None)?);
        }
    }
    tracing::trace!(file = %file.display(), types = types.len(), "parsed compilation unit");

    return Ok(CompilationUnit { imports: extractor.imports, package: extractor.package, types });
}

/// Parse source into a tree-sitter tree. Syntax errors are left in the
/// tree for the caller to judge.
///
/// # Errors
///
/// Returns `Error::FileTooLarge` past the size limit,
/// `Error::UnsupportedLanguage` for non-Java paths, and
/// `Error::ParseFailed` if the language cannot be set or parsing fails.
pub fn parse_source(file: &Path, source: &str) -> Result<Tree, Error> {
    let source_len: u64 = source.len().try_into().unwrap_or(u64::MAX);
    if source_len > MAX_FILE_SIZE {
        return Err(Error::FileTooLarge {
            file: file.to_path_buf(),
            max_bytes: MAX_FILE_SIZE,
            size_bytes: source_len,
        });
    }
    let language: Language = grammar::language_for_path(file)?;
    let mut parser = Parser::new();
    parser.set_language(&language).map_err(|e| {
        return Error::ParseFailed { file: file.to_path_buf(), reason: e.to_string() };
    })?;

    return parser.parse(source, None).ok_or_else(|| {
        return Error::ParseFailed { file: file.to_path_buf(), reason: "tree-sitter returned None".to_string() };
    });
}

/// One-based line of the first error or missing node.
fn first_error_line(node: Node<'_>) -> Option<usize> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row.saturating_add(1));
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    return children
        .into_iter()
        .find_map(first_error_line)
        .or_else(|| return Some(node.start_position().row.saturating_add(1)));
}

/// Declaration category for a node kind.
fn category_of(kind: &str) -> Option<PhysicalTypeCategory> {
    return match kind {
        "annotation_type_declaration" => Some(PhysicalTypeCategory::AnnotationType),
        "class_declaration" => Some(PhysicalTypeCategory::Class),
        "enum_declaration" => Some(PhysicalTypeCategory::Enumeration),
        "interface_declaration" => Some(PhysicalTypeCategory::Interface),
        _ => None,
    };
}

/// Whether a named node is a comment.
fn is_comment(node: Node<'_>) -> bool {
    return matches!(node.kind(), "line_comment" | "block_comment");
}

/// Walks one compilation unit.
struct Extractor<'a> {
    /// File being parsed, for diagnostics.
    file: &'a Path,
    /// Single-type imports seen so far.
    imports: Vec<JavaType>,
    /// Logical path types are registered under.
    logical_path: &'a LogicalPath,
    /// Package of the unit.
    package: String,
    /// Full source text.
    source: &'a str,
}

impl Extractor<'_> {
    /// Source text of a node.
    fn text(&self, node: Node<'_>) -> &str {
        return node.utf8_text(self.source.as_bytes()).unwrap_or("");
    }

    /// Symbol name from a node, failing with the file for context.
    fn symbol(&self, node: Node<'_>) -> Result<JavaSymbolName, Error> {
        return JavaSymbolName::new(self.text(node)).map_err(|e| {
            return Error::ParseFailed { file: self.file.to_path_buf(), reason: e.to_string() };
        });
    }

    /// Read the package and single-type imports.
    fn read_header(&mut self, root: Node<'_>) {
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "package_declaration" => {
                    let mut inner = child.walk();
                    for part in child.named_children(&mut inner) {
                        if matches!(part.kind(), "scoped_identifier" | "identifier") {
                            self.package = self.text(part).to_string();
                        }
                    }
                },
                "import_declaration" => self.read_import(child),
                _ => {},
            }
        }
    }

    /// Record a single-type import; static and on-demand imports are skipped.
    fn read_import(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let parts: Vec<Node<'_>> = node.children(&mut cursor).collect();
        if parts.iter().any(|p| return matches!(p.kind(), "static" | "asterisk")) {
            return;
        }
        if let Some(name) = parts.iter().find(|p| return matches!(p.kind(), "scoped_identifier" | "identifier")) {
            let import = JavaType::new(self.text(*name));
            if !self.imports.contains(&import) {
                self.imports.push(import);
            }
        }
    }

    /// Resolve a name as written in source.
    fn resolve(&self, name: &str) -> JavaType {
        return JavaType::resolve_simple(name, &self.package, &self.imports);
    }

    /// Build the model for a class, interface, enum, or annotation type.
    fn type_declaration(
        &self,
        node: Node<'_>,
        enclosing: Option<&JavaType>,
    ) -> Result<ClassOrInterfaceTypeDetails, Error> {
        let category = category_of(node.kind()).ok_or_else(|| {
            return Error::ParseFailed {
                file: self.file.to_path_buf(),
                reason: format!("`{}` is not a type declaration", node.kind()),
            };
        })?;
        let name_node = node.child_by_field_name("name").ok_or_else(|| {
            return Error::ParseFailed { file: self.file.to_path_buf(), reason: "type without a name".to_string() };
        })?;
        let simple = self.symbol(name_node)?;
        let name = match enclosing {
            Some(outer) => JavaType::nested(outer, simple.as_str()),
            None if self.package.is_empty() => JavaType::new(simple.as_str()),
            None => JavaType::new(&format!("{}.{simple}", self.package)),
        };
        let declared_by = MetadataId::physical_type(&name, self.logical_path);
        let mut builder = ClassOrInterfaceTypeDetailsBuilder::new(declared_by.clone(), name.clone(), category);
        for import in &self.imports {
            builder.add_import(import.clone());
        }

        let (modifiers, annotations) = self.modifiers(node);
        builder.set_modifiers(modifiers);
        for annotation in annotations {
            builder.add_annotation(annotation);
        }

        if let Some(superclass) = node.child_by_field_name("superclass") {
            if let Some(type_node) = superclass.named_child(0) {
                builder.add_extends(self.java_type(type_node));
            }
        }
        if let Some(interfaces) = node.child_by_field_name("interfaces") {
            for java_type in self.type_list(interfaces) {
                builder.add_implements(java_type);
            }
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "extends_interfaces" {
                for java_type in self.type_list(child) {
                    builder.add_extends(java_type);
                }
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.type_body(body, &name, &declared_by, &mut builder)?;
        }

        return builder.build().map_err(|e| {
            return Error::ParseFailed { file: self.file.to_path_buf(), reason: e.to_string() };
        });
    }

    /// Types listed under an `implements` / `extends` clause.
    fn type_list(&self, clause: Node<'_>) -> Vec<JavaType> {
        let mut found = Vec::new();
        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            if child.kind() == "type_list" {
                let mut inner = child.walk();
                for type_node in child.named_children(&mut inner) {
                    found.push(self.java_type(type_node));
                }
            }
        }
        return found;
    }

    /// Members of a class, interface, enum, or annotation body.
    fn type_body(
        &self,
        body: Node<'_>,
        owner: &JavaType,
        declared_by: &MetadataId,
        builder: &mut ClassOrInterfaceTypeDetailsBuilder,
    ) -> Result<(), Error> {
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "annotation_type_element_declaration" | "method_declaration" => {
                    builder.add_method(self.method(child, declared_by)?);
                },
                "compact_constructor_declaration" | "constructor_declaration" => {
                    builder.add_constructor(self.constructor(child, declared_by)?);
                },
                "constant_declaration" | "field_declaration" => {
                    for field in self.fields(child, declared_by)? {
                        builder.add_field(field);
                    }
                },
                "enum_body_declarations" => self.type_body(child, owner, declared_by, builder)?,
                "enum_constant" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        builder.add_enum_constant(self.symbol(name)?);
                    }
                },
                kind if category_of(kind).is_some() => {
                    builder.add_inner_type(self.type_declaration(child, Some(owner))?);
                },
                _ => {},
            }
        }
        return Ok(());
    }

    /// Modifier keywords and annotations preceding a declaration.
    fn modifiers(&self, node: Node<'_>) -> (Modifiers, Vec<AnnotationMetadata>) {
        let mut modifiers = Modifiers::NONE;
        let mut annotations = Vec::new();
        let mut cursor = node.walk();
        let Some(list) = node.children(&mut cursor).find(|c| return c.kind() == "modifiers") else {
            return (modifiers, annotations);
        };
        let mut inner = list.walk();
        for child in list.children(&mut inner) {
            match child.kind() {
                "annotation" | "marker_annotation" => {
                    if let Some(annotation) = self.annotation(child) {
                        annotations.push(annotation);
                    }
                },
                keyword => {
                    if let Some(modifier) = Modifiers::from_keyword(keyword) {
                        modifiers = modifiers | modifier;
                    }
                },
            }
        }
        return (modifiers, annotations);
    }

    /// One field per declarator of `int a, b[];`.
    fn fields(&self, node: Node<'_>, declared_by: &MetadataId) -> Result<Vec<FieldMetadata>, Error> {
        let Some(type_node) = node.child_by_field_name("type") else {
            return Ok(Vec::new());
        };
        let base = self.java_type(type_node);
        let (modifiers, annotations) = self.modifiers(node);

        let mut fields = Vec::new();
        let mut cursor = node.walk();
        for declarator in node.children_by_field_name("declarator", &mut cursor) {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            let extra = declarator.child_by_field_name("dimensions").map_or(0, |d| return self.dimensions(d));
            let field_type = base.clone().with_array_dimensions(base.array_dimensions().saturating_add(extra));
            let mut field = FieldMetadataBuilder::new(declared_by.clone(), modifiers, self.symbol(name_node)?, field_type);
            for annotation in &annotations {
                field = field.annotation(annotation.clone());
            }
            if let Some(value) = declarator.child_by_field_name("value") {
                field = field.initializer(self.text(value));
            }
            fields.push(field.build());
        }
        return Ok(fields);
    }

    /// A method or annotation element.
    fn method(&self, node: Node<'_>, declared_by: &MetadataId) -> Result<MethodMetadata, Error> {
        let name_node = node.child_by_field_name("name").ok_or_else(|| {
            return Error::ParseFailed { file: self.file.to_path_buf(), reason: "method without a name".to_string() };
        })?;
        let return_type = node.child_by_field_name("type").map_or_else(JavaType::void, |t| return self.java_type(t));
        let (modifiers, annotations) = self.modifiers(node);

        let mut method = MethodMetadataBuilder::new(declared_by.clone(), modifiers, self.symbol(name_node)?, return_type);
        for annotation in annotations {
            method = method.annotation(annotation);
        }
        if let Some(parameters) = node.child_by_field_name("parameters") {
            for parameter in self.parameters(parameters)? {
                method = method.parameter(parameter);
            }
        }
        for thrown in self.throws(node) {
            method = method.throws(thrown);
        }
        if let Some(body) = node.child_by_field_name("body") {
            method = method.body(&block_body(self.text(body)));
        }
        return Ok(method.build());
    }

    /// A constructor.
    fn constructor(&self, node: Node<'_>, declared_by: &MetadataId) -> Result<ConstructorMetadata, Error> {
        let (modifiers, annotations) = self.modifiers(node);
        let mut constructor = ConstructorMetadataBuilder::new(declared_by.clone(), modifiers);
        for annotation in annotations {
            constructor = constructor.annotation(annotation);
        }
        if let Some(parameters) = node.child_by_field_name("parameters") {
            for parameter in self.parameters(parameters)? {
                constructor = constructor.parameter(parameter);
            }
        }
        for thrown in self.throws(node) {
            constructor = constructor.throws(thrown);
        }
        if let Some(body) = node.child_by_field_name("body") {
            constructor = constructor.body(&block_body(self.text(body)));
        }
        return Ok(constructor.build());
    }

    /// Formal parameters, varargs as one extra array dimension.
    fn parameters(&self, list: Node<'_>) -> Result<Vec<Parameter>, Error> {
        let mut parameters = Vec::new();
        let mut cursor = list.walk();
        for node in list.named_children(&mut cursor) {
            let (_, annotations) = self.modifiers(node);
            let (name_node, parameter_type) = match node.kind() {
                "formal_parameter" => {
                    let Some(type_node) = node.child_by_field_name("type") else {
                        continue;
                    };
                    let base = self.java_type(type_node);
                    let extra = node.child_by_field_name("dimensions").map_or(0, |d| return self.dimensions(d));
                    let dims = base.array_dimensions().saturating_add(extra);
                    (node.child_by_field_name("name"), base.with_array_dimensions(dims))
                },
                "spread_parameter" => {
                    let mut inner = node.walk();
                    let children: Vec<Node<'_>> = node.named_children(&mut inner).collect();
                    let Some(type_node) = children
                        .iter()
                        .find(|c| return !matches!(c.kind(), "modifiers" | "variable_declarator" | "identifier"))
                    else {
                        continue;
                    };
                    let base = self.java_type(*type_node);
                    let dims = base.array_dimensions().saturating_add(1);
                    let name = children.iter().find_map(|c| {
                        return match c.kind() {
                            "variable_declarator" => c.child_by_field_name("name"),
                            "identifier" => Some(*c),
                            _ => None,
                        };
                    });
                    (name, base.with_array_dimensions(dims))
                },
                _ => continue,
            };
            let Some(name_node) = name_node else {
                continue;
            };
            let mut parameter = Parameter::new(self.symbol(name_node)?, parameter_type);
            parameter.annotations = annotations;
            parameters.push(parameter);
        }
        return Ok(parameters);
    }

    /// Types in a `throws` clause.
    fn throws(&self, node: Node<'_>) -> Vec<JavaType> {
        let mut found = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "throws" {
                let mut inner = child.walk();
                for type_node in child.named_children(&mut inner) {
                    found.push(self.java_type(type_node));
                }
            }
        }
        return found;
    }

    /// Number of `[]` pairs in a dimensions node.
    fn dimensions(&self, node: Node<'_>) -> u8 {
        let count = self.text(node).matches('[').count();
        return u8::try_from(count).unwrap_or(u8::MAX);
    }

    /// Model a type node.
    fn java_type(&self, node: Node<'_>) -> JavaType {
        let text = self.text(node);
        return match node.kind() {
            "annotated_type" => {
                let mut cursor = node.walk();
                let last = node.named_children(&mut cursor).filter(|c| return !c.kind().ends_with("annotation")).last();
                last.map_or_else(|| return self.resolve(text), |t| return self.java_type(t))
            },
            "array_type" => {
                let element = node.child_by_field_name("element").map_or_else(|| return self.resolve(text), |e| return self.java_type(e));
                let extra = node.child_by_field_name("dimensions").map_or(0, |d| return self.dimensions(d));
                let dims = element.array_dimensions().saturating_add(extra);
                element.with_array_dimensions(dims)
            },
            "boolean_type" | "floating_point_type" | "integral_type" | "void_type" => {
                Primitive::from_keyword(text).map_or_else(|| return JavaType::new(text), JavaType::primitive)
            },
            "generic_type" => {
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
                let base = children
                    .iter()
                    .find(|c| return c.kind() != "type_arguments")
                    .map_or_else(|| return self.resolve(text), |b| return self.java_type(*b));
                let arguments = children
                    .iter()
                    .find(|c| return c.kind() == "type_arguments")
                    .map(|args| {
                        let mut inner = args.walk();
                        return args.named_children(&mut inner).map(|a| return self.java_type(a)).collect::<Vec<_>>();
                    })
                    .unwrap_or_default();
                base.with_parameters(arguments)
            },
            "wildcard" => JavaType::new("java.lang.Object"),
            _ => self.resolve(text),
        };
    }

    /// Model an annotation usage.
    fn annotation(&self, node: Node<'_>) -> Option<AnnotationMetadata> {
        let name_node = node.child_by_field_name("name")?;
        let mut builder = AnnotationMetadataBuilder::new(self.resolve(self.text(name_node)));
        if let Some(arguments) = node.child_by_field_name("arguments") {
            let mut cursor = arguments.walk();
            for child in arguments.named_children(&mut cursor) {
                if is_comment(child) {
                    continue;
                }
                if child.kind() == "element_value_pair" {
                    let key = child.child_by_field_name("key")?;
                    let value = child.child_by_field_name("value")?;
                    builder.set_attribute(JavaSymbolName::new(self.text(key)).ok()?, self.annotation_value(value));
                } else {
                    builder.set_attribute(JavaSymbolName::new("value").ok()?, self.annotation_value(child));
                }
            }
        }
        return Some(builder.build());
    }

    /// Model an annotation attribute value.
    fn annotation_value(&self, node: Node<'_>) -> AnnotationValue {
        let text = self.text(node);
        return match node.kind() {
            "annotation" | "marker_annotation" => self
                .annotation(node)
                .map_or_else(|| return AnnotationValue::String(text.to_string()), AnnotationValue::Nested),
            "character_literal" => {
                AnnotationValue::Char(text.trim_matches('\'').chars().next().unwrap_or_default())
            },
            "class_literal" => {
                let java_type = node.named_child(0).map_or_else(|| return self.resolve(text), |t| return self.java_type(t));
                AnnotationValue::Class(java_type)
            },
            "decimal_floating_point_literal" => text
                .trim_end_matches(['d', 'D', 'f', 'F'])
                .parse::<f64>()
                .map_or_else(|_| return AnnotationValue::String(text.to_string()), AnnotationValue::Double),
            "decimal_integer_literal" | "unary_expression" => numeric_value(text),
            "element_value_array_initializer" => {
                let mut cursor = node.walk();
                let values = node
                    .named_children(&mut cursor)
                    .filter(|c| return !is_comment(*c))
                    .map(|c| return self.annotation_value(c))
                    .collect();
                AnnotationValue::Array(values)
            },
            "false" => AnnotationValue::Boolean(false),
            "field_access" => {
                let object = node.child_by_field_name("object").map(|o| return self.text(o));
                let field = node.child_by_field_name("field").and_then(|f| return JavaSymbolName::new(self.text(f)).ok());
                match (object, field) {
                    (Some(object), Some(constant)) => AnnotationValue::Enum { constant, enum_type: self.resolve(object) },
                    _ => AnnotationValue::String(text.to_string()),
                }
            },
            "string_literal" => AnnotationValue::String(unquote(text)),
            "true" => AnnotationValue::Boolean(true),
            _ => AnnotationValue::String(text.to_string()),
        };
    }
}

/// `42` → Integer, `42L` → Long, otherwise the raw text.
fn numeric_value(text: &str) -> AnnotationValue {
    let cleaned = text.replace('_', "");
    if let Some(long) = cleaned.strip_suffix(['l', 'L']) {
        return long.parse::<i64>().map_or_else(|_| return AnnotationValue::String(text.to_string()), AnnotationValue::Long);
    }
    return cleaned.parse::<i32>().map_or_else(|_| return AnnotationValue::String(text.to_string()), AnnotationValue::Integer);
}

/// Strip quotes and the two common escapes from a string literal.
fn unquote(text: &str) -> String {
    let inner = text.strip_prefix('"').and_then(|t| return t.strip_suffix('"')).unwrap_or(text);
    return inner.replace("\\\"", "\"").replace("\\\\", "\\");
}

/// Body text between the outer braces, trimmed and dedented.
fn block_body(text: &str) -> String {
    let inner = text.trim().strip_prefix('{').and_then(|t| return t.strip_suffix('}')).unwrap_or(text);
    let lines: Vec<&str> = inner.lines().collect();
    let indent = lines
        .iter()
        .filter(|l| return !l.trim().is_empty())
        .map(|l| return l.len().saturating_sub(l.trim_start().len()))
        .min()
        .unwrap_or(0);
    let dedented: Vec<&str> = lines
        .iter()
        .map(|l| return l.get(indent..).unwrap_or_else(|| return l.trim_start()))
        .collect();
    return dedented.join("\n").trim_matches('\n').trim_end().to_string();
}
