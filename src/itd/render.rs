//! AspectJ-style text for an assembled ITD.
//!
//! Output is a pure function of the ITD details, so an unchanged assembly
//! renders to identical bytes and the artifact is left alone.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::model::annotation::{AnnotationMetadata, AnnotationValue};
use crate::model::java_type::JavaType;
use crate::model::member::{ConstructorMetadata, DeclaredMember, FieldMetadata, MethodMetadata, Modifiers, Parameter};
use crate::model::type_details::ClassOrInterfaceTypeDetails;

/// First line of every generated artifact.
pub const GENERATED_HEADER: &str = "// Generated by itdgen. Do not edit; changes are overwritten.";

/// Indentation unit.
const INDENT: &str = "    ";

/// Render `itd` as the body of a privileged aspect introducing members
/// into `governor`.
pub fn render(itd: &ClassOrInterfaceTypeDetails, governor: &JavaType) -> String {
    let package = governor.package();
    let mut imports = Imports::new(&package, governor);
    collect_types(itd, &mut imports);

    let target = imports.name(governor);
    let mut body = String::new();
    for annotation in itd.annotations() {
        let _ = writeln!(body, "{INDENT}declare @type: {target}: {};", annotation_text(annotation, &imports));
        body.push('\n');
    }
    for field in itd.fields() {
        body.push_str(&field_text(field, &target, &imports));
        body.push('\n');
    }
    for constructor in itd.constructors() {
        body.push_str(&constructor_text(constructor, &target, &imports));
        body.push('\n');
    }
    for method in itd.methods() {
        body.push_str(&method_text(method, &target, &imports));
        body.push('\n');
    }

    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push('\n');
    if !package.is_empty() {
        let _ = writeln!(out, "package {package};");
    }
    out.push('\n');
    let lines = imports.lines();
    for line in &lines {
        let _ = writeln!(out, "import {line};");
    }
    if !lines.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "privileged aspect {} {{", itd.name().simple_type_name());
    out.push('\n');
    out.push_str(&body);
    out.push_str("}\n");
    return out;
}

/// Single-type imports the artifact needs, keyed by simple name.
struct Imports {
    /// Simple name → fully-qualified name.
    by_simple: BTreeMap<String, String>,
    /// Package of the governor; its types need no import.
    package: String,
}

impl Imports {
    /// Start with the governor itself reserved.
    fn new(package: &str, governor: &JavaType) -> Self {
        let mut by_simple = BTreeMap::new();
        by_simple.insert(governor.simple_type_name().to_string(), governor.fully_qualified_name().to_string());
        return Self { by_simple, package: package.to_string() };
    }

    /// Register `java_type` and its parameters. A simple name already
    /// claimed by another type stays fully qualified.
    fn register(&mut self, java_type: &JavaType) {
        for parameter in java_type.parameters() {
            self.register(parameter);
        }
        if java_type.is_primitive() || java_type.fully_qualified_name().is_empty() {
            return;
        }
        let simple = java_type.simple_type_name().to_string();
        self.by_simple.entry(simple).or_insert_with(|| return java_type.fully_qualified_name().to_string());
    }

    /// Whether `java_type` may be written unqualified.
    fn is_short(&self, java_type: &JavaType) -> bool {
        return self
            .by_simple
            .get(java_type.simple_type_name())
            .is_some_and(|fqn| return fqn == java_type.fully_qualified_name());
    }

    /// Rendered reference to `java_type`.
    fn name(&self, java_type: &JavaType) -> String {
        return java_type.render_with(&|t| return self.is_short(t));
    }

    /// Import lines, sorted, excluding `java.lang` and same-package types.
    fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .by_simple
            .values()
            .filter(|fqn| {
                let java_type = JavaType::new(fqn);
                return !java_type.is_java_lang()
                    && java_type.package() != self.package
                    && !java_type.package().is_empty();
            })
            .cloned()
            .collect();
        lines.sort();
        return lines;
    }
}

/// Register every type the ITD mentions.
fn collect_types(itd: &ClassOrInterfaceTypeDetails, imports: &mut Imports) {
    for annotation in itd.annotations() {
        collect_annotation(annotation, imports);
    }
    for field in itd.fields() {
        collect_annotations(field, imports);
        imports.register(field.field_type());
    }
    for constructor in itd.constructors() {
        collect_annotations(constructor, imports);
        collect_parameters(constructor.parameters(), imports);
        for thrown in constructor.throws() {
            imports.register(thrown);
        }
    }
    for method in itd.methods() {
        collect_annotations(method, imports);
        imports.register(method.return_type());
        collect_parameters(method.parameters(), imports);
        for thrown in method.throws() {
            imports.register(thrown);
        }
    }
}

/// Register a member's annotation types.
fn collect_annotations(member: &dyn DeclaredMember, imports: &mut Imports) {
    for annotation in member.annotations() {
        collect_annotation(annotation, imports);
    }
}

/// Register parameter and parameter-annotation types.
fn collect_parameters(parameters: &[Parameter], imports: &mut Imports) {
    for parameter in parameters {
        for annotation in &parameter.annotations {
            collect_annotation(annotation, imports);
        }
        imports.register(&parameter.parameter_type);
    }
}

/// Register an annotation type and any types inside its values.
fn collect_annotation(annotation: &AnnotationMetadata, imports: &mut Imports) {
    imports.register(annotation.annotation_type());
    for (_, value) in annotation.attributes() {
        collect_value(value, imports);
    }
}

/// Register types inside an attribute value.
fn collect_value(value: &AnnotationValue, imports: &mut Imports) {
    match value {
        AnnotationValue::Array(values) => {
            for nested in values {
                collect_value(nested, imports);
            }
        },
        AnnotationValue::Class(java_type) => imports.register(java_type),
        AnnotationValue::Enum { enum_type, .. } => imports.register(enum_type),
        AnnotationValue::Nested(annotation) => collect_annotation(annotation, imports),
        AnnotationValue::Boolean(_)
        | AnnotationValue::Char(_)
        | AnnotationValue::Double(_)
        | AnnotationValue::Integer(_)
        | AnnotationValue::Long(_)
        | AnnotationValue::String(_) => {},
    }
}

// ── Text ──

/// `@Type`, `@Type(value)` or `@Type(a = x, b = y)`.
fn annotation_text(annotation: &AnnotationMetadata, imports: &Imports) -> String {
    let name = imports.name(annotation.annotation_type());
    let attributes: Vec<(String, String)> = annotation
        .attributes()
        .map(|(key, value)| return (key.to_string(), value_text(value, imports)))
        .collect();
    return match attributes.as_slice() {
        [] => format!("@{name}"),
        [(key, value)] if key == "value" => format!("@{name}({value})"),
        _ => {
            let parts: Vec<String> = attributes.iter().map(|(k, v)| return format!("{k} = {v}")).collect();
            format!("@{name}({})", parts.join(", "))
        },
    };
}

/// Java literal for an attribute value.
fn value_text(value: &AnnotationValue, imports: &Imports) -> String {
    return match value {
        AnnotationValue::Array(values) => {
            let parts: Vec<String> = values.iter().map(|v| return value_text(v, imports)).collect();
            format!("{{{}}}", parts.join(", "))
        },
        AnnotationValue::Boolean(flag) => flag.to_string(),
        AnnotationValue::Char(c) => format!("'{}'", c.escape_default()),
        AnnotationValue::Class(java_type) => format!("{}.class", imports.name(java_type)),
        AnnotationValue::Double(number) => format!("{number:?}"),
        AnnotationValue::Enum { constant, enum_type } => format!("{}.{constant}", imports.name(enum_type)),
        AnnotationValue::Integer(number) => number.to_string(),
        AnnotationValue::Long(number) => format!("{number}L"),
        AnnotationValue::Nested(annotation) => annotation_text(annotation, imports),
        AnnotationValue::String(text) => format!("\"{}\"", text.escape_default()),
    };
}

/// Annotation lines above a member, each indented.
fn annotation_lines(member: &dyn DeclaredMember, imports: &Imports) -> String {
    let mut out = String::new();
    for annotation in member.annotations() {
        let _ = writeln!(out, "{INDENT}{}", annotation_text(annotation, imports));
    }
    return out;
}

/// `public static ` style prefix; empty for package-private.
fn modifier_prefix(modifiers: Modifiers) -> String {
    let keywords = modifiers.keywords();
    if keywords.is_empty() {
        return String::new();
    }
    return format!("{} ", keywords.join(" "));
}

/// `(@A Type name, Other other)`
fn parameter_list(parameters: &[Parameter], imports: &Imports) -> String {
    let parts: Vec<String> = parameters
        .iter()
        .map(|p| {
            let mut part = String::new();
            for annotation in &p.annotations {
                part.push_str(&annotation_text(annotation, imports));
                part.push(' ');
            }
            part.push_str(&imports.name(&p.parameter_type));
            part.push(' ');
            part.push_str(p.name.as_str());
            return part;
        })
        .collect();
    return format!("({})", parts.join(", "));
}

/// ` throws A, B` or nothing.
fn throws_clause(throws: &[JavaType], imports: &Imports) -> String {
    if throws.is_empty() {
        return String::new();
    }
    let names: Vec<String> = throws.iter().map(|t| return imports.name(t)).collect();
    return format!(" throws {}", names.join(", "));
}

/// Braced body, each line indented twice.
fn block(body: Option<&str>) -> String {
    let Some(body) = body else {
        return ";\n".to_string();
    };
    let mut out = String::from(" {\n");
    for line in body.lines() {
        if line.trim().is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, "{INDENT}{INDENT}{}", line.trim_end());
        }
    }
    let _ = writeln!(out, "{INDENT}}}");
    return out;
}

/// `private Long Foo.id;`
fn field_text(field: &FieldMetadata, target: &str, imports: &Imports) -> String {
    let mut out = annotation_lines(field, imports);
    let _ = write!(
        out,
        "{INDENT}{}{} {target}.{}",
        modifier_prefix(field.modifiers()),
        imports.name(field.field_type()),
        field.field_name()
    );
    if let Some(initializer) = field.initializer() {
        let _ = write!(out, " = {initializer}");
    }
    out.push_str(";\n");
    return out;
}

/// `public Foo.new(...) { ... }`
fn constructor_text(constructor: &ConstructorMetadata, target: &str, imports: &Imports) -> String {
    let mut out = annotation_lines(constructor, imports);
    let _ = write!(
        out,
        "{INDENT}{}{target}.new{}{}",
        modifier_prefix(constructor.modifiers()),
        parameter_list(constructor.parameters(), imports),
        throws_clause(constructor.throws(), imports)
    );
    out.push_str(&block(Some(constructor.body().unwrap_or(""))));
    return out;
}

/// `public Long Foo.getId() { ... }`
fn method_text(method: &MethodMetadata, target: &str, imports: &Imports) -> String {
    let mut out = annotation_lines(method, imports);
    let _ = write!(
        out,
        "{INDENT}{}{} {target}.{}{}{}",
        modifier_prefix(method.modifiers()),
        imports.name(method.return_type()),
        method.method_name(),
        parameter_list(method.parameters(), imports),
        throws_clause(method.throws(), imports)
    );
    out.push_str(&block(method.body()));
    return out;
}
