//! Field, method, and constructor descriptors with their builders.

use std::fmt;
use std::ops::BitOr;

use crate::metadata::id::MetadataId;
use crate::model::annotation::{AnnotationMetadata, find_annotation};
use crate::model::custom_data::CustomData;
use crate::model::java_type::{JavaSymbolName, JavaType};

/// Java modifier keywords as a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u16);

impl Modifiers {
    /// `abstract`
    pub const ABSTRACT: Self = Self(1 << 3);
    /// `final`
    pub const FINAL: Self = Self(1 << 5);
    /// `native`
    pub const NATIVE: Self = Self(1 << 9);
    /// No modifiers (package-private).
    pub const NONE: Self = Self(0);
    /// `private`
    pub const PRIVATE: Self = Self(1 << 2);
    /// `protected`
    pub const PROTECTED: Self = Self(1 << 1);
    /// `public`
    pub const PUBLIC: Self = Self(1);
    /// `static`
    pub const STATIC: Self = Self(1 << 4);
    /// `synchronized`
    pub const SYNCHRONIZED: Self = Self(1 << 8);
    /// `transient`
    pub const TRANSIENT: Self = Self(1 << 6);
    /// `volatile`
    pub const VOLATILE: Self = Self(1 << 7);

    /// Keyword order used when rendering.
    const ORDER: [(Self, &'static str); 10] = [
        (Self::PUBLIC, "public"),
        (Self::PROTECTED, "protected"),
        (Self::PRIVATE, "private"),
        (Self::ABSTRACT, "abstract"),
        (Self::STATIC, "static"),
        (Self::FINAL, "final"),
        (Self::TRANSIENT, "transient"),
        (Self::VOLATILE, "volatile"),
        (Self::SYNCHRONIZED, "synchronized"),
        (Self::NATIVE, "native"),
    ];

    /// Whether every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        return self.0 & other.0 == other.0;
    }

    /// Parse a modifier keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        return Self::ORDER.iter().find(|(_, k)| return *k == keyword).map(|(m, _)| return *m);
    }

    /// Whether `public` is set.
    pub const fn is_public(self) -> bool {
        return self.contains(Self::PUBLIC);
    }

    /// Whether `static` is set.
    pub const fn is_static(self) -> bool {
        return self.contains(Self::STATIC);
    }

    /// Keywords in canonical order.
    pub fn keywords(self) -> Vec<&'static str> {
        return Self::ORDER
            .iter()
            .filter(|(m, _)| return self.contains(*m))
            .map(|(_, k)| return *k)
            .collect();
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        return Self(self.0 | rhs.0);
    }
}

/// Which category of member an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemberKind {
    /// A constructor; has no name.
    Constructor,
    /// A field; identified by name only.
    Field,
    /// A method; identified by name and parameter types.
    Method,
}

/// The owner-independent identity of a member inside one type.
///
/// Fields compare by name; methods by name and erased parameter types;
/// constructors by erased parameter types. Parameter names and annotations
/// never take part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberSignature {
    /// Member category.
    kind: MemberKind,
    /// Member name; `None` for constructors.
    name: Option<JavaSymbolName>,
    /// Erased parameter types; always empty for fields.
    parameter_types: Vec<JavaType>,
}

impl MemberSignature {
    /// Signature of a constructor.
    pub fn constructor(parameter_types: &[JavaType]) -> Self {
        return Self {
            kind: MemberKind::Constructor,
            name: None,
            parameter_types: parameter_types.iter().map(JavaType::erasure).collect(),
        };
    }

    /// Signature of a field.
    pub const fn field(name: JavaSymbolName) -> Self {
        return Self { kind: MemberKind::Field, name: Some(name), parameter_types: Vec::new() };
    }

    /// Signature of a method.
    pub fn method(name: JavaSymbolName, parameter_types: &[JavaType]) -> Self {
        return Self {
            kind: MemberKind::Method,
            name: Some(name),
            parameter_types: parameter_types.iter().map(JavaType::erasure).collect(),
        };
    }

    /// Member category.
    pub const fn kind(&self) -> MemberKind {
        return self.kind;
    }

    /// Member name; `None` for constructors.
    pub const fn name(&self) -> Option<&JavaSymbolName> {
        return self.name.as_ref();
    }
}

impl fmt::Display for MemberSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameter_types.iter().map(ToString::to_string).collect();
        return match (&self.kind, &self.name) {
            (MemberKind::Field, Some(name)) => write!(f, "{name}"),
            (MemberKind::Method, Some(name)) => write!(f, "{name}({})", params.join(", ")),
            _ => write!(f, "<init>({})", params.join(", ")),
        };
    }
}

/// A member signature qualified by its owning type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId {
    /// Type that declares the member.
    owner: JavaType,
    /// Identity inside the owner.
    signature: MemberSignature,
}

impl MemberId {
    /// Qualify a signature with its owner.
    pub const fn new(owner: JavaType, signature: MemberSignature) -> Self {
        return Self { owner, signature };
    }

    /// Owning type.
    pub const fn owner(&self) -> &JavaType {
        return &self.owner;
    }

    /// Identity inside the owner.
    pub const fn signature(&self) -> &MemberSignature {
        return &self.signature;
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}.{}", self.owner, self.signature);
    }
}

/// Behaviour shared by every declared member.
pub trait DeclaredMember {
    /// Annotations on the member.
    fn annotations(&self) -> &[AnnotationMetadata];

    /// Side-table tags.
    fn custom_data(&self) -> &CustomData;

    /// Metadata id of whoever declared the member: the physical type for
    /// user-written members, the requesting item for generated ones.
    fn declared_by(&self) -> &MetadataId;

    /// Modifier bitmask.
    fn modifiers(&self) -> Modifiers;

    /// Identity inside the owning type.
    fn signature(&self) -> MemberSignature;

    /// Whether an annotation of the given type is present.
    fn has_annotation(&self, annotation_type: &JavaType) -> bool {
        return find_annotation(self.annotations(), annotation_type).is_some();
    }

    /// Whether the member was written by the user rather than generated.
    fn is_user_declared(&self) -> bool {
        return self.declared_by().is_physical_type();
    }
}

/// A method or constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Annotations on the parameter.
    pub annotations: Vec<AnnotationMetadata>,
    /// Parameter name.
    pub name: JavaSymbolName,
    /// Declared type.
    pub parameter_type: JavaType,
}

impl Parameter {
    /// An unannotated parameter.
    pub const fn new(name: JavaSymbolName, parameter_type: JavaType) -> Self {
        return Self { annotations: Vec::new(), name, parameter_type };
    }
}

/// A declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMetadata {
    /// Annotations on the field.
    annotations: Vec<AnnotationMetadata>,
    /// Side-table tags.
    custom_data: CustomData,
    /// Declaring metadata id.
    declared_by: MetadataId,
    /// Field name.
    field_name: JavaSymbolName,
    /// Declared type.
    field_type: JavaType,
    /// Initializer expression text, without the `=`.
    initializer: Option<String>,
    /// Modifier bitmask.
    modifiers: Modifiers,
}

impl FieldMetadata {
    /// Field name.
    pub const fn field_name(&self) -> &JavaSymbolName {
        return &self.field_name;
    }

    /// Declared type.
    pub const fn field_type(&self) -> &JavaType {
        return &self.field_type;
    }

    /// Initializer expression text.
    pub fn initializer(&self) -> Option<&str> {
        return self.initializer.as_deref();
    }
}

impl DeclaredMember for FieldMetadata {
    fn annotations(&self) -> &[AnnotationMetadata] {
        return &self.annotations;
    }

    fn custom_data(&self) -> &CustomData {
        return &self.custom_data;
    }

    fn declared_by(&self) -> &MetadataId {
        return &self.declared_by;
    }

    fn modifiers(&self) -> Modifiers {
        return self.modifiers;
    }

    fn signature(&self) -> MemberSignature {
        return MemberSignature::field(self.field_name.clone());
    }
}

/// Mutable accumulator for a `FieldMetadata`.
#[derive(Debug, Clone)]
pub struct FieldMetadataBuilder {
    /// Annotations accumulated so far.
    annotations: Vec<AnnotationMetadata>,
    /// Side-table tags.
    custom_data: CustomData,
    /// Declaring metadata id.
    declared_by: MetadataId,
    /// Field name.
    field_name: JavaSymbolName,
    /// Declared type.
    field_type: JavaType,
    /// Initializer expression text.
    initializer: Option<String>,
    /// Modifier bitmask.
    modifiers: Modifiers,
}

impl FieldMetadataBuilder {
    /// Start a field declaration.
    pub fn new(
        declared_by: MetadataId,
        modifiers: Modifiers,
        field_name: JavaSymbolName,
        field_type: JavaType,
    ) -> Self {
        return Self {
            annotations: Vec::new(),
            custom_data: CustomData::new(),
            declared_by,
            field_name,
            field_type,
            initializer: None,
            modifiers,
        };
    }

    /// Start from an existing field.
    pub fn from_existing(existing: &FieldMetadata) -> Self {
        return Self {
            annotations: existing.annotations.clone(),
            custom_data: existing.custom_data.clone(),
            declared_by: existing.declared_by.clone(),
            field_name: existing.field_name.clone(),
            field_type: existing.field_type.clone(),
            initializer: existing.initializer.clone(),
            modifiers: existing.modifiers,
        };
    }

    /// Add an annotation unless one of the same type is already present.
    #[must_use]
    pub fn annotation(mut self, annotation: AnnotationMetadata) -> Self {
        if find_annotation(&self.annotations, annotation.annotation_type()).is_none() {
            self.annotations.push(annotation);
        }
        return self;
    }

    /// Attach a side-table tag.
    #[must_use]
    pub fn custom(mut self, key: &str, value: serde_json::Value) -> Self {
        self.custom_data.put(key, value);
        return self;
    }

    /// Set the initializer expression.
    #[must_use]
    pub fn initializer(mut self, initializer: &str) -> Self {
        self.initializer = Some(initializer.to_string());
        return self;
    }

    /// Rename the field.
    #[must_use]
    pub fn rename(mut self, field_name: JavaSymbolName) -> Self {
        self.field_name = field_name;
        return self;
    }

    /// Freeze into an immutable field.
    pub fn build(self) -> FieldMetadata {
        return FieldMetadata {
            annotations: self.annotations,
            custom_data: self.custom_data,
            declared_by: self.declared_by,
            field_name: self.field_name,
            field_type: self.field_type,
            initializer: self.initializer,
            modifiers: self.modifiers,
        };
    }
}

/// A declared method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodMetadata {
    /// Annotations on the method.
    annotations: Vec<AnnotationMetadata>,
    /// Body text without the surrounding braces; `None` for abstract methods.
    body: Option<String>,
    /// Side-table tags.
    custom_data: CustomData,
    /// Declaring metadata id.
    declared_by: MetadataId,
    /// Method name.
    method_name: JavaSymbolName,
    /// Modifier bitmask.
    modifiers: Modifiers,
    /// Parameters in order.
    parameters: Vec<Parameter>,
    /// Return type; `void` when nothing is returned.
    return_type: JavaType,
    /// Declared checked exceptions.
    throws: Vec<JavaType>,
}

impl MethodMetadata {
    /// Body text, if any.
    pub fn body(&self) -> Option<&str> {
        return self.body.as_deref();
    }

    /// Method name.
    pub const fn method_name(&self) -> &JavaSymbolName {
        return &self.method_name;
    }

    /// Parameter types in order.
    pub fn parameter_types(&self) -> Vec<JavaType> {
        return self.parameters.iter().map(|p| return p.parameter_type.clone()).collect();
    }

    /// Parameters in order.
    pub fn parameters(&self) -> &[Parameter] {
        return &self.parameters;
    }

    /// Return type.
    pub const fn return_type(&self) -> &JavaType {
        return &self.return_type;
    }

    /// Declared checked exceptions.
    pub fn throws(&self) -> &[JavaType] {
        return &self.throws;
    }
}

impl DeclaredMember for MethodMetadata {
    fn annotations(&self) -> &[AnnotationMetadata] {
        return &self.annotations;
    }

    fn custom_data(&self) -> &CustomData {
        return &self.custom_data;
    }

    fn declared_by(&self) -> &MetadataId {
        return &self.declared_by;
    }

    fn modifiers(&self) -> Modifiers {
        return self.modifiers;
    }

    fn signature(&self) -> MemberSignature {
        return MemberSignature::method(self.method_name.clone(), &self.parameter_types());
    }
}

/// Mutable accumulator for a `MethodMetadata`.
#[derive(Debug, Clone)]
pub struct MethodMetadataBuilder {
    /// Annotations accumulated so far.
    annotations: Vec<AnnotationMetadata>,
    /// Body text.
    body: Option<String>,
    /// Side-table tags.
    custom_data: CustomData,
    /// Declaring metadata id.
    declared_by: MetadataId,
    /// Method name.
    method_name: JavaSymbolName,
    /// Modifier bitmask.
    modifiers: Modifiers,
    /// Parameters in order.
    parameters: Vec<Parameter>,
    /// Return type.
    return_type: JavaType,
    /// Declared checked exceptions.
    throws: Vec<JavaType>,
}

impl MethodMetadataBuilder {
    /// Start a method declaration with no parameters and no body.
    pub const fn new(
        declared_by: MetadataId,
        modifiers: Modifiers,
        method_name: JavaSymbolName,
        return_type: JavaType,
    ) -> Self {
        return Self {
            annotations: Vec::new(),
            body: None,
            custom_data: CustomData::new(),
            declared_by,
            method_name,
            modifiers,
            parameters: Vec::new(),
            return_type,
            throws: Vec::new(),
        };
    }

    /// Add an annotation unless one of the same type is already present.
    #[must_use]
    pub fn annotation(mut self, annotation: AnnotationMetadata) -> Self {
        if find_annotation(&self.annotations, annotation.annotation_type()).is_none() {
            self.annotations.push(annotation);
        }
        return self;
    }

    /// Set the body text (without braces).
    #[must_use]
    pub fn body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        return self;
    }

    /// Attach a side-table tag.
    #[must_use]
    pub fn custom(mut self, key: &str, value: serde_json::Value) -> Self {
        self.custom_data.put(key, value);
        return self;
    }

    /// Append a parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        return self;
    }

    /// Append a declared exception.
    #[must_use]
    pub fn throws(mut self, exception: JavaType) -> Self {
        self.throws.push(exception);
        return self;
    }

    /// Freeze into an immutable method.
    pub fn build(self) -> MethodMetadata {
        return MethodMetadata {
            annotations: self.annotations,
            body: self.body,
            custom_data: self.custom_data,
            declared_by: self.declared_by,
            method_name: self.method_name,
            modifiers: self.modifiers,
            parameters: self.parameters,
            return_type: self.return_type,
            throws: self.throws,
        };
    }
}

/// A declared constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorMetadata {
    /// Annotations on the constructor.
    annotations: Vec<AnnotationMetadata>,
    /// Body text without the surrounding braces.
    body: Option<String>,
    /// Side-table tags.
    custom_data: CustomData,
    /// Declaring metadata id.
    declared_by: MetadataId,
    /// Modifier bitmask.
    modifiers: Modifiers,
    /// Parameters in order.
    parameters: Vec<Parameter>,
    /// Declared checked exceptions.
    throws: Vec<JavaType>,
}

impl ConstructorMetadata {
    /// Body text, if any.
    pub fn body(&self) -> Option<&str> {
        return self.body.as_deref();
    }

    /// Parameter types in order.
    pub fn parameter_types(&self) -> Vec<JavaType> {
        return self.parameters.iter().map(|p| return p.parameter_type.clone()).collect();
    }

    /// Parameters in order.
    pub fn parameters(&self) -> &[Parameter] {
        return &self.parameters;
    }

    /// Declared checked exceptions.
    pub fn throws(&self) -> &[JavaType] {
        return &self.throws;
    }
}

impl DeclaredMember for ConstructorMetadata {
    fn annotations(&self) -> &[AnnotationMetadata] {
        return &self.annotations;
    }

    fn custom_data(&self) -> &CustomData {
        return &self.custom_data;
    }

    fn declared_by(&self) -> &MetadataId {
        return &self.declared_by;
    }

    fn modifiers(&self) -> Modifiers {
        return self.modifiers;
    }

    fn signature(&self) -> MemberSignature {
        return MemberSignature::constructor(&self.parameter_types());
    }
}

/// Mutable accumulator for a `ConstructorMetadata`.
#[derive(Debug, Clone)]
pub struct ConstructorMetadataBuilder {
    /// Annotations accumulated so far.
    annotations: Vec<AnnotationMetadata>,
    /// Body text.
    body: Option<String>,
    /// Declaring metadata id.
    declared_by: MetadataId,
    /// Modifier bitmask.
    modifiers: Modifiers,
    /// Parameters in order.
    parameters: Vec<Parameter>,
    /// Declared checked exceptions.
    throws: Vec<JavaType>,
}

impl ConstructorMetadataBuilder {
    /// Start a constructor declaration.
    pub const fn new(declared_by: MetadataId, modifiers: Modifiers) -> Self {
        return Self {
            annotations: Vec::new(),
            body: None,
            declared_by,
            modifiers,
            parameters: Vec::new(),
            throws: Vec::new(),
        };
    }

    /// Add an annotation unless one of the same type is already present.
    #[must_use]
    pub fn annotation(mut self, annotation: AnnotationMetadata) -> Self {
        if find_annotation(&self.annotations, annotation.annotation_type()).is_none() {
            self.annotations.push(annotation);
        }
        return self;
    }

    /// Set the body text (without braces).
    #[must_use]
    pub fn body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        return self;
    }

    /// Append a parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        return self;
    }

    /// Append a declared exception.
    #[must_use]
    pub fn throws(mut self, exception: JavaType) -> Self {
        self.throws.push(exception);
        return self;
    }

    /// Freeze into an immutable constructor.
    pub fn build(self) -> ConstructorMetadata {
        return ConstructorMetadata {
            annotations: self.annotations,
            body: self.body,
            custom_data: CustomData::new(),
            declared_by: self.declared_by,
            modifiers: self.modifiers,
            parameters: self.parameters,
            throws: self.throws,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> JavaSymbolName {
        return JavaSymbolName::new(text).unwrap();
    }

    #[test]
    fn method_identity_ignores_parameter_names_and_generics() {
        let owner = MetadataId::physical_type(&JavaType::new("com.foo.Foo"), &crate::model::java_type::LogicalPath::main_java());
        let list_of_string =
            JavaType::new("java.util.List").with_parameters(vec![JavaType::string()]);
        let list_of_long =
            JavaType::new("java.util.List").with_parameters(vec![JavaType::long_object()]);

        let a = MethodMetadataBuilder::new(owner.clone(), Modifiers::PUBLIC, name("load"), JavaType::void())
            .parameter(Parameter::new(name("values"), list_of_string))
            .build();
        let b = MethodMetadataBuilder::new(owner, Modifiers::PRIVATE, name("load"), JavaType::string())
            .parameter(Parameter::new(name("other"), list_of_long))
            .build();

        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.signature().to_string(), "load(java.util.List)");
    }

    #[test]
    fn modifiers_render_in_canonical_order() {
        let mods = Modifiers::FINAL | Modifiers::STATIC | Modifiers::PRIVATE;
        assert_eq!(mods.keywords(), vec!["private", "static", "final"]);
        assert!(!mods.is_public());
        assert_eq!(Modifiers::from_keyword("volatile"), Some(Modifiers::VOLATILE));
    }
}
