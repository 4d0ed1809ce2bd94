//! The aggregate model of one class, interface, or enum.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Error;
use crate::metadata::id::MetadataId;
use crate::model::annotation::{AnnotationMetadata, AnnotationMetadataBuilder, find_annotation};
use crate::model::custom_data::CustomData;
use crate::model::java_type::{JavaSymbolName, JavaType};
use crate::model::member::{
    ConstructorMetadata, DeclaredMember, FieldMetadata, MemberSignature, MethodMetadata, Modifiers,
};

/// What kind of type declaration this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalTypeCategory {
    /// `@interface`
    AnnotationType,
    /// `class`
    Class,
    /// `enum`
    Enumeration,
    /// `interface`
    Interface,
}

impl PhysicalTypeCategory {
    /// The declaration keyword.
    pub const fn keyword(self) -> &'static str {
        return match self {
            Self::AnnotationType => "@interface",
            Self::Class => "class",
            Self::Enumeration => "enum",
            Self::Interface => "interface",
        };
    }
}

/// Immutable snapshot of a type and its declared members.
///
/// Member lists keep source order. The superclass, when resolved, is a
/// shared reference to the ancestor's own details rather than a copy, so
/// inherited lookups always see the ancestor's current state.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassOrInterfaceTypeDetails {
    /// Type-level annotations.
    annotations: Vec<AnnotationMetadata>,
    /// Declaration kind.
    category: PhysicalTypeCategory,
    /// Constructors in source order.
    constructors: Vec<ConstructorMetadata>,
    /// Side-table tags.
    custom_data: CustomData,
    /// Metadata id of whoever produced this type.
    declared_by: MetadataId,
    /// Enum constants in source order.
    enum_constants: Vec<JavaSymbolName>,
    /// `extends` clause; at most one entry for classes.
    extends_types: Vec<JavaType>,
    /// Fields in source order.
    fields: Vec<FieldMetadata>,
    /// `implements` clause.
    implements_types: Vec<JavaType>,
    /// Single-type imports of the compilation unit.
    imports: Vec<JavaType>,
    /// Nested type declarations.
    inner_types: Vec<ClassOrInterfaceTypeDetails>,
    /// Methods in source order.
    methods: Vec<MethodMetadata>,
    /// Modifier bitmask.
    modifiers: Modifiers,
    /// The type's name.
    name: JavaType,
    /// Resolved superclass details, if available yet.
    superclass: Option<Arc<ClassOrInterfaceTypeDetails>>,
}

impl ClassOrInterfaceTypeDetails {
    /// Type-level annotation of the given type.
    pub fn annotation(&self, annotation_type: &JavaType) -> Option<&AnnotationMetadata> {
        return find_annotation(&self.annotations, annotation_type);
    }

    /// Type-level annotations.
    pub fn annotations(&self) -> &[AnnotationMetadata] {
        return &self.annotations;
    }

    /// Superclass chain, nearest first. Stops on the first repeated type
    /// so a malformed hierarchy cannot loop.
    pub fn ancestors(&self) -> Vec<&Self> {
        let mut visited: HashSet<&JavaType> = HashSet::new();
        visited.insert(&self.name);
        let mut chain = Vec::new();
        let mut current = self.superclass.as_deref();
        while let Some(ancestor) = current {
            if !visited.insert(&ancestor.name) {
                tracing::warn!(java_type = %self.name, ancestor = %ancestor.name, "superclass cycle");
                break;
            }
            chain.push(ancestor);
            current = ancestor.superclass.as_deref();
        }
        return chain;
    }

    /// Declaration kind.
    pub const fn category(&self) -> PhysicalTypeCategory {
        return self.category;
    }

    /// Constructors in source order.
    pub fn constructors(&self) -> &[ConstructorMetadata] {
        return &self.constructors;
    }

    /// Side-table tags.
    pub const fn custom_data(&self) -> &CustomData {
        return &self.custom_data;
    }

    /// Constructor with exactly these (erased) parameter types.
    pub fn declared_constructor(&self, parameter_types: &[JavaType]) -> Option<&ConstructorMetadata> {
        let wanted = MemberSignature::constructor(parameter_types);
        return self.constructors.iter().find(|c| return c.signature() == wanted);
    }

    /// Field declared directly on this type.
    pub fn declared_field(&self, name: &JavaSymbolName) -> Option<&FieldMetadata> {
        return self.fields.iter().find(|f| return f.field_name() == name);
    }

    /// Fields declared directly on this type carrying the annotation.
    pub fn declared_fields_with_annotation(&self, annotation_type: &JavaType) -> Vec<&FieldMetadata> {
        return self.fields.iter().filter(|f| return f.has_annotation(annotation_type)).collect();
    }

    /// Method declared directly on this type with this name and (erased)
    /// parameter types.
    pub fn declared_method(
        &self,
        name: &JavaSymbolName,
        parameter_types: &[JavaType],
    ) -> Option<&MethodMetadata> {
        let wanted = MemberSignature::method(name.clone(), parameter_types);
        return self.methods.iter().find(|m| return m.signature() == wanted);
    }

    /// Metadata id of whoever produced this type.
    pub const fn declared_by(&self) -> &MetadataId {
        return &self.declared_by;
    }

    /// Enum constants in source order.
    pub fn enum_constants(&self) -> &[JavaSymbolName] {
        return &self.enum_constants;
    }

    /// `extends` clause.
    pub fn extends_types(&self) -> &[JavaType] {
        return &self.extends_types;
    }

    /// Fields in source order.
    pub fn fields(&self) -> &[FieldMetadata] {
        return &self.fields;
    }

    /// Field with this name, declared here or on an ancestor.
    pub fn find_field(&self, name: &JavaSymbolName) -> Option<&FieldMetadata> {
        return self.declared_field(name).or_else(|| {
            return self.ancestors().into_iter().find_map(|a| return a.declared_field(name));
        });
    }

    /// First field carrying the annotation, searching this type first and
    /// then each ancestor. An unresolved superclass counts as "not found".
    pub fn find_field_with_annotation(&self, annotation_type: &JavaType) -> Option<&FieldMetadata> {
        return self.find_fields_with_annotation(annotation_type).into_iter().next();
    }

    /// Every field carrying the annotation, nearest declarations first.
    pub fn find_fields_with_annotation(&self, annotation_type: &JavaType) -> Vec<&FieldMetadata> {
        let mut found = self.declared_fields_with_annotation(annotation_type);
        for ancestor in self.ancestors() {
            found.extend(ancestor.declared_fields_with_annotation(annotation_type));
        }
        return found;
    }

    /// Method with this signature, declared here or on an ancestor.
    pub fn find_method(&self, name: &JavaSymbolName, parameter_types: &[JavaType]) -> Option<&MethodMetadata> {
        return self.declared_method(name, parameter_types).or_else(|| {
            return self
                .ancestors()
                .into_iter()
                .find_map(|a| return a.declared_method(name, parameter_types));
        });
    }

    /// Whether a type-level annotation of this type is present.
    pub fn has_annotation(&self, annotation_type: &JavaType) -> bool {
        return self.annotation(annotation_type).is_some();
    }

    /// `implements` clause.
    pub fn implements_types(&self) -> &[JavaType] {
        return &self.implements_types;
    }

    /// Single-type imports.
    pub fn imports(&self) -> &[JavaType] {
        return &self.imports;
    }

    /// Nested type declarations.
    pub fn inner_types(&self) -> &[Self] {
        return &self.inner_types;
    }

    /// Methods in source order.
    pub fn methods(&self) -> &[MethodMetadata] {
        return &self.methods;
    }

    /// Modifier bitmask.
    pub const fn modifiers(&self) -> Modifiers {
        return self.modifiers;
    }

    /// The type's name.
    pub const fn name(&self) -> &JavaType {
        return &self.name;
    }

    /// Resolved superclass details.
    pub const fn superclass(&self) -> Option<&Arc<Self>> {
        return self.superclass.as_ref();
    }

    /// The declared superclass type of a class, resolved or not.
    pub fn superclass_type(&self) -> Option<&JavaType> {
        if self.category != PhysicalTypeCategory::Class {
            return None;
        }
        return self.extends_types.first();
    }
}

/// Mutable accumulator for a `ClassOrInterfaceTypeDetails`.
#[derive(Debug, Clone)]
pub struct ClassOrInterfaceTypeDetailsBuilder {
    /// Type-level annotations.
    annotations: Vec<AnnotationMetadata>,
    /// Declaration kind.
    category: PhysicalTypeCategory,
    /// Constructors added so far.
    constructors: Vec<ConstructorMetadata>,
    /// Side-table tags.
    custom_data: CustomData,
    /// Producer of the type.
    declared_by: MetadataId,
    /// Enum constants.
    enum_constants: Vec<JavaSymbolName>,
    /// `extends` clause.
    extends_types: Vec<JavaType>,
    /// Fields added so far.
    fields: Vec<FieldMetadata>,
    /// `implements` clause.
    implements_types: Vec<JavaType>,
    /// Imports.
    imports: Vec<JavaType>,
    /// Nested types.
    inner_types: Vec<ClassOrInterfaceTypeDetails>,
    /// Methods added so far.
    methods: Vec<MethodMetadata>,
    /// Modifier bitmask.
    modifiers: Modifiers,
    /// The type's name.
    name: JavaType,
    /// Resolved superclass details.
    superclass: Option<Arc<ClassOrInterfaceTypeDetails>>,
}

impl ClassOrInterfaceTypeDetailsBuilder {
    /// Start an empty type.
    pub fn new(declared_by: MetadataId, name: JavaType, category: PhysicalTypeCategory) -> Self {
        return Self {
            annotations: Vec::new(),
            category,
            constructors: Vec::new(),
            custom_data: CustomData::new(),
            declared_by,
            enum_constants: Vec::new(),
            extends_types: Vec::new(),
            fields: Vec::new(),
            implements_types: Vec::new(),
            imports: Vec::new(),
            inner_types: Vec::new(),
            methods: Vec::new(),
            modifiers: Modifiers::NONE,
            name,
            superclass: None,
        };
    }

    /// Start from an existing snapshot.
    pub fn from_existing(existing: &ClassOrInterfaceTypeDetails) -> Self {
        return Self {
            annotations: existing.annotations.clone(),
            category: existing.category,
            constructors: existing.constructors.clone(),
            custom_data: existing.custom_data.clone(),
            declared_by: existing.declared_by.clone(),
            enum_constants: existing.enum_constants.clone(),
            extends_types: existing.extends_types.clone(),
            fields: existing.fields.clone(),
            implements_types: existing.implements_types.clone(),
            imports: existing.imports.clone(),
            inner_types: existing.inner_types.clone(),
            methods: existing.methods.clone(),
            modifiers: existing.modifiers,
            name: existing.name.clone(),
            superclass: existing.superclass.clone(),
        };
    }

    /// Add a type-level annotation unless one of the same type exists.
    /// Returns whether it was added.
    pub fn add_annotation(&mut self, annotation: AnnotationMetadata) -> bool {
        if find_annotation(&self.annotations, annotation.annotation_type()).is_some() {
            return false;
        }
        self.annotations.push(annotation);
        return true;
    }

    /// Append a constructor.
    pub fn add_constructor(&mut self, constructor: ConstructorMetadata) {
        self.constructors.push(constructor);
    }

    /// Append an enum constant.
    pub fn add_enum_constant(&mut self, constant: JavaSymbolName) {
        self.enum_constants.push(constant);
    }

    /// Append to the `extends` clause.
    pub fn add_extends(&mut self, java_type: JavaType) {
        if !self.extends_types.contains(&java_type) {
            self.extends_types.push(java_type);
        }
    }

    /// Append a field.
    pub fn add_field(&mut self, field: FieldMetadata) {
        self.fields.push(field);
    }

    /// Append to the `implements` clause.
    pub fn add_implements(&mut self, java_type: JavaType) {
        if !self.implements_types.contains(&java_type) {
            self.implements_types.push(java_type);
        }
    }

    /// Record a single-type import.
    pub fn add_import(&mut self, java_type: JavaType) {
        if !self.imports.contains(&java_type) {
            self.imports.push(java_type);
        }
    }

    /// Append a nested type.
    pub fn add_inner_type(&mut self, inner: ClassOrInterfaceTypeDetails) {
        self.inner_types.push(inner);
    }

    /// Append a method.
    pub fn add_method(&mut self, method: MethodMetadata) {
        self.methods.push(method);
    }

    /// Type-level annotations accumulated so far.
    pub fn annotations(&self) -> &[AnnotationMetadata] {
        return &self.annotations;
    }

    /// Constructors accumulated so far.
    pub fn constructors(&self) -> &[ConstructorMetadata] {
        return &self.constructors;
    }

    /// Mutable side table.
    pub const fn custom_data_mut(&mut self) -> &mut CustomData {
        return &mut self.custom_data;
    }

    /// Fields accumulated so far.
    pub fn fields(&self) -> &[FieldMetadata] {
        return &self.fields;
    }

    /// Methods accumulated so far.
    pub fn methods(&self) -> &[MethodMetadata] {
        return &self.methods;
    }

    /// Replace the modifier bitmask.
    pub const fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    /// Link (or unlink) the resolved superclass.
    pub fn set_superclass(&mut self, superclass: Option<Arc<ClassOrInterfaceTypeDetails>>) {
        self.superclass = superclass;
    }

    /// Merge `newer` into the existing annotation of the same type,
    /// preserving attributes `newer` doesn't mention. `is_mutable` decides
    /// whether an existing annotation may be changed; when it refuses, the
    /// update is dropped. Adds the annotation when none exists. Returns
    /// whether anything changed.
    pub fn update_annotation(
        &mut self,
        newer: &AnnotationMetadata,
        is_mutable: &dyn Fn(&AnnotationMetadata) -> bool,
    ) -> bool {
        let position = self
            .annotations
            .iter()
            .position(|a| return a.annotation_type() == newer.annotation_type());
        let Some(index) = position else {
            self.annotations.push(newer.clone());
            return true;
        };
        let Some(existing) = self.annotations.get(index) else {
            return false;
        };
        if !is_mutable(existing) {
            return false;
        }
        let mut merged = AnnotationMetadataBuilder::from_existing(existing);
        if !merged.update_from(newer) {
            return false;
        }
        if let Some(slot) = self.annotations.get_mut(index) {
            *slot = merged.build();
        }
        return true;
    }

    /// Freeze into an immutable snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateMember` if two fields, methods, or
    /// constructors share a signature.
    pub fn build(self) -> Result<ClassOrInterfaceTypeDetails, Error> {
        let mut seen: HashSet<MemberSignature> = HashSet::new();
        let signatures = self
            .fields
            .iter()
            .map(DeclaredMember::signature)
            .chain(self.methods.iter().map(DeclaredMember::signature))
            .chain(self.constructors.iter().map(DeclaredMember::signature));
        for signature in signatures {
            if !seen.insert(signature.clone()) {
                return Err(Error::DuplicateMember {
                    member: signature.to_string(),
                    owner: self.name.to_string(),
                });
            }
        }

        return Ok(ClassOrInterfaceTypeDetails {
            annotations: self.annotations,
            category: self.category,
            constructors: self.constructors,
            custom_data: self.custom_data,
            declared_by: self.declared_by,
            enum_constants: self.enum_constants,
            extends_types: self.extends_types,
            fields: self.fields,
            implements_types: self.implements_types,
            imports: self.imports,
            inner_types: self.inner_types,
            methods: self.methods,
            modifiers: self.modifiers,
            name: self.name,
            superclass: self.superclass,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::annotation::AnnotationMetadata;
    use crate::model::java_type::LogicalPath;
    use crate::model::member::FieldMetadataBuilder;

    fn name(text: &str) -> JavaSymbolName {
        return JavaSymbolName::new(text).unwrap();
    }

    fn physical(fqn: &str) -> MetadataId {
        return MetadataId::physical_type(&JavaType::new(fqn), &LogicalPath::main_java());
    }

    fn id_annotation() -> JavaType {
        return JavaType::new("javax.persistence.Id");
    }

    fn type_with_field(fqn: &str, field: &str, annotated: bool) -> ClassOrInterfaceTypeDetailsBuilder {
        let mut builder =
            ClassOrInterfaceTypeDetailsBuilder::new(physical(fqn), JavaType::new(fqn), PhysicalTypeCategory::Class);
        let mut field =
            FieldMetadataBuilder::new(physical(fqn), Modifiers::PRIVATE, name(field), JavaType::long_object());
        if annotated {
            field = field.annotation(AnnotationMetadata::marker(id_annotation()));
        }
        builder.add_field(field.build());
        return builder;
    }

    #[test]
    fn inherited_annotation_lookup_walks_shared_superclass() {
        let base = Arc::new(type_with_field("com.foo.Base", "id", true).build().unwrap());
        let mut child = type_with_field("com.foo.Child", "name", false);
        child.add_extends(JavaType::new("com.foo.Base"));
        child.set_superclass(Some(Arc::clone(&base)));
        let child = child.build().unwrap();

        let found = child.find_field_with_annotation(&id_annotation()).unwrap();
        assert_eq!(found.field_name().as_str(), "id");
        assert_eq!(child.ancestors().len(), 1);
        assert!(Arc::ptr_eq(child.superclass().unwrap(), &base));
    }

    #[test]
    fn unresolved_superclass_means_not_found() {
        let mut child = type_with_field("com.foo.Child", "name", false);
        child.add_extends(JavaType::new("com.foo.Base"));
        let child = child.build().unwrap();

        assert!(child.find_field_with_annotation(&id_annotation()).is_none());
        assert_eq!(child.superclass_type(), Some(&JavaType::new("com.foo.Base")));
    }

    #[test]
    fn build_rejects_duplicate_fields() {
        let mut builder = type_with_field("com.foo.Foo", "id", false);
        let again = FieldMetadataBuilder::new(physical("com.foo.Foo"), Modifiers::PRIVATE, name("id"), JavaType::string());
        builder.add_field(again.build());
        assert!(matches!(builder.build(), Err(Error::DuplicateMember { .. })));
    }
}
