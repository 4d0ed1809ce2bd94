//! Annotation usages and their attribute values.

use indexmap::IndexMap;

use crate::model::java_type::{JavaSymbolName, JavaType};

/// A single annotation attribute value.
///
/// Array elements are expected to share a kind, but nothing enforces it;
/// producers are responsible for homogeneity.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// `{ a, b, c }`
    Array(Vec<AnnotationValue>),
    /// `true` / `false`
    Boolean(bool),
    /// `'c'`
    Char(char),
    /// `Foo.class`
    Class(JavaType),
    /// `1.5`
    Double(f64),
    /// `Kind.VALUE`
    Enum {
        /// Constant name.
        constant: JavaSymbolName,
        /// Enum type declaring the constant.
        enum_type: JavaType,
    },
    /// `42`
    Integer(i32),
    /// `42L`
    Long(i64),
    /// `@Other(...)`
    Nested(AnnotationMetadata),
    /// `"text"`
    String(String),
}

impl AnnotationValue {
    /// The string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        return match self {
            Self::String(value) => Some(value),
            _ => None,
        };
    }

    /// The boolean payload, if this is a boolean value.
    pub const fn as_bool(&self) -> Option<bool> {
        return match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        };
    }

    /// The class payload, if this is a class literal.
    pub const fn as_class(&self) -> Option<&JavaType> {
        return match self {
            Self::Class(value) => Some(value),
            _ => None,
        };
    }
}

/// An annotation applied to a type, member, or parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationMetadata {
    /// The annotation type, e.g. `javax.persistence.Entity`.
    annotation_type: JavaType,
    /// Attributes in declaration order.
    attributes: IndexMap<JavaSymbolName, AnnotationValue>,
}

impl AnnotationMetadata {
    /// A marker annotation with no attributes.
    pub fn marker(annotation_type: JavaType) -> Self {
        return Self { annotation_type, attributes: IndexMap::new() };
    }

    /// The annotation type.
    pub const fn annotation_type(&self) -> &JavaType {
        return &self.annotation_type;
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AnnotationValue> {
        return self
            .attributes
            .iter()
            .find(|(key, _)| return key.as_str() == name)
            .map(|(_, value)| return value);
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&JavaSymbolName, &AnnotationValue)> {
        return self.attributes.iter();
    }

    /// Whether the annotation has no attributes.
    pub fn is_marker(&self) -> bool {
        return self.attributes.is_empty();
    }
}

/// Mutable accumulator that produces an `AnnotationMetadata`.
#[derive(Debug, Clone)]
pub struct AnnotationMetadataBuilder {
    /// The annotation type being built.
    annotation_type: JavaType,
    /// Attributes accumulated so far.
    attributes: IndexMap<JavaSymbolName, AnnotationValue>,
}

impl AnnotationMetadataBuilder {
    /// Start building an annotation of the given type.
    pub fn new(annotation_type: JavaType) -> Self {
        return Self { annotation_type, attributes: IndexMap::new() };
    }

    /// Start from an existing annotation.
    pub fn from_existing(existing: &AnnotationMetadata) -> Self {
        return Self {
            annotation_type: existing.annotation_type.clone(),
            attributes: existing.attributes.clone(),
        };
    }

    /// Add or replace an attribute. Replacing keeps the attribute's position.
    #[must_use]
    pub fn attribute(mut self, name: JavaSymbolName, value: AnnotationValue) -> Self {
        self.attributes.insert(name, value);
        return self;
    }

    /// Add or replace an attribute in place.
    pub fn set_attribute(&mut self, name: JavaSymbolName, value: AnnotationValue) {
        self.attributes.insert(name, value);
    }

    /// Remove an attribute, returning whether it existed.
    pub fn remove_attribute(&mut self, name: &JavaSymbolName) -> bool {
        return self.attributes.shift_remove(name).is_some();
    }

    /// Apply every attribute of `newer` on top of the current attributes.
    /// Attributes not mentioned by `newer` are preserved. Returns whether
    /// anything changed.
    pub fn update_from(&mut self, newer: &AnnotationMetadata) -> bool {
        let mut changed = false;
        for (name, value) in &newer.attributes {
            if self.attributes.get(name) != Some(value) {
                self.attributes.insert(name.clone(), value.clone());
                changed = true;
            }
        }
        return changed;
    }

    /// Freeze into an immutable annotation.
    pub fn build(self) -> AnnotationMetadata {
        return AnnotationMetadata {
            annotation_type: self.annotation_type,
            attributes: self.attributes,
        };
    }
}

/// Find the first annotation of the given type.
pub fn find_annotation<'a>(
    annotations: &'a [AnnotationMetadata],
    annotation_type: &JavaType,
) -> Option<&'a AnnotationMetadata> {
    return annotations.iter().find(|a| return a.annotation_type == *annotation_type);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> JavaSymbolName {
        return JavaSymbolName::new(text).unwrap();
    }

    #[test]
    fn update_preserves_attributes_not_mentioned() {
        let table = JavaType::new("javax.persistence.Table");
        let existing = AnnotationMetadataBuilder::new(table.clone())
            .attribute(name("name"), AnnotationValue::String("foo".into()))
            .build();
        let newer = AnnotationMetadataBuilder::new(table)
            .attribute(name("schema"), AnnotationValue::String("app".into()))
            .build();

        let mut builder = AnnotationMetadataBuilder::from_existing(&existing);
        assert!(builder.update_from(&newer));
        let merged = builder.build();

        assert_eq!(merged.attribute("name").and_then(AnnotationValue::as_str), Some("foo"));
        assert_eq!(merged.attribute("schema").and_then(AnnotationValue::as_str), Some("app"));
    }

    #[test]
    fn update_with_same_values_reports_no_change() {
        let table = JavaType::new("javax.persistence.Table");
        let existing = AnnotationMetadataBuilder::new(table)
            .attribute(name("name"), AnnotationValue::String("foo".into()))
            .build();
        let mut builder = AnnotationMetadataBuilder::from_existing(&existing);
        assert!(!builder.update_from(&existing));
    }
}
