//! Per-provider member requests against a governor.
//!
//! A provider asks for the members it needs; the builder decides for each
//! request whether the user already wrote it, an ancestor or an earlier
//! contribution already supplies it, or it must be generated. The outcome
//! of a build is a `Contribution`: the generated members only.

use std::sync::Arc;

use crate::error::Error;
use crate::metadata::id::MetadataId;
use crate::model::annotation::AnnotationMetadata;
use crate::model::custom_data::CustomData;
use crate::model::java_type::{JavaSymbolName, JavaType};
use crate::model::member::{
    ConstructorMetadata, DeclaredMember, FieldMetadata, MemberSignature, MethodMetadata,
};
use crate::model::type_details::ClassOrInterfaceTypeDetails;

/// Default cap on `_` prefixes tried by `unique_field_name`.
pub const DEFAULT_MAX_NAME_ATTEMPTS: usize = 64;

/// The generated members one provider contributes to one governor.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    /// Merges into existing generated type-level annotations.
    pub annotation_updates: Vec<AnnotationMetadata>,
    /// New type-level annotations.
    pub annotations: Vec<AnnotationMetadata>,
    /// Generated constructors in request order.
    pub constructors: Vec<ConstructorMetadata>,
    /// Facts published for later providers in the chain.
    pub custom_data: CustomData,
    /// Metadata id of the contributing item.
    pub declared_by: MetadataId,
    /// Generated fields in request order.
    pub fields: Vec<FieldMetadata>,
    /// Type the members are introduced into.
    pub governor: JavaType,
    /// Generated methods in request order.
    pub methods: Vec<MethodMetadata>,
}

impl Contribution {
    /// Whether the contribution adds nothing at all.
    pub fn is_empty(&self) -> bool {
        return self.annotation_updates.is_empty()
            && self.annotations.is_empty()
            && self.constructors.is_empty()
            && self.fields.is_empty()
            && self.methods.is_empty();
    }
}

/// How a member request was satisfied.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<M> {
    /// Not present anywhere; the requested member was generated.
    Added(M),
    /// An earlier contribution already declared a compatible member.
    Existing(M),
    /// An ancestor declares the member; nothing is re-declared.
    Inherited(M),
    /// The user wrote the member; the request was dropped.
    User(M),
}

impl<M> Resolution<M> {
    /// The member that satisfies the request.
    pub const fn member(&self) -> &M {
        return match self {
            Self::Added(m) | Self::Existing(m) | Self::Inherited(m) | Self::User(m) => m,
        };
    }

    /// Whether the request produced a new generated member.
    pub const fn is_added(&self) -> bool {
        return matches!(self, Self::Added(_));
    }
}

/// Shape a provider relies on when it accepts an existing member in place
/// of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberRequirement {
    /// Required field type or method return type, compared by erasure.
    member_type: Option<JavaType>,
    /// Whether the member must be `public`.
    public: bool,
}

impl MemberRequirement {
    /// No constraints.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Require a field type or return type.
    #[must_use]
    pub fn of_type(mut self, member_type: JavaType) -> Self {
        self.member_type = Some(member_type);
        return self;
    }

    /// Require `public` visibility.
    #[must_use]
    pub const fn public(mut self) -> Self {
        self.public = true;
        return self;
    }

    /// Why `member` fails the requirement, if it does.
    fn violation(&self, member: &dyn DeclaredMember, member_type: Option<&JavaType>) -> Option<String> {
        if self.public && !member.modifiers().is_public() {
            return Some("must be public".to_string());
        }
        if let (Some(required), Some(actual)) = (&self.member_type, member_type) {
            if required.erasure() != actual.erasure() {
                return Some(format!("must have type {required} but has {actual}"));
            }
        }
        return None;
    }
}

/// Collects one provider's member requests for one governor.
///
/// `governor` is the accumulated view: the user's type plus everything
/// contributed earlier in the provider chain, linked to its superclass.
#[derive(Debug)]
pub struct ItdTypeDetailsBuilder {
    /// Requests accepted so far.
    contribution: Contribution,
    /// Accumulated view the requests are checked against.
    governor: Arc<ClassOrInterfaceTypeDetails>,
    /// Cap on `_` prefixes for `unique_field_name`.
    max_name_attempts: usize,
}

impl ItdTypeDetailsBuilder {
    /// Start collecting requests on behalf of `declared_by`.
    pub fn new(declared_by: MetadataId, governor: Arc<ClassOrInterfaceTypeDetails>, max_name_attempts: usize) -> Self {
        return Self {
            contribution: Contribution {
                annotation_updates: Vec::new(),
                annotations: Vec::new(),
                constructors: Vec::new(),
                custom_data: CustomData::new(),
                declared_by,
                fields: Vec::new(),
                governor: governor.name().clone(),
                methods: Vec::new(),
            },
            governor,
            max_name_attempts,
        };
    }

    /// Id members requested through this builder must be declared by.
    pub const fn declared_by(&self) -> &MetadataId {
        return &self.contribution.declared_by;
    }

    /// The accumulated governor view.
    pub fn governor(&self) -> &ClassOrInterfaceTypeDetails {
        return &self.governor;
    }

    /// Request a field.
    ///
    /// # Errors
    ///
    /// `ContractViolation` if the user's field, declared on the governor or
    /// inherited from a superclass, fails `requirement`,
    /// `ConflictingContributions` if an earlier contribution declared the
    /// field with a different type, `IllegalArgument` if the field is not
    /// declared by this builder's id.
    pub fn request_field(
        &mut self,
        field: FieldMetadata,
        requirement: Option<&MemberRequirement>,
    ) -> Result<Resolution<FieldMetadata>, Error> {
        self.check_owner(&field)?;
        let name = field.field_name().clone();

        if let Some(accepted) = self.contribution.fields.iter().find(|f| return f.field_name() == &name) {
            let accepted = accepted.clone();
            self.check_compatible(&accepted, accepted.field_type(), &field, field.field_type())?;
            return Ok(Resolution::Existing(accepted));
        }
        if let Some(existing) = self.governor.declared_field(&name) {
            let existing = existing.clone();
            return self.resolve_declared(existing, &field, requirement, FieldMetadata::field_type);
        }
        if let Some(inherited) = self.governor.ancestors().into_iter().find_map(|a| return a.declared_field(&name)) {
            let inherited = inherited.clone();
            if inherited.is_user_declared() {
                self.check_requirement(&inherited, Some(inherited.field_type()), requirement)?;
            }
            return Ok(Resolution::Inherited(inherited));
        }
        tracing::debug!(governor = %self.contribution.governor, member = %name, "field added");
        self.contribution.fields.push(field.clone());
        return Ok(Resolution::Added(field));
    }

    /// Request a method.
    ///
    /// # Errors
    ///
    /// As for `request_field`, comparing return types.
    pub fn request_method(
        &mut self,
        method: MethodMetadata,
        requirement: Option<&MemberRequirement>,
    ) -> Result<Resolution<MethodMetadata>, Error> {
        self.check_owner(&method)?;
        let signature = method.signature();
        let parameter_types = method.parameter_types();

        if let Some(accepted) = self.contribution.methods.iter().find(|m| return m.signature() == signature) {
            let accepted = accepted.clone();
            self.check_compatible(&accepted, accepted.return_type(), &method, method.return_type())?;
            return Ok(Resolution::Existing(accepted));
        }
        if let Some(existing) = self.governor.declared_method(method.method_name(), &parameter_types) {
            let existing = existing.clone();
            return self.resolve_declared(existing, &method, requirement, MethodMetadata::return_type);
        }
        let inherited = self
            .governor
            .ancestors()
            .into_iter()
            .find_map(|a| return a.declared_method(method.method_name(), &parameter_types));
        if let Some(inherited) = inherited {
            let inherited = inherited.clone();
            if inherited.is_user_declared() {
                self.check_requirement(&inherited, Some(inherited.return_type()), requirement)?;
            }
            return Ok(Resolution::Inherited(inherited));
        }
        tracing::debug!(governor = %self.contribution.governor, member = %signature, "method added");
        self.contribution.methods.push(method.clone());
        return Ok(Resolution::Added(method));
    }

    /// Request a constructor. Constructors are never inherited.
    ///
    /// # Errors
    ///
    /// `ContractViolation` if the user's constructor fails `requirement`
    /// (only visibility applies), `IllegalArgument` for a foreign owner.
    pub fn request_constructor(
        &mut self,
        constructor: ConstructorMetadata,
        requirement: Option<&MemberRequirement>,
    ) -> Result<Resolution<ConstructorMetadata>, Error> {
        self.check_owner(&constructor)?;
        let signature = constructor.signature();

        if let Some(accepted) = self.contribution.constructors.iter().find(|c| return c.signature() == signature) {
            return Ok(Resolution::Existing(accepted.clone()));
        }
        if let Some(existing) = self.governor.declared_constructor(&constructor.parameter_types()) {
            let existing = existing.clone();
            if existing.is_user_declared() {
                self.check_requirement(&existing, None, requirement)?;
                return Ok(Resolution::User(existing));
            }
            return Ok(Resolution::Existing(existing));
        }
        tracing::debug!(governor = %self.contribution.governor, member = %signature, "constructor added");
        self.contribution.constructors.push(constructor.clone());
        return Ok(Resolution::Added(constructor));
    }

    /// A field name based on `desired` that no field visible from the
    /// governor uses: `desired`, then `_desired`, `__desired`, ...
    ///
    /// # Errors
    ///
    /// Returns `Error::NamingExhausted` once `max_name_attempts` prefixed
    /// candidates are all taken.
    pub fn unique_field_name(&self, desired: &JavaSymbolName) -> Result<JavaSymbolName, Error> {
        let mut candidate = desired.clone();
        for _ in 0..=self.max_name_attempts {
            if !self.field_name_taken(&candidate) {
                return Ok(candidate);
            }
            candidate = candidate.with_prefix("_");
        }
        return Err(Error::NamingExhausted {
            attempts: self.max_name_attempts,
            desired: desired.to_string(),
            governor: self.contribution.governor.to_string(),
        });
    }

    /// Add a type-level annotation unless the governor or this builder
    /// already carries one of the same type. Returns whether it was added.
    pub fn add_annotation(&mut self, annotation: AnnotationMetadata) -> bool {
        let annotation_type = annotation.annotation_type();
        if self.governor.has_annotation(annotation_type)
            || self.contribution.annotations.iter().any(|a| return a.annotation_type() == annotation_type)
        {
            return false;
        }
        self.contribution.annotations.push(annotation);
        return true;
    }

    /// Merge attributes into an existing generated type-level annotation
    /// (or add it). User-written annotations are left untouched at assembly.
    pub fn update_annotation(&mut self, annotation: AnnotationMetadata) {
        self.contribution.annotation_updates.push(annotation);
    }

    /// Publish a fact for later providers.
    pub fn custom(&mut self, key: &str, value: serde_json::Value) {
        self.contribution.custom_data.put(key, value);
    }

    /// Finish the build.
    pub fn build(self) -> Contribution {
        return self.contribution;
    }

    // ── Helpers ──

    /// Members must be declared by the requesting item.
    fn check_owner(&self, member: &dyn DeclaredMember) -> Result<(), Error> {
        if member.declared_by() != &self.contribution.declared_by {
            return Err(Error::IllegalArgument {
                reason: format!(
                    "member `{}` is declared by {} but requested by {}",
                    member.signature(),
                    member.declared_by(),
                    self.contribution.declared_by
                ),
            });
        }
        return Ok(());
    }

    /// Same member requested twice: types must agree.
    fn check_compatible(
        &self,
        first: &dyn DeclaredMember,
        first_type: &JavaType,
        second: &dyn DeclaredMember,
        second_type: &JavaType,
    ) -> Result<(), Error> {
        if first_type.erasure() == second_type.erasure() {
            return Ok(());
        }
        return Err(self.conflict(first, second, first_type, second_type));
    }

    /// Settle a request for a member the governor view already declares.
    fn resolve_declared<M: DeclaredMember>(
        &self,
        existing: M,
        requested: &M,
        requirement: Option<&MemberRequirement>,
        member_type: fn(&M) -> &JavaType,
    ) -> Result<Resolution<M>, Error> {
        if existing.is_user_declared() {
            self.check_requirement(&existing, Some(member_type(&existing)), requirement)?;
            tracing::debug!(governor = %self.contribution.governor, member = %existing.signature(), "user member wins");
            return Ok(Resolution::User(existing));
        }
        let (theirs, ours) = (member_type(&existing), member_type(requested));
        if theirs.erasure() != ours.erasure() {
            return Err(self.conflict(&existing, requested, theirs, ours));
        }
        return Ok(Resolution::Existing(existing));
    }

    /// Apply a requirement to a user member.
    fn check_requirement(
        &self,
        member: &dyn DeclaredMember,
        member_type: Option<&JavaType>,
        requirement: Option<&MemberRequirement>,
    ) -> Result<(), Error> {
        let Some(reason) = requirement.and_then(|r| return r.violation(member, member_type)) else {
            return Ok(());
        };
        return Err(Error::ContractViolation {
            governor: self.contribution.governor.to_string(),
            member: member.signature().to_string(),
            reason,
        });
    }

    /// Build a conflict error between two generated declarations.
    fn conflict(
        &self,
        first: &dyn DeclaredMember,
        second: &dyn DeclaredMember,
        first_type: &JavaType,
        second_type: &JavaType,
    ) -> Error {
        return Error::ConflictingContributions {
            first: first.declared_by().to_string(),
            governor: self.contribution.governor.to_string(),
            member: second.signature().to_string(),
            reason: format!("{first_type} vs {second_type}"),
            second: second.declared_by().to_string(),
        };
    }

    /// Whether a field name is visible from the governor or already taken
    /// by this builder.
    fn field_name_taken(&self, name: &JavaSymbolName) -> bool {
        let signature = MemberSignature::field(name.clone());
        return self.governor.find_field(name).is_some()
            || self.contribution.fields.iter().any(|f| return f.signature() == signature);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::id::ProviderKind;
    use crate::model::java_type::LogicalPath;
    use crate::model::member::{
        ConstructorMetadataBuilder, FieldMetadataBuilder, MethodMetadataBuilder, Modifiers, Parameter,
    };
    use crate::model::type_details::{ClassOrInterfaceTypeDetailsBuilder, PhysicalTypeCategory};

    fn name(text: &str) -> JavaSymbolName {
        return JavaSymbolName::new(text).unwrap();
    }

    fn foo() -> JavaType {
        return JavaType::new("com.foo.Foo");
    }

    fn physical() -> MetadataId {
        return MetadataId::physical_type(&foo(), &LogicalPath::main_java());
    }

    fn entity() -> MetadataId {
        return ProviderKind::ENTITY.instance_id(&foo(), &LogicalPath::main_java());
    }

    fn governor(configure: impl FnOnce(&mut ClassOrInterfaceTypeDetailsBuilder)) -> Arc<ClassOrInterfaceTypeDetails> {
        let mut builder = ClassOrInterfaceTypeDetailsBuilder::new(physical(), foo(), PhysicalTypeCategory::Class);
        configure(&mut builder);
        return Arc::new(builder.build().unwrap());
    }

    fn field(declared_by: MetadataId, field_name: &str, field_type: JavaType) -> FieldMetadata {
        return FieldMetadataBuilder::new(declared_by, Modifiers::PRIVATE, name(field_name), field_type).build();
    }

    fn flush(declared_by: MetadataId, parameters: &[(&str, JavaType)]) -> MethodMetadata {
        let mut builder = MethodMetadataBuilder::new(declared_by, Modifiers::PUBLIC, name("flush"), JavaType::void());
        for (param, param_type) in parameters {
            builder = builder.parameter(Parameter::new(name(param), param_type.clone()));
        }
        return builder.build();
    }

    #[test]
    fn user_method_wins_and_other_overloads_are_added() {
        let gov = governor(|b| b.add_method(flush(physical(), &[])));
        let mut builder = ItdTypeDetailsBuilder::new(entity(), gov, DEFAULT_MAX_NAME_ATTEMPTS);

        let dropped = builder.request_method(flush(entity(), &[]), None).unwrap();
        let added = builder.request_method(flush(entity(), &[("mode", JavaType::string())]), None).unwrap();

        assert!(matches!(dropped, Resolution::User(_)));
        assert!(added.is_added());
        let contribution = builder.build();
        assert_eq!(contribution.methods.len(), 1);
        assert_eq!(contribution.methods[0].signature().to_string(), "flush(java.lang.String)");
    }

    #[test]
    fn collision_avoidance_prefixes_underscores() {
        let gov = governor(|b| {
            b.add_field(field(physical(), "version", JavaType::int_object()));
            b.add_field(field(physical(), "_version", JavaType::int_object()));
        });
        let builder = ItdTypeDetailsBuilder::new(entity(), gov, DEFAULT_MAX_NAME_ATTEMPTS);
        assert_eq!(builder.unique_field_name(&name("version")).unwrap().as_str(), "__version");
        assert_eq!(builder.unique_field_name(&name("id")).unwrap().as_str(), "id");
    }

    #[test]
    fn naming_gives_up_after_the_configured_attempts() {
        let gov = governor(|b| {
            b.add_field(field(physical(), "id", JavaType::long_object()));
            b.add_field(field(physical(), "_id", JavaType::long_object()));
        });
        let builder = ItdTypeDetailsBuilder::new(entity(), gov, 1);
        assert!(matches!(builder.unique_field_name(&name("id")), Err(Error::NamingExhausted { attempts: 1, .. })));
    }

    #[test]
    fn requirement_violation_names_the_member() {
        let gov = governor(|b| b.add_field(field(physical(), "id", JavaType::string())));
        let mut builder = ItdTypeDetailsBuilder::new(entity(), gov, DEFAULT_MAX_NAME_ATTEMPTS);
        let requirement = MemberRequirement::new().of_type(JavaType::long_object());

        let err = builder
            .request_field(field(entity(), "id", JavaType::long_object()), Some(&requirement))
            .unwrap_err();
        match err {
            Error::ContractViolation { governor, member, .. } => {
                assert_eq!(governor, "com.foo.Foo");
                assert_eq!(member, "id");
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn inherited_members_are_not_redeclared() {
        let parent_id = MetadataId::physical_type(&JavaType::new("com.foo.Base"), &LogicalPath::main_java());
        let mut parent =
            ClassOrInterfaceTypeDetailsBuilder::new(parent_id.clone(), JavaType::new("com.foo.Base"), PhysicalTypeCategory::Class);
        parent.add_field(field(parent_id, "id", JavaType::long_object()));
        let parent = Arc::new(parent.build().unwrap());
        let gov = governor(|b| {
            b.add_extends(JavaType::new("com.foo.Base"));
            b.set_superclass(Some(parent));
        });

        let mut builder = ItdTypeDetailsBuilder::new(entity(), gov, DEFAULT_MAX_NAME_ATTEMPTS);
        let resolution = builder.request_field(field(entity(), "id", JavaType::long_object()), None).unwrap();
        assert!(matches!(resolution, Resolution::Inherited(_)));
        assert!(builder.build().fields.is_empty());
    }

    #[test]
    fn inherited_user_members_must_meet_the_requirement() {
        let parent_id = MetadataId::physical_type(&JavaType::new("com.foo.Base"), &LogicalPath::main_java());
        let mut parent =
            ClassOrInterfaceTypeDetailsBuilder::new(parent_id.clone(), JavaType::new("com.foo.Base"), PhysicalTypeCategory::Class);
        parent.add_method(
            MethodMetadataBuilder::new(parent_id, Modifiers::PRIVATE, name("getId"), JavaType::string())
                .body("return this.id;")
                .build(),
        );
        let parent = Arc::new(parent.build().unwrap());
        let gov = governor(|b| {
            b.add_extends(JavaType::new("com.foo.Base"));
            b.set_superclass(Some(parent));
        });
        let getter = MethodMetadataBuilder::new(entity(), Modifiers::PUBLIC, name("getId"), JavaType::string()).build();

        let mut builder = ItdTypeDetailsBuilder::new(entity(), Arc::clone(&gov), DEFAULT_MAX_NAME_ATTEMPTS);
        let requirement = MemberRequirement::new().public();
        let err = builder.request_method(getter.clone(), Some(&requirement)).unwrap_err();
        assert!(matches!(err, Error::ContractViolation { ref member, .. } if member == "getId()"));

        let mut builder = ItdTypeDetailsBuilder::new(entity(), gov, DEFAULT_MAX_NAME_ATTEMPTS);
        let requirement = MemberRequirement::new().of_type(JavaType::long_object());
        assert!(matches!(
            builder.request_method(getter, Some(&requirement)),
            Err(Error::ContractViolation { .. })
        ));
    }

    #[test]
    fn repeated_requests_resolve_to_the_first() {
        let mut builder = ItdTypeDetailsBuilder::new(entity(), governor(|_| {}), DEFAULT_MAX_NAME_ATTEMPTS);
        builder.request_field(field(entity(), "id", JavaType::long_object()), None).unwrap();
        let again = builder.request_field(field(entity(), "id", JavaType::long_object()), None).unwrap();
        assert!(matches!(again, Resolution::Existing(_)));

        let ctor = ConstructorMetadataBuilder::new(entity(), Modifiers::PUBLIC).build();
        assert!(builder.request_constructor(ctor.clone(), None).unwrap().is_added());
        assert!(matches!(builder.request_constructor(ctor, None).unwrap(), Resolution::Existing(_)));
        assert_eq!(builder.build().fields.len(), 1);
    }

    #[test]
    fn conflicting_earlier_contribution_is_reported() {
        let active_record = ProviderKind::ACTIVE_RECORD.instance_id(&foo(), &LogicalPath::main_java());
        let gov = governor(|b| b.add_field(field(entity(), "entityManager", JavaType::string())));
        let mut builder = ItdTypeDetailsBuilder::new(active_record.clone(), gov, DEFAULT_MAX_NAME_ATTEMPTS);

        let err = builder
            .request_field(field(active_record, "entityManager", JavaType::new("javax.persistence.EntityManager")), None)
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingContributions { .. }));
    }

    #[test]
    fn foreign_members_are_rejected() {
        let mut builder = ItdTypeDetailsBuilder::new(entity(), governor(|_| {}), DEFAULT_MAX_NAME_ATTEMPTS);
        let err = builder.request_field(field(physical(), "id", JavaType::long_object()), None).unwrap_err();
        assert!(matches!(err, Error::IllegalArgument { .. }));
    }
}
