//! Persistence identity for `@Entity` types: an identifier and a version
//! field with their accessors, plus the facts later providers rely on.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Error;
use crate::itd::builder::{ItdTypeDetailsBuilder, Resolution};
use crate::metadata::dependency::DependencyRegistry;
use crate::metadata::id::{MetadataId, ProviderKind};
use crate::metadata::item::{MetadataBody, MetadataItem};
use crate::metadata::provider::{self, MetadataProvider};
use crate::metadata::service::MetadataService;
use crate::model::annotation::AnnotationMetadata;
use crate::model::custom_data::{CustomData, IDENTIFIER_ACCESSOR, IDENTIFIER_FIELD, PERSISTENT_TYPE, VERSION_FIELD};
use crate::model::java_type::{JavaSymbolName, JavaType};
use crate::model::member::{FieldMetadata, FieldMetadataBuilder, Modifiers};
use crate::model::type_details::ClassOrInterfaceTypeDetails;
use crate::providers::{self, ENTITY_ANNOTATION, ID_ANNOTATION, ParentLinks, VERSION_ANNOTATION};

/// Marks a generated identifier as database-assigned.
const GENERATED_VALUE_ANNOTATION: &str = "javax.persistence.GeneratedValue";

/// Facts inherited from an entity superclass.
const INHERITED_FACTS: [&str; 3] = [IDENTIFIER_ACCESSOR, IDENTIFIER_FIELD, VERSION_FIELD];

/// Upstream kinds.
const UPSTREAMS: [ProviderKind; 2] = [ProviderKind::PHYSICAL_TYPE, ProviderKind::PLURAL];

/// Serves `MID#entity` contributions.
#[derive(Debug, Default)]
pub struct EntityProvider {
    /// Edges from each entity to its superclass's entity item.
    parents: ParentLinks,
}

impl MetadataProvider for EntityProvider {
    fn kind(&self) -> ProviderKind {
        return ProviderKind::ENTITY;
    }

    fn get_metadata(&self, id: &MetadataId, service: &MetadataService) -> Result<Option<MetadataItem>, Error> {
        provider::ensure_owned(self.kind(), id)?;
        let Some(governor) = providers::governor_view(service, id, self.kind())? else {
            self.parents.relink(service.registry(), id, None)?;
            return Ok(None);
        };
        if !governor.has_annotation(&JavaType::new(ENTITY_ANNOTATION)) {
            self.parents.relink(service.registry(), id, None)?;
            return Ok(None);
        }

        let inherited = self.parent_facts(&governor, id, service)?;

        let mut builder = ItdTypeDetailsBuilder::new(id.clone(), Arc::clone(&governor), service.settings().max_name_attempts);
        if let Some(facts) = inherited {
            tracing::debug!(%id, "identity inherited from entity superclass");
            for key in INHERITED_FACTS {
                if let Some(value) = facts.get(key) {
                    builder.custom(key, value.clone());
                }
            }
        } else {
            let identifier = identifier_field(&mut builder)?;
            let accessor = providers::request_getter(&mut builder, identifier.member())?;
            providers::request_setter(&mut builder, identifier.member())?;
            builder.custom(IDENTIFIER_FIELD, Value::from(identifier.member().field_name().as_str()));
            builder.custom(IDENTIFIER_ACCESSOR, Value::from(accessor.member().method_name().as_str()));

            let version = version_field(&mut builder)?;
            providers::request_getter(&mut builder, version.member())?;
            providers::request_setter(&mut builder, version.member())?;
            builder.custom(VERSION_FIELD, Value::from(version.member().field_name().as_str()));
        }
        builder.custom(PERSISTENT_TYPE, table_name(service, id)?);

        return Ok(Some(MetadataItem::new(id.clone(), MetadataBody::Contribution(builder.build()))));
    }

    fn start(&self, registry: &DependencyRegistry) -> Result<(), Error> {
        return providers::register_class_edges(registry, &UPSTREAMS, self.kind());
    }

    fn stop(&self, registry: &DependencyRegistry) {
        providers::deregister_class_edges(registry, &UPSTREAMS, self.kind());
    }
}

/// The identifier field of the governor: the user's `@Id` field (declared
/// or inherited) or a generated `Long id`, renamed if `id` is taken.
///
/// # Errors
///
/// `NamingExhausted` and builder errors.
pub fn identifier_field(builder: &mut ItdTypeDetailsBuilder) -> Result<Resolution<FieldMetadata>, Error> {
    let id_annotation = JavaType::new(ID_ANNOTATION);
    let governor = builder.governor();
    if let Some(field) = governor.declared_fields_with_annotation(&id_annotation).first() {
        return Ok(Resolution::User((*field).clone()));
    }
    if let Some(field) = governor.find_field_with_annotation(&id_annotation) {
        return Ok(Resolution::Inherited(field.clone()));
    }
    let name = builder.unique_field_name(&JavaSymbolName::new("id")?)?;
    let field = FieldMetadataBuilder::new(builder.declared_by().clone(), Modifiers::PRIVATE, name, JavaType::long_object())
        .annotation(AnnotationMetadata::marker(id_annotation))
        .annotation(AnnotationMetadata::marker(JavaType::new(GENERATED_VALUE_ANNOTATION)))
        .build();
    return builder.request_field(field, None);
}

/// The `@Version` field, or a generated `Integer version`.
fn version_field(builder: &mut ItdTypeDetailsBuilder) -> Result<Resolution<FieldMetadata>, Error> {
    let version_annotation = JavaType::new(VERSION_ANNOTATION);
    if let Some(field) = builder.governor().find_field_with_annotation(&version_annotation) {
        return Ok(Resolution::User(field.clone()));
    }
    let name = builder.unique_field_name(&JavaSymbolName::new("version")?)?;
    let field = FieldMetadataBuilder::new(builder.declared_by().clone(), Modifiers::PRIVATE, name, JavaType::int_object())
        .annotation(AnnotationMetadata::marker(version_annotation))
        .build();
    return builder.request_field(field, None);
}

impl EntityProvider {
    /// Identity facts of the superclass's entity item, when it has one.
    /// Records the edge so a change to the parent's identity reaches this
    /// item.
    fn parent_facts(
        &self,
        governor: &ClassOrInterfaceTypeDetails,
        id: &MetadataId,
        service: &MetadataService,
    ) -> Result<Option<CustomData>, Error> {
        let parent_id = governor.superclass().map(|p| return p.declared_by().with_kind(ProviderKind::ENTITY));
        self.parents.relink(service.registry(), id, parent_id.as_ref())?;
        let Some(parent_id) = parent_id else {
            return Ok(None);
        };
        let Some(item) = service.get(&parent_id)? else {
            return Ok(None);
        };
        return Ok(item
            .contribution()
            .filter(|c| return c.custom_data.contains(IDENTIFIER_FIELD))
            .map(|c| return c.custom_data.clone()));
    }
}

/// Table name derived from the plural, or null without a plural provider.
fn table_name(service: &MetadataService, id: &MetadataId) -> Result<Value, Error> {
    if !service.has_provider(ProviderKind::PLURAL) {
        return Ok(Value::Null);
    }
    let plural = service.get(&id.with_kind(ProviderKind::PLURAL))?;
    return Ok(plural
        .as_deref()
        .and_then(MetadataItem::plural)
        .map_or(Value::Null, |p| return Value::from(p.to_lowercase())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::service::ServiceSettings;
    use crate::model::java_type::LogicalPath;
    use crate::model::member::DeclaredMember;
    use crate::path_resolver::{MavenLayout, PathResolverRegistry};
    use crate::project::InMemorySources;
    use crate::providers::physical::PhysicalTypeProvider;
    use crate::providers::plural::PluralProvider;

    fn setup(files: &[(&str, &str)]) -> Arc<MetadataService> {
        let sources = Arc::new(InMemorySources::new());
        for (path, text) in files {
            sources.put(path, text);
        }
        let resolvers = Arc::new(PathResolverRegistry::new());
        resolvers.activate(Arc::new(MavenLayout::single_module("_Itd"))).unwrap();
        let service = MetadataService::new(Arc::new(DependencyRegistry::new()), ServiceSettings::default());
        service.register_provider(Arc::new(PhysicalTypeProvider::new(resolvers, sources))).unwrap();
        service.register_provider(Arc::new(PluralProvider)).unwrap();
        service.register_provider(Arc::new(EntityProvider::default())).unwrap();
        return service;
    }

    fn entity(name: &str) -> MetadataId {
        return ProviderKind::ENTITY.instance_id(&JavaType::new(name), &LogicalPath::main_java());
    }

    #[test]
    fn generates_identity_for_a_bare_entity() {
        let service = setup(&[(
            "src/main/java/com/foo/Category.java",
            "package com.foo; import javax.persistence.Entity; @Entity public class Category { }",
        )]);
        let item = service.get(&entity("com.foo.Category")).unwrap().unwrap();
        let contribution = item.contribution().unwrap();

        let names: Vec<&str> = contribution.fields.iter().map(|f| return f.field_name().as_str()).collect();
        assert_eq!(names, ["id", "version"]);
        assert_eq!(contribution.fields[0].field_type(), &JavaType::long_object());
        assert_eq!(contribution.custom_data.get(PERSISTENT_TYPE), Some(&Value::from("categories")));
        assert_eq!(contribution.custom_data.get(IDENTIFIER_ACCESSOR), Some(&Value::from("getId")));
        assert!(contribution.methods.iter().all(|m| return m.declared_by() == &entity("com.foo.Category")));
    }

    #[test]
    fn non_entities_get_nothing() {
        let service = setup(&[("src/main/java/com/foo/Foo.java", "package com.foo; public class Foo { }")]);
        assert!(service.get(&entity("com.foo.Foo")).unwrap().is_none());
    }

    #[test]
    fn clashing_user_fields_push_generated_names_aside() {
        let service = setup(&[(
            "src/main/java/com/foo/Foo.java",
            "package com.foo; import javax.persistence.Entity; @Entity public class Foo { private String version; }",
        )]);
        let item = service.get(&entity("com.foo.Foo")).unwrap().unwrap();
        let contribution = item.contribution().unwrap();
        assert_eq!(contribution.custom_data.get(VERSION_FIELD), Some(&Value::from("_version")));
        assert!(contribution.methods.iter().any(|m| return m.method_name().as_str() == "get_version"));
    }

    #[test]
    fn subclasses_of_entities_reuse_the_parent_identity() {
        let service = setup(&[
            (
                "src/main/java/com/foo/Base.java",
                "package com.foo; import javax.persistence.Entity; @Entity public class Base { }",
            ),
            (
                "src/main/java/com/foo/Foo.java",
                "package com.foo; import javax.persistence.Entity; @Entity public class Foo extends Base { }",
            ),
        ]);
        let item = service.get(&entity("com.foo.Foo")).unwrap().unwrap();
        let contribution = item.contribution().unwrap();
        assert!(contribution.fields.is_empty());
        assert_eq!(contribution.custom_data.get(IDENTIFIER_FIELD), Some(&Value::from("id")));
        assert_eq!(service.registry().upstream(&entity("com.foo.Foo")), vec![entity("com.foo.Base")]);
    }
}
