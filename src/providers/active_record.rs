//! Active-record persistence methods for `@ActiveRecord` entities.
//!
//! Builds on the identity published by the entity provider: an injected
//! entity manager plus instance (`persist`, `remove`, `flush`, `merge`) and
//! static finder methods named after the type's plural.

use std::sync::Arc;

use crate::error::Error;
use crate::itd::builder::{ItdTypeDetailsBuilder, MemberRequirement};
use crate::metadata::dependency::DependencyRegistry;
use crate::metadata::id::{MetadataId, ProviderKind};
use crate::metadata::item::{MetadataBody, MetadataItem};
use crate::metadata::provider::{self, MetadataProvider};
use crate::metadata::service::MetadataService;
use crate::model::annotation::AnnotationMetadata;
use crate::model::custom_data::IDENTIFIER_FIELD;
use crate::model::java_type::{JavaSymbolName, JavaType, Primitive};
use crate::model::member::{FieldMetadata, FieldMetadataBuilder, MethodMetadataBuilder, Modifiers, Parameter};
use crate::model::type_details::ClassOrInterfaceTypeDetails;
use crate::providers::{self, ACTIVE_RECORD_ANNOTATION};

/// Injected persistence handle.
const ENTITY_MANAGER: &str = "javax.persistence.EntityManager";
/// Injection marker for the entity manager field.
const PERSISTENCE_CONTEXT: &str = "javax.persistence.PersistenceContext";

/// Upstream kinds.
const UPSTREAMS: [ProviderKind; 3] = [ProviderKind::PHYSICAL_TYPE, ProviderKind::PLURAL, ProviderKind::ENTITY];

/// Serves `MID#active_record` contributions.
#[derive(Debug, Default)]
pub struct ActiveRecordProvider;

impl MetadataProvider for ActiveRecordProvider {
    fn kind(&self) -> ProviderKind {
        return ProviderKind::ACTIVE_RECORD;
    }

    fn get_metadata(&self, id: &MetadataId, service: &MetadataService) -> Result<Option<MetadataItem>, Error> {
        provider::ensure_owned(self.kind(), id)?;
        let Some(governor) = providers::governor_view(service, id, self.kind())? else {
            return Ok(None);
        };
        if !governor.has_annotation(&JavaType::new(ACTIVE_RECORD_ANNOTATION)) {
            return Ok(None);
        }
        let Some(identifier) = identifier(service, id, &governor)? else {
            tracing::debug!(%id, "active record without entity identity");
            return Ok(None);
        };
        let Some(plural) = service.get(&id.with_kind(ProviderKind::PLURAL))?.and_then(|p| return p.plural().map(str::to_string))
        else {
            return Ok(None);
        };

        let mut builder = ItdTypeDetailsBuilder::new(id.clone(), Arc::clone(&governor), service.settings().max_name_attempts);
        let mut methods = Methods::new(&mut builder, &identifier)?;
        methods.instance()?;
        methods.finders(&plural)?;

        return Ok(Some(MetadataItem::new(id.clone(), MetadataBody::Contribution(builder.build()))));
    }

    fn start(&self, registry: &DependencyRegistry) -> Result<(), Error> {
        return providers::register_class_edges(registry, &UPSTREAMS, self.kind());
    }

    fn stop(&self, registry: &DependencyRegistry) {
        providers::deregister_class_edges(registry, &UPSTREAMS, self.kind());
    }
}

/// The identifier field named by the entity contribution, looked up in the
/// governor view so inherited identifiers are found too.
fn identifier(
    service: &MetadataService,
    id: &MetadataId,
    governor: &ClassOrInterfaceTypeDetails,
) -> Result<Option<FieldMetadata>, Error> {
    let Some(entity) = service.get(&id.with_kind(ProviderKind::ENTITY))? else {
        return Ok(None);
    };
    let Some(name) = entity
        .contribution()
        .and_then(|c| return c.custom_data.get(IDENTIFIER_FIELD))
        .and_then(serde_json::Value::as_str)
    else {
        return Ok(None);
    };
    let name = JavaSymbolName::new(name)?;
    return Ok(governor.find_field(&name).cloned());
}

/// Method requests sharing the governor, entity manager, and identifier.
struct Methods<'b> {
    /// Builder receiving the requests.
    builder: &'b mut ItdTypeDetailsBuilder,
    /// Name of the entity manager field.
    entity_manager: JavaSymbolName,
    /// Governor type.
    governor: JavaType,
    /// Identifier field.
    identifier: FieldMetadata,
}

impl<'b> Methods<'b> {
    /// Request the entity manager field and its static accessor.
    fn new(builder: &'b mut ItdTypeDetailsBuilder, identifier: &FieldMetadata) -> Result<Self, Error> {
        let governor = builder.governor().name().clone();
        let entity_manager = builder.unique_field_name(&JavaSymbolName::new("entityManager")?)?;
        let field = FieldMetadataBuilder::new(
            builder.declared_by().clone(),
            Modifiers::TRANSIENT,
            entity_manager.clone(),
            JavaType::new(ENTITY_MANAGER),
        )
        .annotation(AnnotationMetadata::marker(JavaType::new(PERSISTENCE_CONTEXT)))
        .build();
        builder.request_field(field, None)?;

        let simple = governor.simple_type_name();
        let body = format!(
            "EntityManager em = new {simple}().{entity_manager};\n\
             if (em == null) throw new IllegalStateException(\"Entity manager has not been injected\");\n\
             return em;"
        );
        let accessor = MethodMetadataBuilder::new(
            builder.declared_by().clone(),
            Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL,
            JavaSymbolName::new("entityManager")?,
            JavaType::new(ENTITY_MANAGER),
        )
        .body(&body)
        .build();
        let requirement = MemberRequirement::new().of_type(JavaType::new(ENTITY_MANAGER));
        builder.request_method(accessor, Some(&requirement))?;

        return Ok(Self { builder, entity_manager, governor, identifier: identifier.clone() });
    }

    /// `persist`, `remove`, `flush`, and `merge`.
    fn instance(&mut self) -> Result<(), Error> {
        let em = self.entity_manager.clone();
        let guard = format!("if (this.{em} == null) this.{em} = entityManager();");
        let simple = self.governor.simple_type_name().to_string();
        let id = self.identifier.field_name().clone();

        self.void_method("persist", &format!("{guard}\nthis.{em}.persist(this);"))?;
        self.void_method(
            "remove",
            &format!(
                "{guard}\nif (this.{em}.contains(this)) {{\n    this.{em}.remove(this);\n}} else {{\n    \
                 {simple} attached = {simple}.find{simple}(this.{id});\n    this.{em}.remove(attached);\n}}"
            ),
        )?;
        self.void_method("flush", &format!("{guard}\nthis.{em}.flush();"))?;

        let merge = MethodMetadataBuilder::new(
            self.builder.declared_by().clone(),
            Modifiers::PUBLIC,
            JavaSymbolName::new("merge")?,
            self.governor.clone(),
        )
        .body(&format!("{guard}\n{simple} merged = this.{em}.merge(this);\nthis.{em}.flush();\nreturn merged;"))
        .build();
        let requirement = MemberRequirement::new().of_type(self.governor.clone()).public();
        self.builder.request_method(merge, Some(&requirement))?;
        return Ok(());
    }

    /// `count{Plural}`, `findAll{Plural}`, and `find{Type}(id)`.
    fn finders(&mut self, plural: &str) -> Result<(), Error> {
        let simple = self.governor.simple_type_name().to_string();
        let statics = Modifiers::PUBLIC | Modifiers::STATIC;

        let count = MethodMetadataBuilder::new(
            self.builder.declared_by().clone(),
            statics,
            JavaSymbolName::new(&format!("count{plural}"))?,
            JavaType::primitive(Primitive::Long),
        )
        .body(&format!("return entityManager().createQuery(\"SELECT COUNT(o) FROM {simple} o\", Long.class).getSingleResult();"))
        .build();
        self.builder.request_method(count, None)?;

        let list = JavaType::new("java.util.List").with_parameters(vec![self.governor.clone()]);
        let find_all = MethodMetadataBuilder::new(
            self.builder.declared_by().clone(),
            statics,
            JavaSymbolName::new(&format!("findAll{plural}"))?,
            list,
        )
        .body(&format!("return entityManager().createQuery(\"SELECT o FROM {simple} o\", {simple}.class).getResultList();"))
        .build();
        self.builder.request_method(find_all, None)?;

        let id_name = self.identifier.field_name().clone();
        let find = MethodMetadataBuilder::new(
            self.builder.declared_by().clone(),
            statics,
            JavaSymbolName::new(&format!("find{simple}"))?,
            self.governor.clone(),
        )
        .parameter(Parameter::new(id_name.clone(), self.identifier.field_type().boxed()))
        .body(&format!("if ({id_name} == null) return null;\nreturn entityManager().find({simple}.class, {id_name});"))
        .build();
        self.builder.request_method(find, None)?;
        return Ok(());
    }

    /// A public `void` instance method a user may replace.
    fn void_method(&mut self, name: &str, body: &str) -> Result<(), Error> {
        let method = MethodMetadataBuilder::new(
            self.builder.declared_by().clone(),
            Modifiers::PUBLIC,
            JavaSymbolName::new(name)?,
            JavaType::void(),
        )
        .body(body)
        .build();
        let requirement = MemberRequirement::new().of_type(JavaType::void()).public();
        self.builder.request_method(method, Some(&requirement))?;
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::service::ServiceSettings;
    use crate::model::java_type::LogicalPath;
    use crate::model::member::DeclaredMember;
    use crate::path_resolver::{MavenLayout, PathResolverRegistry};
    use crate::project::InMemorySources;
    use crate::providers::entity::EntityProvider;
    use crate::providers::physical::PhysicalTypeProvider;
    use crate::providers::plural::PluralProvider;

    const HEADER: &str = "package com.foo;\n\
        import javax.persistence.Entity;\n\
        import javax.persistence.Id;\n\
        import org.itdgen.annotations.ActiveRecord;\n";

    fn setup(body: &str) -> Arc<MetadataService> {
        let sources = Arc::new(InMemorySources::new());
        sources.put("src/main/java/com/foo/Foo.java", &format!("{HEADER}@Entity @ActiveRecord public class Foo {{ {body} }}"));
        let resolvers = Arc::new(PathResolverRegistry::new());
        resolvers.activate(Arc::new(MavenLayout::single_module("_Itd"))).unwrap();
        let service = MetadataService::new(Arc::new(DependencyRegistry::new()), ServiceSettings::default());
        service.register_provider(Arc::new(PhysicalTypeProvider::new(resolvers, sources))).unwrap();
        service.register_provider(Arc::new(PluralProvider)).unwrap();
        service.register_provider(Arc::new(EntityProvider::default())).unwrap();
        service.register_provider(Arc::new(ActiveRecordProvider)).unwrap();
        return service;
    }

    fn active_record() -> MetadataId {
        return ProviderKind::ACTIVE_RECORD.instance_id(&JavaType::new("com.foo.Foo"), &LogicalPath::main_java());
    }

    fn method_names(service: &MetadataService) -> Vec<String> {
        let item = service.get(&active_record()).unwrap().unwrap();
        return item
            .contribution()
            .unwrap()
            .methods
            .iter()
            .map(|m| return m.signature().to_string())
            .collect();
    }

    #[test]
    fn contributes_persistence_methods() {
        let names = method_names(&setup(""));
        assert_eq!(
            names,
            [
                "entityManager()",
                "persist()",
                "remove()",
                "flush()",
                "merge()",
                "countFoos()",
                "findAllFoos()",
                "findFoo(java.lang.Long)",
            ]
        );
    }

    #[test]
    fn user_flush_is_kept_and_not_regenerated() {
        let names = method_names(&setup("public void flush() { }"));
        assert!(!names.contains(&"flush()".to_string()));
        assert!(names.contains(&"persist()".to_string()));
    }

    #[test]
    fn user_methods_with_the_wrong_shape_are_reported() {
        let service = setup("private void persist() { }");
        assert!(matches!(service.get(&active_record()), Err(Error::ContractViolation { .. })));
    }

    #[test]
    fn finder_takes_the_boxed_identifier_type() {
        let names = method_names(&setup("@Id private long key;"));
        assert!(names.contains(&"findFoo(java.lang.Long)".to_string()));
    }
}
