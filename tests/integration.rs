use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use itdgen::config::Config;
use itdgen::engine::Engine;
use itdgen::error::Error;
use itdgen::itd::builder::{DEFAULT_MAX_NAME_ATTEMPTS, ItdTypeDetailsBuilder};
use itdgen::metadata::dependency::DependencyRegistry;
use itdgen::metadata::id::{MetadataId, ProviderKind};
use itdgen::metadata::item::{Companion, MetadataBody, MetadataItem};
use itdgen::metadata::provider::MetadataProvider;
use itdgen::metadata::service::{MetadataService, ServiceSettings};
use itdgen::model::java_type::{JavaSymbolName, JavaType, LogicalPath};
use itdgen::model::member::{DeclaredMember as _, FieldMetadataBuilder, Modifiers};
use itdgen::model::type_details::{ClassOrInterfaceTypeDetailsBuilder, PhysicalTypeCategory};
use itdgen::path_resolver::{MavenLayout, PathResolverRegistry};
use itdgen::project::{InMemorySources, SourceRepository};
use itdgen::providers::entity::EntityProvider;
use itdgen::providers::physical::PhysicalTypeProvider;
use itdgen::providers::plural::PluralProvider;
use proptest::prelude::*;

const FOO: &str = "src/main/java/com/foo/Foo.java";

fn name(text: &str) -> JavaSymbolName {
    return JavaSymbolName::new(text).unwrap();
}

fn foo(kind: ProviderKind) -> MetadataId {
    return kind.instance_id(&JavaType::new("com.foo.Foo"), &LogicalPath::main_java());
}

fn engine(source: &str) -> (Arc<InMemorySources>, Engine) {
    let sources = Arc::new(InMemorySources::new());
    sources.put(FOO, source);
    let repository: Arc<dyn SourceRepository> = Arc::<InMemorySources>::clone(&sources);
    return (sources, Engine::new(&Config::default(), repository).unwrap());
}

fn companion(engine: &Engine) -> Companion {
    let item = engine.service().get(&foo(ProviderKind::COMPANION)).unwrap().unwrap();
    return item.companion().unwrap().clone();
}

// ── Generation scenarios ──

#[test]
fn empty_entity_gets_a_long_identifier_and_its_getter() {
    let (_sources, engine) =
        engine("package com.foo; import javax.persistence.Entity; @Entity public class Foo { }");
    let companion = companion(&engine);

    let id = companion.itd.declared_field(&name("id")).unwrap();
    assert_eq!(id.field_type(), &JavaType::long_object());
    let getter = companion.merged.find_method(&name("getId"), &[]).unwrap();
    assert_eq!(getter.return_type(), &JavaType::long_object());
    assert_eq!(getter.body(), Some("return this.id;"));
    assert!(companion.rendered.contains("privileged aspect Foo_Itd {"));
}

#[test]
fn user_identifier_is_used_as_written() {
    let (_sources, engine) = engine(
        "package com.foo; import javax.persistence.Entity; import javax.persistence.Id; \
         @Entity public class Foo { @Id private String id; public String getId() { return id; } }",
    );
    let companion = companion(&engine);

    assert!(companion.itd.declared_field(&name("id")).is_none());
    assert!(companion.itd.declared_method(&name("getId"), &[]).is_none());
    let getter = companion.merged.declared_method(&name("getId"), &[]).unwrap();
    assert!(getter.is_user_declared());
    assert_eq!(getter.return_type(), &JavaType::string());
    assert_eq!(getter.body(), Some("return id;"));
    assert!(companion.itd.declared_method(&name("setId"), &[JavaType::string()]).is_some());
    assert_eq!(companion.merged.find_field(&name("id")).unwrap().field_type(), &JavaType::string());
}

#[test]
fn user_overload_of_flush_coexists_with_the_generated_one() {
    let (_sources, engine) = engine(
        "package com.foo; import javax.persistence.Entity; import org.itdgen.annotations.ActiveRecord; \
         @Entity @ActiveRecord public class Foo { public void flush(String mode) { } }",
    );
    let companion = companion(&engine);

    let generated = companion.merged.declared_method(&name("flush"), &[]).unwrap();
    let user = companion.merged.declared_method(&name("flush"), &[JavaType::string()]).unwrap();
    assert_eq!(generated.declared_by(), &foo(ProviderKind::ACTIVE_RECORD));
    assert!(user.is_user_declared());
    assert!(companion.itd.declared_method(&name("flush"), &[JavaType::string()]).is_none());
}

#[test]
fn regeneration_is_idempotent() {
    let (_sources, engine) =
        engine("package com.foo; import javax.persistence.Entity; @Entity public class Foo { }");
    let first = companion(&engine);
    engine.service().evict_all();
    assert_eq!(companion(&engine), first);
}

// ── Dependency propagation ──

/// Answers `{upstream}+{suffix}`, or `v{version}` when it has no upstream,
/// and counts its computations.
struct Link {
    calls: AtomicU64,
    kind: ProviderKind,
    suffix: &'static str,
    upstream: Option<ProviderKind>,
    version: AtomicU64,
}

impl Link {
    fn new(kind: ProviderKind, suffix: &'static str, upstream: Option<ProviderKind>) -> Arc<Self> {
        return Arc::new(Self { calls: AtomicU64::new(0), kind, suffix, upstream, version: AtomicU64::new(0) });
    }
}

impl MetadataProvider for Link {
    fn kind(&self) -> ProviderKind {
        return self.kind;
    }

    fn get_metadata(&self, id: &MetadataId, service: &MetadataService) -> Result<Option<MetadataItem>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = match self.upstream {
            Some(upstream) => {
                let Some(item) = service.get(&id.with_kind(upstream))? else {
                    return Ok(None);
                };
                format!("{}+{}", item.plural().unwrap_or_default(), self.suffix)
            },
            None => format!("v{}", self.version.load(Ordering::SeqCst)),
        };
        return Ok(Some(MetadataItem::new(id.clone(), MetadataBody::Plural(text))));
    }

    fn start(&self, registry: &DependencyRegistry) -> Result<(), Error> {
        if let Some(upstream) = self.upstream {
            registry.register_dependency(&upstream.class_id(), &self.kind.class_id())?;
        }
        return Ok(());
    }
}

#[test]
fn changes_propagate_through_a_chain_and_caches_stay_coherent() {
    let (a, b, c) = (
        ProviderKind::custom("alpha").unwrap(),
        ProviderKind::custom("beta").unwrap(),
        ProviderKind::custom("gamma").unwrap(),
    );
    let service = MetadataService::new(Arc::new(DependencyRegistry::new()), ServiceSettings::default());
    let alpha = Link::new(a, "a", None);
    service.register_provider(Arc::<Link>::clone(&alpha)).unwrap();
    service.register_provider(Link::new(b, "b", Some(a))).unwrap();
    service.register_provider(Link::new(c, "c", Some(b))).unwrap();

    assert_eq!(service.get(&foo(c)).unwrap().unwrap().plural(), Some("v0+b+c"));

    alpha.version.store(1, Ordering::SeqCst);
    service.evict_and_notify(&foo(a)).unwrap();
    let cached = service.peek(&foo(c)).flatten().unwrap();
    assert_eq!(cached.plural(), Some("v1+b+c"));

    service.evict_all();
    assert_eq!(service.get(&foo(c)).unwrap().unwrap(), cached);
}

/// Wraps the entity provider, counts computations, and optionally listens
/// to a project-wide kind through a class-level edge.
struct CountedEntity {
    calls: AtomicU64,
    inner: EntityProvider,
    project: Option<ProviderKind>,
}

impl MetadataProvider for CountedEntity {
    fn kind(&self) -> ProviderKind {
        return self.inner.kind();
    }

    fn get_metadata(&self, id: &MetadataId, service: &MetadataService) -> Result<Option<MetadataItem>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        return self.inner.get_metadata(id, service);
    }

    fn start(&self, registry: &DependencyRegistry) -> Result<(), Error> {
        self.inner.start(registry)?;
        if let Some(project) = self.project {
            registry.register_dependency(&project.class_id(), &self.kind().class_id())?;
        }
        return Ok(());
    }

    fn stop(&self, registry: &DependencyRegistry) {
        if let Some(project) = self.project {
            registry.deregister_dependency(&project.class_id(), &self.kind().class_id());
        }
        self.inner.stop(registry);
    }
}

fn counted_entity_service(sources: &Arc<InMemorySources>, entity: &Arc<CountedEntity>) -> Arc<MetadataService> {
    let resolvers = Arc::new(PathResolverRegistry::new());
    resolvers.activate(Arc::new(MavenLayout::single_module("_Itd"))).unwrap();
    let service = MetadataService::new(Arc::new(DependencyRegistry::new()), ServiceSettings::default());
    let repository: Arc<dyn SourceRepository> = Arc::<InMemorySources>::clone(sources);
    service.register_provider(Arc::new(PhysicalTypeProvider::new(resolvers, repository))).unwrap();
    service.register_provider(Arc::new(PluralProvider)).unwrap();
    service.register_provider(Arc::<CountedEntity>::clone(entity)).unwrap();
    return service;
}

#[test]
fn upstream_changes_recompute_the_entity_exactly_once() {
    let project = ProviderKind::custom("project").unwrap();
    let sources = Arc::new(InMemorySources::new());
    sources.put(FOO, "package com.foo; import javax.persistence.Entity; @Entity public class Foo { }");
    let entity =
        Arc::new(CountedEntity { calls: AtomicU64::new(0), inner: EntityProvider::default(), project: Some(project) });
    let service = counted_entity_service(&sources, &entity);
    service.register_provider(Link::new(project, "p", None)).unwrap();

    service.get(&foo(ProviderKind::ENTITY)).unwrap().unwrap();
    service.get(&foo(project)).unwrap().unwrap();
    let before = entity.calls.load(Ordering::SeqCst);
    service.evict_and_notify(&foo(project)).unwrap();
    assert_eq!(entity.calls.load(Ordering::SeqCst), before.saturating_add(1));

    sources.put(FOO, "package com.foo; import javax.persistence.Entity; @Entity public class Foo { int size; }");
    let before = entity.calls.load(Ordering::SeqCst);
    service.evict_and_notify(&MetadataId::physical_type(&JavaType::new("com.foo.Foo"), &LogicalPath::main_java()))
        .unwrap();
    assert_eq!(entity.calls.load(Ordering::SeqCst), before.saturating_add(1));
}

#[test]
fn instance_edges_registered_by_others_survive_recomputation() {
    let project = ProviderKind::custom("project").unwrap();
    let sources = Arc::new(InMemorySources::new());
    sources.put(FOO, "package com.foo; import javax.persistence.Entity; @Entity public class Foo { }");
    let entity = Arc::new(CountedEntity { calls: AtomicU64::new(0), inner: EntityProvider::default(), project: None });
    let service = counted_entity_service(&sources, &entity);
    service.registry().register_dependency(&foo(project), &foo(ProviderKind::ENTITY)).unwrap();

    service.get(&foo(ProviderKind::ENTITY)).unwrap().unwrap();
    assert_eq!(service.registry().upstream(&foo(ProviderKind::ENTITY)), vec![foo(project)]);

    let before = entity.calls.load(Ordering::SeqCst);
    service.registry().notify_downstream(&foo(project));
    assert_eq!(entity.calls.load(Ordering::SeqCst), before.saturating_add(1));
    assert_eq!(service.registry().upstream(&foo(ProviderKind::ENTITY)), vec![foo(project)]);
}

// ── Naming ──

proptest! {
    #[test]
    fn each_collision_adds_one_underscore(collisions in 0_usize..12) {
        let physical = MetadataId::physical_type(&JavaType::new("com.foo.Foo"), &LogicalPath::main_java());
        let mut governor =
            ClassOrInterfaceTypeDetailsBuilder::new(physical.clone(), JavaType::new("com.foo.Foo"), PhysicalTypeCategory::Class);
        for taken in 0..collisions {
            let field_name = format!("{}version", "_".repeat(taken));
            governor.add_field(
                FieldMetadataBuilder::new(physical.clone(), Modifiers::PRIVATE, name(&field_name), JavaType::int_object())
                    .build(),
            );
        }
        let builder =
            ItdTypeDetailsBuilder::new(foo(ProviderKind::ENTITY), Arc::new(governor.build().unwrap()), DEFAULT_MAX_NAME_ATTEMPTS);
        let unique = builder.unique_field_name(&name("version")).unwrap();
        prop_assert_eq!(unique.as_str(), format!("{}version", "_".repeat(collisions)));
    }
}

// ── CLI ──

fn itdgen(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_itdgen"));
    cmd.arg("--root").arg(root);
    return cmd;
}

#[test]
fn generate_then_check_passes_and_hand_edits_are_caught() {
    let dir = tempfile::tempdir().unwrap();
    let java = dir.path().join("src/main/java/com/foo");
    std::fs::create_dir_all(&java).unwrap();
    std::fs::write(
        java.join("Foo.java"),
        "package com.foo; import javax.persistence.Entity; @Entity public class Foo { }",
    )
    .unwrap();

    let generate = itdgen(dir.path()).arg("generate").output().unwrap();
    assert!(generate.status.success(), "generate failed: {}", String::from_utf8_lossy(&generate.stderr));
    let artifact = java.join("Foo_Itd.aj");
    assert!(artifact.exists(), "artifact not written");
    assert!(dir.path().join(".itdgen.lock").exists(), "manifest not written");

    let check = itdgen(dir.path()).arg("check").output().unwrap();
    assert!(check.status.success(), "check failed: {}", String::from_utf8_lossy(&check.stdout));

    std::fs::write(&artifact, "// edited").unwrap();
    let stale = itdgen(dir.path()).arg("check").output().unwrap();
    assert_eq!(stale.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&stale.stdout).contains("artifact edited by hand"));

    let deps = itdgen(dir.path()).args(["deps", "com.foo.Foo"]).output().unwrap();
    assert!(deps.status.success());
    assert!(String::from_utf8_lossy(&deps.stdout).contains("MID#entity?com.foo.Foo|SRC_MAIN_JAVA"));
}
