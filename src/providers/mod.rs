//! Built-in metadata providers.
//!
//! `physical` parses hand-written sources and `plural` derives names.
//! `entity`, `active_record`, and `java_bean` each contribute members to a
//! governor, in that chain order. `companion` assembles the chain into the
//! generated artifact.

pub mod active_record;
pub mod companion;
pub mod entity;
pub mod java_bean;
pub mod physical;
pub mod plural;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Error;
use crate::itd::assembly;
use crate::itd::builder::{Contribution, ItdTypeDetailsBuilder, MemberRequirement, Resolution};
use crate::metadata::dependency::DependencyRegistry;
use crate::metadata::id::{MetadataId, ProviderKind};
use crate::metadata::item::MetadataItem;
use crate::metadata::service::MetadataService;
use crate::model::java_type::{JavaType, Primitive};
use crate::model::member::{FieldMetadata, MethodMetadata, MethodMetadataBuilder, Modifiers, Parameter};
use crate::model::type_details::ClassOrInterfaceTypeDetails;

/// Contributing providers in the order their contributions are merged.
pub const CHAIN: [ProviderKind; 3] = [ProviderKind::ENTITY, ProviderKind::ACTIVE_RECORD, ProviderKind::JAVA_BEAN];

/// Triggers `active_record`.
pub const ACTIVE_RECORD_ANNOTATION: &str = "org.itdgen.annotations.ActiveRecord";
/// Triggers `entity`.
pub const ENTITY_ANNOTATION: &str = "javax.persistence.Entity";
/// Marks the identifier field.
pub const ID_ANNOTATION: &str = "javax.persistence.Id";
/// Triggers `java_bean`.
pub const JAVA_BEAN_ANNOTATION: &str = "org.itdgen.annotations.JavaBean";
/// Overrides the derived plural: `@Plural("People")`.
pub const PLURAL_ANNOTATION: &str = "org.itdgen.annotations.Plural";
/// Marks the optimistic-locking field.
pub const VERSION_ANNOTATION: &str = "javax.persistence.Version";

/// The hand-written details of the governor named by `id`.
///
/// # Errors
///
/// Propagates errors from the physical-type provider.
pub fn physical_details(
    service: &MetadataService,
    id: &MetadataId,
) -> Result<Option<Arc<ClassOrInterfaceTypeDetails>>, Error> {
    let item = service.get(&id.with_kind(ProviderKind::PHYSICAL_TYPE))?;
    return Ok(item.and_then(|item| return item.physical_type().cloned()));
}

/// Items of the registered `kinds` for the governor named by `id`, in order.
/// Kinds without a registered provider are skipped.
///
/// # Errors
///
/// Propagates the first provider error.
pub fn chain_items(
    service: &MetadataService,
    id: &MetadataId,
    kinds: &[ProviderKind],
) -> Result<Vec<Arc<MetadataItem>>, Error> {
    let mut items = Vec::new();
    for kind in kinds {
        if !service.has_provider(*kind) {
            continue;
        }
        if let Some(item) = service.get(&id.with_kind(*kind))? {
            items.push(item);
        }
    }
    return Ok(items);
}

/// The governor as the chain link `kind` sees it: hand-written members plus
/// everything contributed earlier in `CHAIN`.
///
/// # Errors
///
/// Propagates provider errors and `ConflictingContributions`.
pub fn governor_view(
    service: &MetadataService,
    id: &MetadataId,
    kind: ProviderKind,
) -> Result<Option<Arc<ClassOrInterfaceTypeDetails>>, Error> {
    let Some(physical) = physical_details(service, id)? else {
        return Ok(None);
    };
    let earlier: Vec<ProviderKind> = CHAIN.iter().copied().take_while(|k| return *k != kind).collect();
    let items = chain_items(service, id, &earlier)?;
    let contributions: Vec<&Contribution> = items.iter().filter_map(|i| return i.contribution()).collect();
    if contributions.is_empty() {
        return Ok(Some(physical));
    }
    return Ok(Some(Arc::new(assembly::accumulated_view(&physical, &contributions)?)));
}

/// Register `upstreams → kind` class-level edges.
///
/// # Errors
///
/// Propagates registry errors.
pub fn register_class_edges(
    registry: &DependencyRegistry,
    upstreams: &[ProviderKind],
    kind: ProviderKind,
) -> Result<(), Error> {
    for upstream in upstreams {
        registry.register_dependency(&upstream.class_id(), &kind.class_id())?;
    }
    return Ok(());
}

/// Remove what `register_class_edges` added.
pub fn deregister_class_edges(registry: &DependencyRegistry, upstreams: &[ProviderKind], kind: ProviderKind) {
    for upstream in upstreams {
        registry.deregister_dependency(&upstream.class_id(), &kind.class_id());
    }
}

/// The superclass edge each item of one provider registered, so a
/// recompute replaces only that edge and leaves edges other parties
/// registered on the same id alone.
#[derive(Debug, Default)]
pub struct ParentLinks {
    /// Child id to the upstream id it was last linked to.
    links: Mutex<HashMap<MetadataId, MetadataId>>,
}

impl ParentLinks {
    /// Point `child` at `parent`, dropping the edge from its previous
    /// parent when that changed. `None` drops the link altogether.
    ///
    /// # Errors
    ///
    /// Propagates registry errors; the previous link is kept on failure.
    pub fn relink(
        &self,
        registry: &DependencyRegistry,
        child: &MetadataId,
        parent: Option<&MetadataId>,
    ) -> Result<(), Error> {
        if let Some(parent) = parent {
            registry.register_dependency(parent, child)?;
        }
        let previous = match parent {
            Some(parent) => self.links.lock().insert(child.clone(), parent.clone()),
            None => self.links.lock().remove(child),
        };
        if let Some(previous) = previous.filter(|p| return Some(p) != parent) {
            registry.deregister_dependency(&previous, child);
        }
        return Ok(());
    }
}

// ── Accessors ──

/// Request the bean getter of `field`. A user-written getter must be public
/// and return the field's type.
///
/// # Errors
///
/// `ContractViolation` for a mismatching user getter; builder errors.
pub fn request_getter(
    builder: &mut ItdTypeDetailsBuilder,
    field: &FieldMetadata,
) -> Result<Resolution<MethodMetadata>, Error> {
    let boolean = field.field_type() == &JavaType::primitive(Primitive::Boolean);
    let getter = MethodMetadataBuilder::new(
        builder.declared_by().clone(),
        Modifiers::PUBLIC,
        field.field_name().getter(boolean),
        field.field_type().clone(),
    )
    .body(&format!("return this.{};", field.field_name()))
    .build();
    let requirement = MemberRequirement::new().of_type(field.field_type().clone()).public();
    return builder.request_method(getter, Some(&requirement));
}

/// Request the bean setter of `field`.
///
/// # Errors
///
/// Builder errors.
pub fn request_setter(
    builder: &mut ItdTypeDetailsBuilder,
    field: &FieldMetadata,
) -> Result<Resolution<MethodMetadata>, Error> {
    let name = field.field_name();
    let setter = MethodMetadataBuilder::new(
        builder.declared_by().clone(),
        Modifiers::PUBLIC,
        name.setter(),
        JavaType::void(),
    )
    .parameter(Parameter::new(name.clone(), field.field_type().clone()))
    .body(&format!("this.{name} = {name};"))
    .build();
    return builder.request_method(setter, None);
}
