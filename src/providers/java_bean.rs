//! Bean accessors for `@JavaBean` types.

use std::sync::Arc;

use crate::error::Error;
use crate::itd::builder::ItdTypeDetailsBuilder;
use crate::metadata::dependency::DependencyRegistry;
use crate::metadata::id::{MetadataId, ProviderKind};
use crate::metadata::item::{MetadataBody, MetadataItem};
use crate::metadata::provider::{self, MetadataProvider};
use crate::metadata::service::MetadataService;
use crate::model::java_type::JavaType;
use crate::model::member::{DeclaredMember, FieldMetadata, Modifiers};
use crate::providers::{self, JAVA_BEAN_ANNOTATION};

/// Upstream kinds.
const UPSTREAMS: [ProviderKind; 3] = [ProviderKind::PHYSICAL_TYPE, ProviderKind::ENTITY, ProviderKind::ACTIVE_RECORD];

/// Serves `MID#java_bean` contributions: a getter for every hand-written
/// instance field and a setter for the non-final ones.
#[derive(Debug, Default)]
pub struct JavaBeanProvider;

impl MetadataProvider for JavaBeanProvider {
    fn kind(&self) -> ProviderKind {
        return ProviderKind::JAVA_BEAN;
    }

    fn get_metadata(&self, id: &MetadataId, service: &MetadataService) -> Result<Option<MetadataItem>, Error> {
        provider::ensure_owned(self.kind(), id)?;
        let Some(governor) = providers::governor_view(service, id, self.kind())? else {
            return Ok(None);
        };
        if !governor.has_annotation(&JavaType::new(JAVA_BEAN_ANNOTATION)) {
            return Ok(None);
        }

        let fields: Vec<FieldMetadata> =
            governor.fields().iter().filter(|f| return is_property(f)).cloned().collect();
        let mut builder = ItdTypeDetailsBuilder::new(id.clone(), Arc::clone(&governor), service.settings().max_name_attempts);
        for field in &fields {
            providers::request_getter(&mut builder, field)?;
            if !field.modifiers().contains(Modifiers::FINAL) {
                providers::request_setter(&mut builder, field)?;
            }
        }
        tracing::trace!(%id, properties = fields.len(), "bean accessors requested");

        return Ok(Some(MetadataItem::new(id.clone(), MetadataBody::Contribution(builder.build()))));
    }

    fn start(&self, registry: &DependencyRegistry) -> Result<(), Error> {
        return providers::register_class_edges(registry, &UPSTREAMS, self.kind());
    }

    fn stop(&self, registry: &DependencyRegistry) {
        providers::deregister_class_edges(registry, &UPSTREAMS, self.kind());
    }
}

/// Hand-written instance fields become properties.
fn is_property(field: &FieldMetadata) -> bool {
    return field.is_user_declared() && !field.modifiers().is_static();
}
