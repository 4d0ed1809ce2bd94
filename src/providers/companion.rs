//! The assembled ITD for a governor: every chain contribution folded into
//! one synthetic type and rendered as artifact text.

use std::sync::Arc;

use crate::error::Error;
use crate::itd::builder::Contribution;
use crate::itd::{assembly, render};
use crate::metadata::dependency::DependencyRegistry;
use crate::metadata::id::{MetadataId, ProviderKind};
use crate::metadata::item::{Companion, MetadataBody, MetadataItem};
use crate::metadata::provider::{self, MetadataProvider};
use crate::metadata::service::MetadataService;
use crate::model::java_type::JavaType;
use crate::providers::{self, CHAIN};

/// Upstream kinds.
const UPSTREAMS: [ProviderKind; 4] =
    [ProviderKind::PHYSICAL_TYPE, ProviderKind::ENTITY, ProviderKind::ACTIVE_RECORD, ProviderKind::JAVA_BEAN];

/// Serves `MID#itd` items.
#[derive(Debug, Clone)]
pub struct CompanionProvider {
    /// Appended to the governor's name to form the artifact name.
    artifact_suffix: String,
}

impl CompanionProvider {
    /// A provider naming artifacts `{Governor}{suffix}`.
    pub fn new(artifact_suffix: &str) -> Self {
        return Self { artifact_suffix: artifact_suffix.to_string() };
    }

    /// Name of the artifact generated for `governor`.
    pub fn artifact_type(&self, governor: &JavaType) -> JavaType {
        return JavaType::new(&format!("{}{}", governor.fully_qualified_name(), self.artifact_suffix));
    }
}

impl MetadataProvider for CompanionProvider {
    fn kind(&self) -> ProviderKind {
        return ProviderKind::COMPANION;
    }

    fn get_metadata(&self, id: &MetadataId, service: &MetadataService) -> Result<Option<MetadataItem>, Error> {
        provider::ensure_owned(self.kind(), id)?;
        let Some(governor) = providers::physical_details(service, id)? else {
            return Ok(None);
        };
        let items = providers::chain_items(service, id, &CHAIN)?;
        let contributions: Vec<&Contribution> =
            items.iter().filter_map(|i| return i.contribution()).filter(|c| return !c.is_empty()).collect();
        if contributions.is_empty() {
            tracing::trace!(%id, "nothing to generate");
            return Ok(None);
        }

        let artifact_type = self.artifact_type(governor.name());
        let assembled = assembly::assemble(&governor, id, &artifact_type, &contributions)?;
        let rendered = render::render(&assembled.itd, governor.name());
        tracing::debug!(%id, artifact = %artifact_type, contributions = contributions.len(), "companion assembled");

        let companion = Companion {
            artifact_type,
            itd: Arc::new(assembled.itd),
            merged: Arc::new(assembled.merged),
            rendered,
        };
        return Ok(Some(MetadataItem::new(id.clone(), MetadataBody::Companion(companion))));
    }

    fn start(&self, registry: &DependencyRegistry) -> Result<(), Error> {
        return providers::register_class_edges(registry, &UPSTREAMS, self.kind());
    }

    fn stop(&self, registry: &DependencyRegistry) {
        providers::deregister_class_edges(registry, &UPSTREAMS, self.kind());
    }
}
