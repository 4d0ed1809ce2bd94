//! One wired-up project: sources, the active path resolver, the dependency
//! registry, the metadata service, and the reference providers.

use std::sync::Arc;

use indexmap::IndexSet;

use crate::config::Config;
use crate::dispatch::ChangeDispatcher;
use crate::error::Error;
use crate::metadata::dependency::DependencyRegistry;
use crate::metadata::id::{MetadataId, ProviderKind};
use crate::metadata::service::MetadataService;
use crate::path_resolver::{MavenLayout, PathResolver, PathResolverRegistry};
use crate::project::SourceRepository;
use crate::providers::active_record::ActiveRecordProvider;
use crate::providers::companion::CompanionProvider;
use crate::providers::entity::EntityProvider;
use crate::providers::java_bean::JavaBeanProvider;
use crate::providers::physical::PhysicalTypeProvider;
use crate::providers::plural::PluralProvider;

/// The metadata system for one project.
pub struct Engine {
    /// Routes file changes into the service.
    dispatcher: ChangeDispatcher,
    /// Holds the active layout.
    resolvers: Arc<PathResolverRegistry>,
    /// Cache and provider dispatch.
    service: Arc<MetadataService>,
    /// Where hand-written sources come from.
    sources: Arc<dyn SourceRepository>,
}

impl Engine {
    /// Wire up a project described by `config` over `sources`.
    ///
    /// # Errors
    ///
    /// Propagates provider registration errors.
    pub fn new(config: &Config, sources: Arc<dyn SourceRepository>) -> Result<Self, Error> {
        let resolvers = Arc::new(PathResolverRegistry::new());
        resolvers.activate(Arc::new(MavenLayout::new(config.modules.clone(), &config.artifact_suffix)))?;

        let service = MetadataService::new(Arc::new(DependencyRegistry::new()), config.service_settings());
        service.register_provider(Arc::new(PhysicalTypeProvider::new(Arc::clone(&resolvers), Arc::clone(&sources))))?;
        service.register_provider(Arc::new(PluralProvider))?;
        service.register_provider(Arc::new(EntityProvider::default()))?;
        service.register_provider(Arc::new(ActiveRecordProvider))?;
        service.register_provider(Arc::new(JavaBeanProvider))?;
        service.register_provider(Arc::new(CompanionProvider::new(&config.artifact_suffix)))?;
        tracing::debug!(providers = ?service.provider_kinds(), "engine ready");

        let dispatcher = ChangeDispatcher::new(Arc::clone(&resolvers), Arc::clone(&service));
        return Ok(Self { dispatcher, resolvers, service, sources });
    }

    /// Companion ids of every governor currently in the sources, in path order.
    ///
    /// # Errors
    ///
    /// Listing errors; `IllegalArgument` without an active resolver.
    pub fn companion_ids(&self) -> Result<Vec<MetadataId>, Error> {
        let resolver = self.resolver()?;
        let ids: IndexSet<MetadataId> = self
            .sources
            .list()?
            .iter()
            .filter_map(|path| return resolver.physical_type_id(path))
            .map(|id| return id.with_kind(ProviderKind::COMPANION))
            .collect();
        return Ok(ids.into_iter().collect());
    }

    /// File-change entry point.
    pub const fn dispatcher(&self) -> &ChangeDispatcher {
        return &self.dispatcher;
    }

    /// The dependency graph.
    pub fn registry(&self) -> &Arc<DependencyRegistry> {
        return self.service.registry();
    }

    /// The active path resolver.
    ///
    /// # Errors
    ///
    /// `IllegalArgument` when none is active.
    pub fn resolver(&self) -> Result<Arc<dyn PathResolver>, Error> {
        return self.resolvers.active();
    }

    /// The metadata service.
    pub const fn service(&self) -> &Arc<MetadataService> {
        return &self.service;
    }

    /// The source repository.
    pub const fn sources(&self) -> &Arc<dyn SourceRepository> {
        return &self.sources;
    }
}
