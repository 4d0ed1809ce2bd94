//! Provider dispatch and the metadata cache.
//!
//! `MetadataService` answers "give me the item for this id": it finds the
//! provider owning the id's kind, memoises the answer (absent answers too),
//! and listens to the dependency registry so that a change upstream evicts
//! and recomputes downstream items. Downstream of a recomputed item is only
//! notified when its value actually changed, which is what lets cyclic
//! graphs settle.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use indexmap::IndexSet;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};

use crate::error::Error;
use crate::itd::builder::DEFAULT_MAX_NAME_ATTEMPTS;
use crate::metadata::dependency::{DependencyRegistry, ListenerHandle, NotificationListener};
use crate::metadata::id::{MetadataId, ProviderKind};
use crate::metadata::item::MetadataItem;
use crate::metadata::provider::MetadataProvider;

/// Cached answer for one id; `None` records that the item does not exist.
type CacheEntry = Option<Arc<MetadataItem>>;

/// Tunables for the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Maximum number of cached ids.
    pub cache_capacity: usize,
    /// Cap on `_` prefixes when providers pick field names.
    pub max_name_attempts: usize,
    /// Rounds of deferred recomputation before giving up.
    pub max_retry_rounds: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        return Self {
            cache_capacity: 1024,
            max_name_attempts: DEFAULT_MAX_NAME_ATTEMPTS,
            max_retry_rounds: 8,
        };
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Configured capacity.
    pub capacity: usize,
    /// Provider invocations.
    pub computes: u64,
    /// Entries dropped by notifications or explicit eviction.
    pub evictions: u64,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to compute.
    pub misses: u64,
    /// Entries currently cached.
    pub size: usize,
}

/// A provider error raised while recomputing in response to a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFailure {
    /// The id whose recompute failed.
    pub id: MetadataId,
    /// Rendered error.
    pub message: String,
}

/// Dispatches `get` requests to providers and caches the results.
pub struct MetadataService {
    /// Ids currently being computed, outermost first.
    active: Mutex<IndexSet<MetadataId>>,
    /// Memoised answers.
    cache: Mutex<LruCache<MetadataId, CacheEntry>>,
    /// Provider invocations.
    computes: AtomicU64,
    /// Set while deferred ids are being retried.
    draining: AtomicBool,
    /// Entries dropped by eviction.
    evictions: AtomicU64,
    /// Notification-driven failures not yet collected.
    failures: Mutex<Vec<MetadataFailure>>,
    /// Cache hits.
    hits: AtomicU64,
    /// Our registration with the registry.
    listener: Mutex<Option<ListenerHandle>>,
    /// Cache misses.
    misses: AtomicU64,
    /// Providers keyed by kind token.
    providers: RwLock<HashMap<&'static str, Arc<dyn MetadataProvider>>>,
    /// The dependency graph this service listens to.
    registry: Arc<DependencyRegistry>,
    /// Ids whose computation saw an in-flight upstream and must rerun.
    retry: Mutex<IndexSet<MetadataId>>,
    /// Tunables.
    settings: ServiceSettings,
}

impl MetadataService {
    /// Create a service and subscribe it to `registry`.
    pub fn new(registry: Arc<DependencyRegistry>, settings: ServiceSettings) -> Arc<Self> {
        let capacity = NonZeroUsize::new(settings.cache_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        let service = Arc::new(Self {
            active: Mutex::new(IndexSet::new()),
            cache: Mutex::new(LruCache::new(capacity)),
            computes: AtomicU64::new(0),
            draining: AtomicBool::new(false),
            evictions: AtomicU64::new(0),
            failures: Mutex::new(Vec::new()),
            hits: AtomicU64::new(0),
            listener: Mutex::new(None),
            misses: AtomicU64::new(0),
            providers: RwLock::new(HashMap::new()),
            registry: Arc::clone(&registry),
            retry: Mutex::new(IndexSet::new()),
            settings,
        });
        let listener: Arc<dyn NotificationListener> = service.clone();
        *service.listener.lock() = Some(registry.add_notification_listener(&listener));
        return service;
    }

    /// The registry this service listens to.
    pub const fn registry(&self) -> &Arc<DependencyRegistry> {
        return &self.registry;
    }

    /// Tunables.
    pub const fn settings(&self) -> ServiceSettings {
        return self.settings;
    }

    // ── Providers ──

    /// Add a provider and start it.
    ///
    /// # Errors
    ///
    /// `IllegalArgument` if a provider for the kind is already registered;
    /// whatever the provider's `start` returns.
    pub fn register_provider(&self, provider: Arc<dyn MetadataProvider>) -> Result<(), Error> {
        let kind = provider.kind();
        {
            let mut providers = self.providers.write();
            if providers.contains_key(kind.token()) {
                return Err(Error::IllegalArgument {
                    reason: format!("a provider for kind `{kind}` is already registered"),
                });
            }
            providers.insert(kind.token(), Arc::clone(&provider));
        }
        if let Err(err) = provider.start(&self.registry) {
            self.providers.write().remove(kind.token());
            return Err(err);
        }
        tracing::debug!(%kind, "provider registered");
        return Ok(());
    }

    /// Stop and remove the provider for `kind`, dropping its cached items.
    pub fn deregister_provider(&self, kind: ProviderKind) {
        let Some(provider) = self.providers.write().remove(kind.token()) else {
            return;
        };
        provider.stop(&self.registry);
        let mut cache = self.cache.lock();
        let owned: Vec<MetadataId> = cache.iter().filter(|(id, _)| return kind.owns(id)).map(|(id, _)| return id.clone()).collect();
        for id in &owned {
            cache.pop(id);
        }
        tracing::debug!(%kind, evicted = owned.len(), "provider deregistered");
    }

    /// Whether a provider owns `kind`.
    pub fn has_provider(&self, kind: ProviderKind) -> bool {
        return self.providers.read().contains_key(kind.token());
    }

    /// Kinds with a registered provider, sorted.
    pub fn provider_kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<&'static str> = self.providers.read().keys().copied().collect();
        kinds.sort_unstable();
        return kinds;
    }

    // ── Lookup ──

    /// The item for `id`, computing and caching it on a miss.
    ///
    /// A request for an id that is already being computed further up the
    /// call stack returns `Ok(None)`; the requesting item is recomputed once
    /// the outermost request finishes.
    ///
    /// # Errors
    ///
    /// `IllegalArgument` for class-level ids, `UnknownProvider` when no
    /// provider owns the kind, and any provider error.
    pub fn get(&self, id: &MetadataId) -> Result<Option<Arc<MetadataItem>>, Error> {
        if id.is_class_level() {
            return Err(Error::IllegalArgument {
                reason: format!("cannot get class-level id `{id}`"),
            });
        }
        if let Some(entry) = self.cache.lock().get(id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        return self.compute(id);
    }

    /// The cached answer without computing. `None` means not cached;
    /// `Some(None)` means cached as absent.
    pub fn peek(&self, id: &MetadataId) -> Option<CacheEntry> {
        return self.cache.lock().peek(id).cloned();
    }

    /// Drop the cached answer for `id`.
    pub fn evict(&self, id: &MetadataId) {
        if self.cache.lock().pop(id).is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drop every cached answer.
    pub fn evict_all(&self) {
        let mut cache = self.cache.lock();
        let count = u64::try_from(cache.len()).unwrap_or(u64::MAX);
        cache.clear();
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Evict `id`, recompute it, and notify its downstream whatever the
    /// outcome. Used when the source behind `id` changed.
    ///
    /// # Errors
    ///
    /// As for `get`; downstream is notified before the error is returned.
    pub fn evict_and_notify(&self, id: &MetadataId) -> Result<Option<Arc<MetadataItem>>, Error> {
        self.evict(id);
        let current = self.get(id);
        self.registry.notify_downstream(id);
        return current;
    }

    /// Evict and recompute `id`, notifying downstream only if the value
    /// changed. Failures are recorded rather than returned. Returns whether
    /// the value changed.
    pub fn refresh(&self, id: &MetadataId) -> bool {
        if self.active.lock().contains(id) {
            tracing::debug!(%id, "refresh of in-flight id deferred");
            self.retry.lock().insert(id.clone());
            return false;
        }
        let previous = self.cache.lock().pop(id);
        if previous.is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        match self.compute(id) {
            Ok(current) => {
                if previous.flatten() == current {
                    tracing::trace!(%id, "recomputed value unchanged");
                    return false;
                }
                tracing::debug!(%id, "recomputed value changed");
                self.registry.notify_downstream(id);
                return true;
            },
            Err(err) => {
                tracing::warn!(%id, error = %err, "metadata recompute failed");
                self.failures.lock().push(MetadataFailure { id: id.clone(), message: err.to_string() });
                return false;
            },
        }
    }

    /// Collect and clear the recorded failures.
    pub fn take_failures(&self) -> Vec<MetadataFailure> {
        return std::mem::take(&mut *self.failures.lock());
    }

    /// Cache counters.
    pub fn stats(&self) -> CacheStats {
        let cache = self.cache.lock();
        return CacheStats {
            capacity: cache.cap().get(),
            computes: self.computes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: cache.len(),
        };
    }

    // ── Internals ──

    /// Provider owning `id`'s kind.
    fn provider_for(&self, id: &MetadataId) -> Result<Arc<dyn MetadataProvider>, Error> {
        return self.providers.read().get(id.kind()).cloned().ok_or_else(|| {
            return Error::UnknownProvider { id: id.to_string(), kind: id.kind().to_string() };
        });
    }

    /// Run the provider for `id` and cache the answer.
    fn compute(&self, id: &MetadataId) -> Result<Option<Arc<MetadataItem>>, Error> {
        let provider = self.provider_for(id)?;
        {
            let mut active = self.active.lock();
            if active.contains(id) {
                let requester = active.last().cloned();
                drop(active);
                tracing::debug!(%id, "reentrant request deferred");
                if let Some(requester) = requester {
                    self.retry.lock().insert(requester);
                }
                return Ok(None);
            }
            active.insert(id.clone());
        }

        self.computes.fetch_add(1, Ordering::Relaxed);
        let result = {
            let _span = tracing::debug_span!("get_metadata", %id).entered();
            provider.get_metadata(id, self)
        };

        let outermost = {
            let mut active = self.active.lock();
            active.shift_remove(id);
            active.is_empty()
        };
        let outcome = match result {
            Ok(item) => {
                let entry = item.map(Arc::new);
                self.cache.lock().put(id.clone(), entry.clone());
                Ok(entry)
            },
            Err(err) => {
                self.cache.lock().pop(id);
                Err(err)
            },
        };
        if outermost {
            self.drain_retries();
        }
        return outcome;
    }

    /// Recompute deferred ids until none remain or the round limit hits.
    fn drain_retries(&self) {
        if self.draining.swap(true, Ordering::AcqRel) {
            return;
        }
        for round in 0..self.settings.max_retry_rounds {
            let pending: Vec<MetadataId> = self.retry.lock().drain(..).collect();
            if pending.is_empty() {
                break;
            }
            tracing::debug!(round, pending = pending.len(), "retrying deferred metadata");
            for id in &pending {
                self.refresh(id);
            }
        }
        let abandoned: Vec<MetadataId> = self.retry.lock().drain(..).collect();
        if !abandoned.is_empty() {
            tracing::warn!(
                count = abandoned.len(),
                rounds = self.settings.max_retry_rounds,
                "deferred metadata did not settle"
            );
        }
        self.draining.store(false, Ordering::Release);
    }
}

impl NotificationListener for MetadataService {
    fn notify(&self, upstream: &MetadataId, downstream: Option<&MetadataId>) {
        let Some(downstream) = downstream else {
            return;
        };
        let target = if downstream.is_class_level() {
            let provider = self.providers.read().get(downstream.kind()).cloned();
            let Some(resolved) = provider.and_then(|p| return p.resolve_downstream(upstream)) else {
                return;
            };
            resolved
        } else {
            downstream.clone()
        };
        if target == *upstream {
            return;
        }
        if self.provider_for(&target).is_err() {
            tracing::trace!(id = %target, "no provider for notified id");
            self.evict(&target);
            return;
        }
        self.refresh(&target);
    }
}

impl Drop for MetadataService {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.lock().take() {
            self.registry.remove_notification_listener(handle);
        }
    }
}
