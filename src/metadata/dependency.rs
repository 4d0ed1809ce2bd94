//! Directed dependency graph between metadata identifiers and the
//! notification walk that drives recomputation.
//!
//! The registry only knows about edges. It has no notion of which
//! identifiers currently exist, so edges naming unknown ids are fine and
//! stale edges merely cause redundant notifications.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::Mutex;

use crate::error::Error;
use crate::metadata::id::MetadataId;

/// Receives dependency notifications.
pub trait NotificationListener: Send + Sync {
    /// Called once per downstream of a changed upstream with
    /// `Some(downstream)`, then once with `None` after the walk so
    /// general-purpose listeners hear about the upstream itself.
    fn notify(&self, upstream: &MetadataId, downstream: Option<&MetadataId>);
}

/// Handle returned when a listener is added; used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// Both directions of the edge set. Insertion order is kept per node so
/// notifications follow registration order.
#[derive(Debug, Default)]
struct Graph {
    /// upstream → downstreams
    downstream: HashMap<MetadataId, IndexSet<MetadataId>>,
    /// downstream → upstreams
    upstream: HashMap<MetadataId, IndexSet<MetadataId>>,
}

impl Graph {
    /// Remove one edge, dropping empty adjacency sets.
    fn remove(&mut self, upstream: &MetadataId, downstream: &MetadataId) -> bool {
        let mut removed = false;
        if let Some(set) = self.downstream.get_mut(upstream) {
            removed = set.shift_remove(downstream);
            if set.is_empty() {
                self.downstream.remove(upstream);
            }
        }
        if let Some(set) = self.upstream.get_mut(downstream) {
            set.shift_remove(upstream);
            if set.is_empty() {
                self.upstream.remove(downstream);
            }
        }
        return removed;
    }
}

/// A registered listener, held weakly so the registry never keeps a
/// listener (typically the metadata service) alive on its own.
struct ListenerEntry {
    /// Identity used for removal.
    handle: ListenerHandle,
    /// The listener itself.
    listener: Weak<dyn NotificationListener>,
}

/// The process-wide dependency graph plus its listeners.
///
/// Each structure sits behind one coarse lock. Locks are never held while
/// listeners run, so providers may add or remove edges and listeners from
/// inside a notification for a different upstream.
pub struct DependencyRegistry {
    /// The edge set.
    graph: Mutex<Graph>,
    /// Listeners in registration order.
    listeners: Mutex<Vec<ListenerEntry>>,
    /// Source of listener handles.
    next_handle: AtomicU64,
}

impl Default for DependencyRegistry {
    fn default() -> Self {
        return Self::new();
    }
}

impl DependencyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        return Self {
            graph: Mutex::new(Graph::default()),
            listeners: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
        };
    }

    /// Add a listener. The registry keeps only a weak reference; the
    /// caller owns the listener's lifetime.
    pub fn add_notification_listener(&self, listener: &Arc<dyn NotificationListener>) -> ListenerHandle {
        let handle = ListenerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push(ListenerEntry { handle, listener: Arc::downgrade(listener) });
        return handle;
    }

    /// Remove a listener. Unknown handles are ignored.
    pub fn remove_notification_listener(&self, handle: ListenerHandle) {
        self.listeners.lock().retain(|entry| return entry.handle != handle);
    }

    /// Record that `downstream` must be recomputed when `upstream` changes.
    /// Registering an existing edge has no further effect.
    ///
    /// # Errors
    ///
    /// Returns `Error::IllegalArgument` for a self edge; an id never
    /// depends on itself. Blank ids cannot reach here: `MetadataId` is only
    /// built from a valid kind token.
    pub fn register_dependency(&self, upstream: &MetadataId, downstream: &MetadataId) -> Result<(), Error> {
        if upstream == downstream {
            return Err(Error::IllegalArgument {
                reason: format!("`{upstream}` cannot depend on itself"),
            });
        }
        let mut graph = self.graph.lock();
        let added = graph.downstream.entry(upstream.clone()).or_default().insert(downstream.clone());
        graph.upstream.entry(downstream.clone()).or_default().insert(upstream.clone());
        if added {
            tracing::trace!(%upstream, %downstream, "dependency registered");
        }
        return Ok(());
    }

    /// Remove an edge. Removing a missing edge is a no-op.
    pub fn deregister_dependency(&self, upstream: &MetadataId, downstream: &MetadataId) {
        if self.graph.lock().remove(upstream, downstream) {
            tracing::trace!(%upstream, %downstream, "dependency deregistered");
        }
    }

    /// Remove every edge pointing at `downstream`.
    pub fn deregister_all_upstream(&self, downstream: &MetadataId) {
        let mut graph = self.graph.lock();
        let upstreams: Vec<MetadataId> =
            graph.upstream.get(downstream).map(|set| return set.iter().cloned().collect()).unwrap_or_default();
        for upstream in &upstreams {
            graph.remove(upstream, downstream);
        }
    }

    /// Direct downstreams of `upstream`, in registration order.
    pub fn downstream(&self, upstream: &MetadataId) -> Vec<MetadataId> {
        return self
            .graph
            .lock()
            .downstream
            .get(upstream)
            .map(|set| return set.iter().cloned().collect())
            .unwrap_or_default();
    }

    /// Direct upstreams of `downstream`, in registration order.
    pub fn upstream(&self, downstream: &MetadataId) -> Vec<MetadataId> {
        return self
            .graph
            .lock()
            .upstream
            .get(downstream)
            .map(|set| return set.iter().cloned().collect())
            .unwrap_or_default();
    }

    /// Total number of registered edges.
    pub fn edge_count(&self) -> usize {
        return self.graph.lock().downstream.values().map(IndexSet::len).sum();
    }

    /// Whether adding the edge would keep the graph acyclic. This is an
    /// advisory query; registration itself does not enforce it.
    pub fn is_valid_dependency(&self, upstream: &MetadataId, downstream: &MetadataId) -> bool {
        if upstream == downstream {
            return false;
        }
        let graph = self.graph.lock();
        let mut seen: HashSet<&MetadataId> = HashSet::new();
        let mut queue: VecDeque<&MetadataId> = VecDeque::from([downstream]);
        while let Some(node) = queue.pop_front() {
            if node == upstream {
                return false;
            }
            if !seen.insert(node) {
                continue;
            }
            if let Some(next) = graph.downstream.get(node) {
                queue.extend(next.iter());
            }
        }
        return true;
    }

    /// Tell every listener that `upstream` changed.
    ///
    /// Listeners are invoked for each direct downstream in registration
    /// order, then for each downstream registered against the upstream's
    /// class-level id (skipping ids already notified and the upstream
    /// itself), then once with no downstream. Transitive propagation is
    /// left to listeners that re-notify for ids whose value changed.
    pub fn notify_downstream(&self, upstream: &MetadataId) {
        let _span = tracing::debug_span!("notify_downstream", %upstream).entered();
        let listeners = self.live_listeners();
        let mut notified: HashSet<MetadataId> = HashSet::new();

        for downstream in self.downstream(upstream) {
            Self::dispatch(&listeners, upstream, &downstream);
            notified.insert(downstream);
        }

        if !upstream.is_class_level() {
            for downstream in self.downstream(&upstream.class_id()) {
                if notified.contains(&downstream) || downstream == *upstream {
                    continue;
                }
                Self::dispatch(&listeners, upstream, &downstream);
                notified.insert(downstream);
            }
        }

        for listener in &listeners {
            listener.notify(upstream, None);
        }
        tracing::debug!(%upstream, notified = notified.len(), "notification walk complete");
    }

    /// Invoke every listener for one downstream.
    fn dispatch(listeners: &[Arc<dyn NotificationListener>], upstream: &MetadataId, downstream: &MetadataId) {
        tracing::trace!(%upstream, %downstream, "notify");
        for listener in listeners {
            listener.notify(upstream, Some(downstream));
        }
    }

    /// Upgrade live listeners and prune dead ones.
    fn live_listeners(&self) -> Vec<Arc<dyn NotificationListener>> {
        let mut entries = self.listeners.lock();
        entries.retain(|entry| return entry.listener.strong_count() > 0);
        return entries.iter().filter_map(|entry| return entry.listener.upgrade()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::id::ProviderKind;
    use crate::model::java_type::{JavaType, LogicalPath};

    /// Records every notification it receives.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl NotificationListener for Recorder {
        fn notify(&self, upstream: &MetadataId, downstream: Option<&MetadataId>) {
            self.calls.lock().push((upstream.to_string(), downstream.map(ToString::to_string)));
        }
    }

    fn id(kind: &'static str, fqn: &str) -> MetadataId {
        return ProviderKind::custom(kind).unwrap().instance_id(&JavaType::new(fqn), &LogicalPath::main_java());
    }

    fn recorder(registry: &DependencyRegistry) -> Arc<Recorder> {
        let recorder = Arc::new(Recorder::default());
        let listener: Arc<dyn NotificationListener> = recorder.clone();
        registry.add_notification_listener(&listener);
        return recorder;
    }

    #[test]
    fn registration_is_idempotent_and_ordered() {
        let registry = DependencyRegistry::new();
        let up = id("a", "x.A");
        registry.register_dependency(&up, &id("b", "x.B")).unwrap();
        registry.register_dependency(&up, &id("c", "x.C")).unwrap();
        registry.register_dependency(&up, &id("b", "x.B")).unwrap();

        assert_eq!(registry.edge_count(), 2);
        assert_eq!(registry.downstream(&up), vec![id("b", "x.B"), id("c", "x.C")]);
        assert_eq!(registry.upstream(&id("c", "x.C")), vec![up]);
    }

    #[test]
    fn deregistering_missing_edge_is_a_no_op() {
        let registry = DependencyRegistry::new();
        registry.deregister_dependency(&id("a", "x.A"), &id("b", "x.B"));
        registry.register_dependency(&id("a", "x.A"), &id("b", "x.B")).unwrap();
        registry.deregister_dependency(&id("a", "x.A"), &id("b", "x.B"));
        registry.deregister_dependency(&id("a", "x.A"), &id("b", "x.B"));
        assert_eq!(registry.edge_count(), 0);
    }

    #[test]
    fn self_edges_are_rejected() {
        let registry = DependencyRegistry::new();
        let a = id("a", "x.A");
        assert!(matches!(registry.register_dependency(&a, &a), Err(Error::IllegalArgument { .. })));
    }

    #[test]
    fn notification_visits_direct_downstreams_in_order_then_general_listeners() {
        let registry = DependencyRegistry::new();
        let recorder = recorder(&registry);
        let up = id("a", "x.A");
        registry.register_dependency(&up, &id("c", "x.C")).unwrap();
        registry.register_dependency(&up, &id("b", "x.B")).unwrap();
        registry.register_dependency(&id("b", "x.B"), &id("d", "x.D")).unwrap();

        registry.notify_downstream(&up);

        let calls = recorder.calls.lock().clone();
        let downstreams: Vec<Option<String>> = calls.into_iter().map(|(_, d)| return d).collect();
        assert_eq!(
            downstreams,
            vec![Some(id("c", "x.C").to_string()), Some(id("b", "x.B").to_string()), None]
        );
    }

    #[test]
    fn class_level_downstreams_hear_about_every_instance() {
        let registry = DependencyRegistry::new();
        let recorder = recorder(&registry);
        let entity = ProviderKind::ENTITY.class_id();
        registry.register_dependency(&ProviderKind::PHYSICAL_TYPE.class_id(), &entity).unwrap();

        let physical = MetadataId::physical_type(&JavaType::new("x.Foo"), &LogicalPath::main_java());
        registry.notify_downstream(&physical);

        let calls = recorder.calls.lock().clone();
        assert_eq!(calls.first(), Some(&(physical.to_string(), Some(entity.to_string()))));
    }

    #[test]
    fn dropped_listeners_are_pruned() {
        let registry = DependencyRegistry::new();
        {
            let _recorder = recorder(&registry);
        }
        registry.register_dependency(&id("a", "x.A"), &id("b", "x.B")).unwrap();
        registry.notify_downstream(&id("a", "x.A"));
        assert!(registry.live_listeners().is_empty());
    }

    #[test]
    fn cycle_detection_is_advisory() {
        let registry = DependencyRegistry::new();
        let (a, b, c) = (id("a", "x.A"), id("b", "x.B"), id("c", "x.C"));
        registry.register_dependency(&a, &b).unwrap();
        registry.register_dependency(&b, &c).unwrap();
        assert!(!registry.is_valid_dependency(&c, &a));
        assert!(registry.is_valid_dependency(&a, &c));
        registry.register_dependency(&c, &a).unwrap();
        assert_eq!(registry.edge_count(), 3);
    }
}
