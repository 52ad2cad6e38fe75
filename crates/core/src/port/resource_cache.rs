// Resource Cache Port (Interface)
// Local mirror of cluster objects plus change notifications

use crate::domain::{PodSnapshot, ResourceKey, WorkloadKind, WorkloadSnapshot};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Watched resource kinds, one work queue each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Pod,
    DeploymentConfig,
    Deployment,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "pods",
            ResourceKind::DeploymentConfig => "deploymentconfigs",
            ResourceKind::Deployment => "deployments",
        }
    }
}

impl From<WorkloadKind> for ResourceKind {
    fn from(kind: WorkloadKind) -> Self {
        match kind {
            WorkloadKind::DeploymentConfig => ResourceKind::DeploymentConfig,
            WorkloadKind::Deployment => ResourceKind::Deployment,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache read errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cached {kind} {key} is malformed: {reason}")]
    Malformed {
        kind: ResourceKind,
        key: String,
        reason: String,
    },
}

impl CacheError {
    /// Whether a later read may succeed without the object changing
    pub fn is_transient(&self) -> bool {
        matches!(self, CacheError::Unavailable(_))
    }
}

/// Namespace and name of a notified object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentity {
    pub namespace: Option<String>,
    pub name: Option<String>,
}

impl ObjectIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: Some(name.into()),
        }
    }

    pub fn from_key(key: &ResourceKey) -> Self {
        Self {
            namespace: (!key.namespace().is_empty()).then(|| key.namespace().to_string()),
            name: Some(key.name().to_string()),
        }
    }
}

/// Payload of a delete notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletedObject {
    /// The final state of the object was observed
    Object(ObjectIdentity),
    /// The delete was missed (e.g. across a relist); only the last known key survives
    Tombstone { key: String },
}

/// Change notification handler, registered per kind
pub trait ResourceEventHandler: Send + Sync {
    fn on_add(&self, obj: &ObjectIdentity);

    fn on_update(&self, old: &ObjectIdentity, new: &ObjectIdentity);

    fn on_delete(&self, obj: &DeletedObject);
}

/// Read side of the resource cache
///
/// Reads never mutate cached state. Implementations return copies.
pub trait ResourceCache: Send + Sync {
    /// Look up a pod by key; `Ok(None)` when it is not (or no longer) cached
    fn get_pod(&self, key: &ResourceKey) -> Result<Option<PodSnapshot>, CacheError>;

    /// Look up a workload of the given kind by key
    fn get_workload(
        &self,
        kind: WorkloadKind,
        key: &ResourceKey,
    ) -> Result<Option<WorkloadSnapshot>, CacheError>;

    /// True once the initial list of every watched kind has been mirrored
    fn has_synced(&self) -> bool;
}

/// Notification registration side of the resource cache
pub trait EventSource: Send + Sync {
    fn add_event_handler(&self, kind: ResourceKind, handler: Arc<dyn ResourceEventHandler>);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, RwLock};

    /// In-memory resource cache that notifies handlers synchronously on every write
    pub struct InMemoryResourceCache {
        pods: RwLock<HashMap<ResourceKey, PodSnapshot>>,
        workloads: RwLock<HashMap<(WorkloadKind, ResourceKey), WorkloadSnapshot>>,
        handlers: RwLock<Vec<(ResourceKind, Arc<dyn ResourceEventHandler>)>>,
        synced: AtomicBool,
        failure: Mutex<Option<CacheError>>,
    }

    impl Default for InMemoryResourceCache {
        fn default() -> Self {
            Self::new()
        }
    }

    impl InMemoryResourceCache {
        /// Empty cache that reports itself as synced
        pub fn new() -> Self {
            Self {
                pods: RwLock::new(HashMap::new()),
                workloads: RwLock::new(HashMap::new()),
                handlers: RwLock::new(Vec::new()),
                synced: AtomicBool::new(true),
                failure: Mutex::new(None),
            }
        }

        pub fn set_synced(&self, synced: bool) {
            self.synced.store(synced, Ordering::SeqCst);
        }

        /// Make every subsequent read fail with `error` (or succeed again with `None`)
        pub fn fail_reads(&self, error: Option<CacheError>) {
            *self.failure.lock().unwrap() = error;
        }

        pub fn upsert_pod(&self, pod: PodSnapshot) {
            let key = pod.key();
            let previous = self.pods.write().unwrap().insert(key.clone(), pod);
            let identity = ObjectIdentity::from_key(&key);
            self.notify(ResourceKind::Pod, |h| match &previous {
                Some(old) => h.on_update(&ObjectIdentity::from_key(&old.key()), &identity),
                None => h.on_add(&identity),
            });
        }

        pub fn delete_pod(&self, key: &ResourceKey) {
            if self.pods.write().unwrap().remove(key).is_some() {
                let deleted = DeletedObject::Object(ObjectIdentity::from_key(key));
                self.notify(ResourceKind::Pod, |h| h.on_delete(&deleted));
            }
        }

        pub fn upsert_workload(&self, workload: WorkloadSnapshot) {
            let kind = workload.workload.kind;
            let key = workload.workload.key.clone();
            let previous = self
                .workloads
                .write()
                .unwrap()
                .insert((kind, key.clone()), workload);
            let identity = ObjectIdentity::from_key(&key);
            self.notify(kind.into(), |h| match &previous {
                Some(_) => h.on_update(&identity, &identity),
                None => h.on_add(&identity),
            });
        }

        pub fn delete_workload(&self, kind: WorkloadKind, key: &ResourceKey) {
            let removed = self
                .workloads
                .write()
                .unwrap()
                .remove(&(kind, key.clone()));
            if removed.is_some() {
                let deleted = DeletedObject::Object(ObjectIdentity::from_key(key));
                self.notify(kind.into(), |h| h.on_delete(&deleted));
            }
        }

        /// Deliver a tombstone for `key` without touching cached state
        pub fn emit_tombstone(&self, kind: ResourceKind, key: &str) {
            let deleted = DeletedObject::Tombstone {
                key: key.to_string(),
            };
            self.notify(kind, |h| h.on_delete(&deleted));
        }

        fn notify(&self, kind: ResourceKind, f: impl Fn(&dyn ResourceEventHandler)) {
            let handlers = self.handlers.read().unwrap();
            for (_, handler) in handlers.iter().filter(|(k, _)| *k == kind) {
                f(handler.as_ref());
            }
        }

        fn check_failure(&self) -> Result<(), CacheError> {
            match self.failure.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    impl ResourceCache for InMemoryResourceCache {
        fn get_pod(&self, key: &ResourceKey) -> Result<Option<PodSnapshot>, CacheError> {
            self.check_failure()?;
            Ok(self.pods.read().unwrap().get(key).cloned())
        }

        fn get_workload(
            &self,
            kind: WorkloadKind,
            key: &ResourceKey,
        ) -> Result<Option<WorkloadSnapshot>, CacheError> {
            self.check_failure()?;
            Ok(self
                .workloads
                .read()
                .unwrap()
                .get(&(kind, key.clone()))
                .cloned())
        }

        fn has_synced(&self) -> bool {
            self.synced.load(Ordering::SeqCst)
        }
    }

    impl EventSource for InMemoryResourceCache {
        fn add_event_handler(&self, kind: ResourceKind, handler: Arc<dyn ResourceEventHandler>) {
            self.handlers.write().unwrap().push((kind, handler));
        }
    }
}
