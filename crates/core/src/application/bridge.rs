// Event Bridge - turns cache notifications into queued keys
use crate::application::queue::KeyQueue;
use crate::domain::{DomainError, ResourceKey};
use crate::port::{
    DeletedObject, EventSource, ObjectIdentity, ResourceEventHandler, ResourceKind,
};
use std::sync::Arc;
use tracing::warn;

/// `namespace/name` key of a notified object
pub fn meta_namespace_key(obj: &ObjectIdentity) -> Result<ResourceKey, DomainError> {
    ResourceKey::from_meta(obj.namespace.as_deref(), obj.name.as_deref())
}

/// Key of a deleted object, recovering it from a tombstone when the final state was missed
pub fn deletion_handling_key(obj: &DeletedObject) -> Result<ResourceKey, DomainError> {
    match obj {
        DeletedObject::Object(identity) => meta_namespace_key(identity),
        DeletedObject::Tombstone { key } => ResourceKey::parse(key),
    }
}

/// Handler that re-evaluates the notified key on every add, update and delete.
///
/// Updates are not diffed: the reconciler decides whether anything changed.
pub struct EventBridge {
    queue: KeyQueue,
}

impl EventBridge {
    pub fn new(queue: KeyQueue) -> Self {
        Self { queue }
    }

    /// Register a bridge feeding `queue` for notifications of `kind`
    pub fn register(source: &dyn EventSource, kind: ResourceKind, queue: KeyQueue) {
        source.add_event_handler(kind, Arc::new(Self::new(queue)));
    }

    fn enqueue(&self, key: Result<ResourceKey, DomainError>, event: &'static str) {
        match key {
            Ok(key) => self.queue.add(key),
            Err(e) => warn!(
                queue = %self.queue.name(),
                event,
                error = %e,
                "Cannot derive key, skipping notification"
            ),
        }
    }
}

impl ResourceEventHandler for EventBridge {
    fn on_add(&self, obj: &ObjectIdentity) {
        self.enqueue(meta_namespace_key(obj), "add");
    }

    fn on_update(&self, _old: &ObjectIdentity, new: &ObjectIdentity) {
        self.enqueue(meta_namespace_key(new), "update");
    }

    fn on_delete(&self, obj: &DeletedObject) {
        self.enqueue(deletion_handling_key(obj), "delete");
    }
}
