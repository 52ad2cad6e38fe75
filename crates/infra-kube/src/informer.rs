// Informer - watch-backed local mirror of one resource kind with change notifications

use crate::convert::identity_of;
use crashguard_core::application::ShutdownToken;
use crashguard_core::domain::ResourceKey;
use crashguard_core::port::{DeletedObject, ObjectIdentity, ResourceEventHandler, ResourceKind};
use futures::StreamExt;
use kube::runtime::reflector::store::Writer;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest period accepted for resync and relist timers
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Timer settings shared by every informer
#[derive(Debug, Clone, Copy)]
pub struct InformerSettings {
    /// Every cached object is re-delivered as an update this often
    pub resync_period: Duration,
    /// The watch is restarted with a fresh list this often
    pub relist_period: Duration,
}

/// Bookkeeping for one list (initial or relist) in progress
struct ListState<K: Resource>
where
    K::DynamicType: Eq + Hash,
{
    seen: HashSet<ObjectRef<K>>,
    pending: Vec<(bool, ObjectIdentity)>,
}

impl<K: Resource> ListState<K>
where
    K::DynamicType: Eq + Hash,
{
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            pending: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.seen.clear();
        self.pending.clear();
    }
}

/// Reflector store plus the handlers notified as watch events are applied to it.
///
/// Notifications for a (re)list are held back until the list completes, so handlers only
/// run against a store that already holds the full listed state. Objects that disappear
/// across a relist are reported as tombstones.
pub(crate) struct Mirror<K>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone,
{
    kind: ResourceKind,
    dyntype: K::DynamicType,
    store: Store<K>,
    writer: Mutex<(Writer<K>, ListState<K>)>,
    handlers: RwLock<Vec<Arc<dyn ResourceEventHandler>>>,
    synced: AtomicBool,
}

impl<K> Mirror<K>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone,
{
    pub(crate) fn new(kind: ResourceKind, dyntype: K::DynamicType) -> Self {
        let writer = Writer::new(dyntype.clone());
        let store = writer.as_reader();
        Self {
            kind,
            dyntype,
            store,
            writer: Mutex::new((writer, ListState::new())),
            handlers: RwLock::new(Vec::new()),
            synced: AtomicBool::new(false),
        }
    }

    pub(crate) fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    pub(crate) fn add_event_handler(&self, handler: Arc<dyn ResourceEventHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    pub(crate) fn get(&self, key: &ResourceKey) -> Option<Arc<K>> {
        let mut oref = ObjectRef::new_with(key.name(), self.dyntype.clone());
        if !key.namespace().is_empty() {
            oref = oref.within(key.namespace());
        }
        self.store.get(&oref)
    }

    pub(crate) fn apply(&self, event: watcher::Event<K>) {
        let mut guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let (writer, list) = &mut *guard;

        match &event {
            watcher::Event::Apply(obj) => {
                let existed = self.store.get(&self.object_ref(obj)).is_some();
                writer.apply_watcher_event(&event);
                self.notify_upsert(existed, &identity_of(obj));
            }
            watcher::Event::Delete(obj) => {
                writer.apply_watcher_event(&event);
                let deleted = DeletedObject::Object(identity_of(obj));
                self.notify(|h| h.on_delete(&deleted));
            }
            watcher::Event::Init => {
                list.reset();
                writer.apply_watcher_event(&event);
            }
            watcher::Event::InitApply(obj) => {
                let oref = self.object_ref(obj);
                let existed = self.store.get(&oref).is_some();
                list.seen.insert(oref);
                list.pending.push((existed, identity_of(obj)));
                writer.apply_watcher_event(&event);
            }
            watcher::Event::InitDone => {
                let before = self.store.state();
                writer.apply_watcher_event(&event);

                let listed = list.pending.len();
                for (existed, identity) in list.pending.drain(..) {
                    self.notify_upsert(existed, &identity);
                }

                let mut vanished = 0usize;
                for obj in before {
                    let oref = self.object_ref(obj.as_ref());
                    if !list.seen.contains(&oref) {
                        vanished += 1;
                        let key = ResourceKey::from_meta(
                            oref.namespace.as_deref(),
                            Some(oref.name.as_str()),
                        )
                        .map(|key| key.to_string())
                        .unwrap_or_else(|_| oref.name.clone());
                        let deleted = DeletedObject::Tombstone { key };
                        self.notify(|h| h.on_delete(&deleted));
                    }
                }
                list.seen.clear();

                if !self.synced.swap(true, Ordering::SeqCst) {
                    info!(kind = %self.kind, objects = listed, "Informer synced");
                } else {
                    debug!(kind = %self.kind, objects = listed, vanished, "Relist complete");
                }
            }
        }
    }

    /// Re-deliver every cached object as an update
    pub(crate) fn resync(&self) {
        if !self.has_synced() {
            return;
        }
        let objects = self.store.state();
        debug!(kind = %self.kind, objects = objects.len(), "Resyncing");
        for obj in objects {
            let identity = identity_of(obj.as_ref());
            self.notify(|h| h.on_update(&identity, &identity));
        }
    }

    fn object_ref(&self, obj: &K) -> ObjectRef<K> {
        ObjectRef::from_obj_with(obj, self.dyntype.clone())
    }

    fn notify_upsert(&self, existed: bool, identity: &ObjectIdentity) {
        if existed {
            self.notify(|h| h.on_update(identity, identity));
        } else {
            self.notify(|h| h.on_add(identity));
        }
    }

    fn notify(&self, f: impl Fn(&dyn ResourceEventHandler)) {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for handler in handlers.iter() {
            f(handler.as_ref());
        }
    }
}

/// Drives a [`Mirror`] from a restartable watch on one kind
pub struct Informer<K>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone,
{
    api: Api<K>,
    mirror: Mirror<K>,
    settings: InformerSettings,
    started: AtomicBool,
}

impl<K> Informer<K>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Eq + Hash + Clone + Send + Sync,
{
    pub fn new(
        kind: ResourceKind,
        api: Api<K>,
        dyntype: K::DynamicType,
        settings: InformerSettings,
    ) -> Self {
        Self {
            api,
            mirror: Mirror::new(kind, dyntype),
            settings,
            started: AtomicBool::new(false),
        }
    }

    /// True once the first list has been fully applied to the store
    pub fn has_synced(&self) -> bool {
        self.mirror.has_synced()
    }

    pub fn add_event_handler(&self, handler: Arc<dyn ResourceEventHandler>) {
        self.mirror.add_event_handler(handler);
    }

    /// Cached object by key
    pub fn get(&self, key: &ResourceKey) -> Option<Arc<K>> {
        self.mirror.get(key)
    }

    /// Watch until shutdown. Runs at most once per informer.
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        let kind = self.mirror.kind;
        if self.started.swap(true, Ordering::SeqCst) {
            warn!(kind = %kind, "Informer already started");
            return;
        }

        let resync_period = self.settings.resync_period.max(MIN_PERIOD);
        let relist_period = self.settings.relist_period.max(MIN_PERIOD);

        info!(
            kind = %kind,
            resync_secs = resync_period.as_secs(),
            relist_secs = relist_period.as_secs(),
            "Starting informer"
        );

        loop {
            let stream = watcher(self.api.clone(), watcher::Config::default()).default_backoff();
            futures::pin_mut!(stream);

            let relist = sleep(relist_period);
            tokio::pin!(relist);

            let mut resync = interval_at(Instant::now() + resync_period, resync_period);
            resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.wait() => {
                        info!(kind = %kind, "Informer stopped");
                        return;
                    }
                    _ = &mut relist => {
                        debug!(kind = %kind, "Restarting watch for relist");
                        break;
                    }
                    _ = resync.tick() => self.mirror.resync(),
                    event = stream.next() => match event {
                        Some(Ok(event)) => self.mirror.apply(event),
                        Some(Err(e)) => {
                            warn!(kind = %kind, error = %e, "Watch failed, backing off");
                        }
                        None => {
                            warn!(kind = %kind, "Watch stream ended, restarting");
                            break;
                        }
                    },
                }
            }
        }
    }
}
