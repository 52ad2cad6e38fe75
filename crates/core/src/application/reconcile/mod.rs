// Reconcilers - map a key to side effects, re-run on every relevant notification

pub mod crash_loop;
pub mod observer;
pub mod scope;

pub use crash_loop::{CrashLoopReconciler, CRASH_LOOP_RESTART_THRESHOLD};
pub use observer::WorkloadObserver;
pub use scope::{scope_from_entries, AllNamespaces, NamespaceAllowList, NamespaceScope};

use crate::domain::ResourceKey;
use crate::error::ReconcileError;
use async_trait::async_trait;

/// Reconciler invoked by the worker pool for every dequeued key
#[async_trait]
pub trait Reconciler: Send + Sync {
    async fn reconcile(&self, key: &ResourceKey) -> Result<(), ReconcileError>;
}
