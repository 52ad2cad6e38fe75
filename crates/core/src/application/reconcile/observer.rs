// Workload observer - drains the workload queues, logging replica state

use super::Reconciler;
use crate::domain::{ResourceKey, WorkloadKind};
use crate::error::ReconcileError;
use crate::port::ResourceCache;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Reconciler for deployment-config and deployment keys.
///
/// Takes no action: the crash-loop policy is driven from pods only.
pub struct WorkloadObserver {
    kind: WorkloadKind,
    cache: Arc<dyn ResourceCache>,
}

impl WorkloadObserver {
    pub fn new(kind: WorkloadKind, cache: Arc<dyn ResourceCache>) -> Self {
        Self { kind, cache }
    }
}

#[async_trait]
impl Reconciler for WorkloadObserver {
    async fn reconcile(&self, key: &ResourceKey) -> Result<(), ReconcileError> {
        let workload = self
            .cache
            .get_workload(self.kind, key)
            .map_err(|source| ReconcileError::Cache {
                key: key.to_string(),
                source,
            })?;

        match workload {
            Some(w) => debug!(
                kind = %self.kind,
                key = %key,
                desired_replicas = w.desired_replicas,
                observed_replicas = w.observed_replicas,
                "Observed workload"
            ),
            None => debug!(kind = %self.kind, key = %key, "Workload deleted"),
        }
        Ok(())
    }
}
