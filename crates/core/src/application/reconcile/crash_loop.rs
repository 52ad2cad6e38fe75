//! Crash-loop reconciler
//!
//! Scales the owning workload of a crash-looping pod to zero replicas:
//! - pod gone, not started yet, or restarted at most once: nothing to do
//! - owner found via annotations (deployment-config, then deployment) or the `name` label
//! - pod namespace must be in scope
//! - owner resolved against the cache, deployment-config kind first
//! - scale-to-zero written as a full-object update in the workload's namespace

use super::{NamespaceScope, Reconciler};
use crate::domain::{OwnerCandidate, ResourceKey, ScaleMutation, WorkloadKind, WorkloadSnapshot};
use crate::error::ReconcileError;
use crate::port::{ResourceCache, WorkloadClient};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// A pod whose first container restarted more often than this is crash-looping
pub const CRASH_LOOP_RESTART_THRESHOLD: i32 = 1;

pub struct CrashLoopReconciler {
    cache: Arc<dyn ResourceCache>,
    client: Arc<dyn WorkloadClient>,
    scope: Arc<dyn NamespaceScope>,
    restart_threshold: i32,
}

impl CrashLoopReconciler {
    pub fn new(
        cache: Arc<dyn ResourceCache>,
        client: Arc<dyn WorkloadClient>,
        scope: Arc<dyn NamespaceScope>,
    ) -> Self {
        Self {
            cache,
            client,
            scope,
            restart_threshold: CRASH_LOOP_RESTART_THRESHOLD,
        }
    }

    /// Override the restart count a pod must exceed to count as crash-looping
    pub fn with_restart_threshold(mut self, restart_threshold: i32) -> Self {
        self.restart_threshold = restart_threshold;
        self
    }

    /// Find the owner in the cache, trying each workload kind in resolution order
    fn resolve_owner(
        &self,
        owner: &OwnerCandidate,
    ) -> Result<Option<WorkloadSnapshot>, ReconcileError> {
        for kind in WorkloadKind::RESOLUTION_ORDER {
            let found = self
                .cache
                .get_workload(kind, &owner.key)
                .map_err(|source| ReconcileError::Cache {
                    key: owner.key.to_string(),
                    source,
                })?;
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Reconciler for CrashLoopReconciler {
    async fn reconcile(&self, key: &ResourceKey) -> Result<(), ReconcileError> {
        let pod = self
            .cache
            .get_pod(key)
            .map_err(|source| ReconcileError::Cache {
                key: key.to_string(),
                source,
            })?;

        let Some(pod) = pod else {
            debug!(pod = %key, "Pod no longer cached, nothing to do");
            return Ok(());
        };

        let Some(restart_count) = pod.first_restart_count() else {
            debug!(pod = %key, "No container status reported yet");
            return Ok(());
        };

        if restart_count <= self.restart_threshold {
            return Ok(());
        }

        let Some(owner) = OwnerCandidate::from_pod(&pod) else {
            info!(pod = %key, restart_count, "Crash-looping pod has no owning workload hint");
            return Ok(());
        };

        if !self.scope.allows(&pod.namespace) {
            debug!(pod = %key, namespace = %pod.namespace, "Namespace out of scope");
            return Ok(());
        }

        let Some(workload) = self.resolve_owner(&owner)? else {
            info!(
                pod = %key,
                owner = %owner.key,
                source = ?owner.source,
                "Owning workload not found in cache"
            );
            return Ok(());
        };

        let mutation = ScaleMutation::to_zero(workload.workload.clone());
        if mutation.is_noop_for(&workload) {
            debug!(pod = %key, workload = %workload.workload, "Workload already scaled to zero");
            return Ok(());
        }

        info!(
            pod = %key,
            restart_count,
            workload = %workload.workload,
            desired_replicas = workload.desired_replicas,
            observed_replicas = workload.observed_replicas,
            "Scaling crash-looping workload to zero"
        );

        self.client
            .update_workload(&workload, &mutation)
            .await
            .map_err(|source| ReconcileError::Scale {
                target: workload.workload.to_string(),
                source,
            })?;

        info!(workload = %workload.workload, "Workload scaled to zero");
        Ok(())
    }
}
