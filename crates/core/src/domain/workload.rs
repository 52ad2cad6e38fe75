// Workload Domain Model - scalable owners of pods and the scale-to-zero mutation

use super::key::ResourceKey;
use super::pod::{
    PodSnapshot, DEPLOYMENT_ANNOTATION, DEPLOYMENT_CONFIG_ANNOTATION, WORKLOAD_NAME_LABEL,
};
use std::fmt;

/// The two scalable workload kinds the controller may scale down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    DeploymentConfig,
    Deployment,
}

impl WorkloadKind {
    /// Lookup order when resolving an owner against the cache
    pub const RESOLUTION_ORDER: [WorkloadKind; 2] =
        [WorkloadKind::DeploymentConfig, WorkloadKind::Deployment];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::DeploymentConfig => "DeploymentConfig",
            WorkloadKind::Deployment => "Deployment",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a resolved workload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkloadRef {
    pub kind: WorkloadKind,
    pub key: ResourceKey,
}

impl WorkloadRef {
    pub fn new(kind: WorkloadKind, key: ResourceKey) -> Self {
        Self { kind, key }
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.key)
    }
}

/// Where the owner name of a pod was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerSource {
    DeploymentConfigAnnotation,
    DeploymentAnnotation,
    NameLabel,
}

/// Owner key derived from a pod, before it is resolved to a kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerCandidate {
    pub key: ResourceKey,
    pub source: OwnerSource,
}

impl OwnerCandidate {
    /// Derive the owning workload of a pod.
    ///
    /// Precedence is fixed: deployment-config annotation, then deployment annotation, then the
    /// `name` label. The owner always lives in the pod's namespace.
    pub fn from_pod(pod: &PodSnapshot) -> Option<Self> {
        let annotation = |key: &str| pod.annotations.get(key).filter(|v| !v.is_empty());

        let (name, source) = if let Some(name) = annotation(DEPLOYMENT_CONFIG_ANNOTATION) {
            (name, OwnerSource::DeploymentConfigAnnotation)
        } else if let Some(name) = annotation(DEPLOYMENT_ANNOTATION) {
            (name, OwnerSource::DeploymentAnnotation)
        } else {
            let name = pod
                .labels
                .get(WORKLOAD_NAME_LABEL)
                .filter(|v| !v.is_empty())?;
            (name, OwnerSource::NameLabel)
        };

        Some(Self {
            key: ResourceKey::new(pod.namespace.as_str(), name.as_str()),
            source,
        })
    }
}

/// A workload as currently mirrored in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSnapshot {
    pub workload: WorkloadRef,
    pub desired_replicas: i32,
    pub observed_replicas: i32,
}

impl WorkloadSnapshot {
    pub fn new(
        kind: WorkloadKind,
        key: ResourceKey,
        desired_replicas: i32,
        observed_replicas: i32,
    ) -> Self {
        Self {
            workload: WorkloadRef::new(kind, key),
            desired_replicas,
            observed_replicas,
        }
    }
}

/// Replica write issued to the cluster API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleMutation {
    pub target: WorkloadRef,
    pub desired_replicas: i32,
    pub observed_replicas: i32,
}

impl ScaleMutation {
    pub fn to_zero(target: WorkloadRef) -> Self {
        Self {
            target,
            desired_replicas: 0,
            observed_replicas: 0,
        }
    }

    /// True when applying the mutation would not change the workload
    pub fn is_noop_for(&self, snapshot: &WorkloadSnapshot) -> bool {
        snapshot.desired_replicas == self.desired_replicas
            && snapshot.observed_replicas == self.observed_replicas
    }

    /// Apply the mutation to a snapshot copy
    pub fn apply(&self, snapshot: &WorkloadSnapshot) -> WorkloadSnapshot {
        WorkloadSnapshot {
            workload: snapshot.workload.clone(),
            desired_replicas: self.desired_replicas,
            observed_replicas: self.observed_replicas,
        }
    }
}
