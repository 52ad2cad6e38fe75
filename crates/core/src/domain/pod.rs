// Pod Domain Model - read-only snapshot of a pod taken from the resource cache

use super::key::ResourceKey;
use std::collections::BTreeMap;

/// Annotation naming the deployment-config that rolled out a pod
pub const DEPLOYMENT_CONFIG_ANNOTATION: &str = "openshift.io/deployment-config.name";

/// Annotation naming the deployment that rolled out a pod
pub const DEPLOYMENT_ANNOTATION: &str = "openshift.io/deployment.name";

/// Label carrying the workload name when no rollout annotation is present
pub const WORKLOAD_NAME_LABEL: &str = "name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    pub name: String,
    pub restart_count: i32,
}

impl ContainerStatus {
    pub fn new(name: impl Into<String>, restart_count: i32) -> Self {
        Self {
            name: name.into(),
            restart_count,
        }
    }
}

/// Point-in-time copy of a pod
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodSnapshot {
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub container_statuses: Vec<ContainerStatus>,
}

impl PodSnapshot {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_container(mut self, name: impl Into<String>, restart_count: i32) -> Self {
        self.container_statuses
            .push(ContainerStatus::new(name, restart_count));
        self
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.namespace.as_str(), self.name.as_str())
    }

    /// Restart count of the first reported container only.
    ///
    /// `None` while the kubelet has not reported any container status yet.
    pub fn first_restart_count(&self) -> Option<i32> {
        self.container_statuses.first().map(|c| c.restart_count)
    }
}
