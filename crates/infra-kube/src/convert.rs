//! Conversions from cached Kubernetes objects into core snapshots.

use crashguard_core::domain::{
    ContainerStatus, PodSnapshot, ResourceKey, WorkloadKind, WorkloadSnapshot,
};
use crashguard_core::port::{CacheError, ObjectIdentity, ResourceKind};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::DynamicObject;
use kube::{Resource, ResourceExt};
use serde_json::Value;

/// Replica count the API server assumes when a deployment omits `spec.replicas`.
const DEFAULT_DEPLOYMENT_REPLICAS: i32 = 1;

pub fn identity_of<K: Resource>(obj: &K) -> ObjectIdentity {
    let meta = obj.meta();
    ObjectIdentity {
        namespace: meta.namespace.clone(),
        name: meta.name.clone(),
    }
}

fn key_of<K: Resource>(obj: &K) -> ResourceKey {
    ResourceKey::new(obj.namespace().unwrap_or_default(), obj.name_any())
}

pub fn pod_snapshot(pod: &Pod) -> PodSnapshot {
    let container_statuses = pod
        .status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .map(|statuses| {
            statuses
                .iter()
                .map(|cs| ContainerStatus::new(cs.name.as_str(), cs.restart_count))
                .collect()
        })
        .unwrap_or_default();

    PodSnapshot {
        namespace: pod.namespace().unwrap_or_default(),
        name: pod.name_any(),
        labels: pod.labels().clone(),
        annotations: pod.annotations().clone(),
        container_statuses,
    }
}

pub fn deployment_snapshot(deployment: &Deployment) -> WorkloadSnapshot {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(DEFAULT_DEPLOYMENT_REPLICAS);
    let observed = deployment
        .status
        .as_ref()
        .and_then(|status| status.replicas)
        .unwrap_or(0);

    WorkloadSnapshot::new(WorkloadKind::Deployment, key_of(deployment), desired, observed)
}

/// Deployment-configs are watched as dynamic objects; `spec.replicas` is required.
pub fn deployment_config_snapshot(dc: &DynamicObject) -> Result<WorkloadSnapshot, CacheError> {
    let key = key_of(dc);
    let replicas_at = |pointer: &str| -> Result<Option<i32>, CacheError> {
        match dc.data.pointer(pointer) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| CacheError::Malformed {
                    kind: ResourceKind::DeploymentConfig,
                    key: key.to_string(),
                    reason: format!("{} is not a replica count: {}", pointer, value),
                }),
        }
    };

    let desired = replicas_at("/spec/replicas")?.ok_or_else(|| CacheError::Malformed {
        kind: ResourceKind::DeploymentConfig,
        key: key.to_string(),
        reason: "spec.replicas is missing".to_string(),
    })?;
    let observed = replicas_at("/status/replicas")?.unwrap_or(0);

    Ok(WorkloadSnapshot::new(
        WorkloadKind::DeploymentConfig,
        key,
        desired,
        observed,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pod_snapshot_copies_metadata_and_statuses() {
        let pod: Pod = serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "web-1-x7k2p",
                "namespace": "team-a",
                "labels": {"name": "web"},
                "annotations": {"openshift.io/deployment-config.name": "web"}
            },
            "status": {
                "containerStatuses": [
                    {"name": "app", "restartCount": 4, "ready": false, "image": "app", "imageID": ""},
                    {"name": "proxy", "restartCount": 0, "ready": true, "image": "proxy", "imageID": ""}
                ]
            }
        }))
        .unwrap();

        let snapshot = pod_snapshot(&pod);
        assert_eq!(snapshot.key(), ResourceKey::new("team-a", "web-1-x7k2p"));
        assert_eq!(snapshot.first_restart_count(), Some(4));
        assert_eq!(snapshot.labels.get("name").map(String::as_str), Some("web"));
        assert_eq!(snapshot.container_statuses.len(), 2);
    }

    #[test]
    fn test_pending_pod_has_no_statuses() {
        let pod: Pod = serde_json::from_value(json!({
            "metadata": {"name": "p", "namespace": "ns"}
        }))
        .unwrap();
        assert_eq!(pod_snapshot(&pod).first_restart_count(), None);
    }

    #[test]
    fn test_deployment_snapshot_defaults_replicas() {
        let deployment: Deployment = serde_json::from_value(json!({
            "metadata": {"name": "api", "namespace": "ns"},
            "spec": {
                "selector": {"matchLabels": {"app": "api"}},
                "template": {"metadata": {"labels": {"app": "api"}}}
            }
        }))
        .unwrap();

        let snapshot = deployment_snapshot(&deployment);
        assert_eq!(snapshot.workload.kind, WorkloadKind::Deployment);
        assert_eq!(snapshot.desired_replicas, 1);
        assert_eq!(snapshot.observed_replicas, 0);
    }

    #[test]
    fn test_deployment_config_snapshot_reads_replicas() {
        let dc: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "apps.openshift.io/v1",
            "kind": "DeploymentConfig",
            "metadata": {"name": "dc1", "namespace": "ns"},
            "spec": {"replicas": 3},
            "status": {"replicas": 2}
        }))
        .unwrap();

        let snapshot = deployment_config_snapshot(&dc).unwrap();
        assert_eq!(snapshot.workload.key, ResourceKey::new("ns", "dc1"));
        assert_eq!(snapshot.desired_replicas, 3);
        assert_eq!(snapshot.observed_replicas, 2);
    }

    #[test]
    fn test_deployment_config_without_replicas_is_malformed() {
        let dc: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "apps.openshift.io/v1",
            "kind": "DeploymentConfig",
            "metadata": {"name": "dc1", "namespace": "ns"}
        }))
        .unwrap();

        let err = deployment_config_snapshot(&dc).unwrap_err();
        assert!(matches!(
            &err,
            CacheError::Malformed { kind: ResourceKind::DeploymentConfig, reason, .. }
                if reason.contains("spec.replicas is missing")
        ));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_deployment_config_with_non_integer_replicas_is_malformed() {
        let dc: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "apps.openshift.io/v1",
            "kind": "DeploymentConfig",
            "metadata": {"name": "dc1", "namespace": "ns"},
            "spec": {"replicas": "three"}
        }))
        .unwrap();

        let err = deployment_config_snapshot(&dc).unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("ns/dc1"));
    }
}
