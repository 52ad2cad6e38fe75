// Kube Workload Client - full-object replace of deployments and deployment-configs

use crate::cache::{deployment_config_resource, KubeResourceCache};
use async_trait::async_trait;
use crashguard_core::domain::{ScaleMutation, WorkloadKind, WorkloadSnapshot};
use crashguard_core::port::{ClientError, WorkloadClient};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use kube::api::{DynamicObject, PostParams};
use kube::{Api, Client};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Writes scale mutations through the API server.
///
/// The cached object is the base of every update, so a stale cache surfaces as a
/// conflict and the key is retried against a fresher copy.
pub struct KubeWorkloadClient {
    client: Client,
    cache: Arc<KubeResourceCache>,
}

impl KubeWorkloadClient {
    pub fn new(client: Client, cache: Arc<KubeResourceCache>) -> Self {
        Self { client, cache }
    }
}

#[async_trait]
impl WorkloadClient for KubeWorkloadClient {
    async fn update_workload(
        &self,
        _current: &WorkloadSnapshot,
        mutation: &ScaleMutation,
    ) -> Result<(), ClientError> {
        let key = &mutation.target.key;
        let params = PostParams::default();

        match mutation.target.kind {
            WorkloadKind::Deployment => {
                let cached = self.cache.deployment(key).ok_or_else(|| {
                    ClientError::NotFound(format!("deployment {} is not cached", key))
                })?;
                let updated = scaled_deployment(&cached, mutation);
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), key.namespace());
                api.replace(key.name(), &params, &updated)
                    .await
                    .map_err(classify)?;
            }
            WorkloadKind::DeploymentConfig => {
                let cached = self.cache.deployment_config(key).ok_or_else(|| {
                    ClientError::NotFound(format!("deployment-config {} is not cached", key))
                })?;
                let updated = scaled_deployment_config(&cached, mutation);
                let api: Api<DynamicObject> = Api::namespaced_with(
                    self.client.clone(),
                    key.namespace(),
                    &deployment_config_resource(),
                );
                api.replace(key.name(), &params, &updated)
                    .await
                    .map_err(classify)?;
            }
        }

        debug!(workload = %mutation.target, "Replaced workload");
        Ok(())
    }
}

/// Copy of `deployment` carrying the mutation's desired and observed replicas
pub fn scaled_deployment(deployment: &Deployment, mutation: &ScaleMutation) -> Deployment {
    let mut updated = deployment.clone();
    updated.spec.get_or_insert_with(Default::default).replicas = Some(mutation.desired_replicas);
    updated
        .status
        .get_or_insert_with(DeploymentStatus::default)
        .replicas = Some(mutation.observed_replicas);
    updated
}

/// Copy of `dc` carrying the mutation's desired and observed replicas
pub fn scaled_deployment_config(dc: &DynamicObject, mutation: &ScaleMutation) -> DynamicObject {
    let mut updated = dc.clone();
    set_field(&mut updated.data, "spec", "replicas", json!(mutation.desired_replicas));
    set_field(&mut updated.data, "status", "replicas", json!(mutation.observed_replicas));
    updated
}

fn set_field(data: &mut Value, section: &str, field: &str, value: Value) {
    if !data.is_object() {
        *data = json!({});
    }
    if let Value::Object(root) = data {
        let section = root.entry(section).or_insert_with(|| json!({}));
        if !section.is_object() {
            *section = json!({});
        }
        if let Value::Object(section) = section {
            section.insert(field.to_string(), value);
        }
    }
}

/// Map an API failure onto the port's error classes
pub fn classify(err: kube::Error) -> ClientError {
    match &err {
        kube::Error::Api(response) => match response.code {
            409 => ClientError::Conflict(response.message.clone()),
            404 => ClientError::NotFound(response.message.clone()),
            429 | 500..=599 => ClientError::Transient(response.message.clone()),
            400..=499 => ClientError::Rejected(response.message.clone()),
            _ => ClientError::Transient(err.to_string()),
        },
        _ => ClientError::Transient(err.to_string()),
    }
}
