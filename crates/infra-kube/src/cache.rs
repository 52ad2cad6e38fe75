// Kube Resource Cache - ResourceCache and EventSource backed by one informer per kind

use crate::convert;
use crate::informer::{Informer, InformerSettings};
use crashguard_core::application::ShutdownToken;
use crashguard_core::domain::{PodSnapshot, ResourceKey, WorkloadKind, WorkloadSnapshot};
use crashguard_core::port::{
    CacheError, EventSource, ResourceCache, ResourceEventHandler, ResourceKind,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// API resource of the OpenShift deployment-config kind
pub fn deployment_config_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(
        "apps.openshift.io",
        "v1",
        "DeploymentConfig",
    ))
}

/// Cluster-wide mirror of pods, deployments and (optionally) deployment-configs
pub struct KubeResourceCache {
    pods: Arc<Informer<Pod>>,
    deployments: Arc<Informer<Deployment>>,
    deployment_configs: Option<Arc<Informer<DynamicObject>>>,
}

impl KubeResourceCache {
    /// Informers are created idle; call [`KubeResourceCache::start`] after registering handlers.
    ///
    /// With `watch_deployment_configs` off, deployment-config lookups always miss and the
    /// kind does not count towards `has_synced`.
    pub fn new(client: Client, settings: InformerSettings, watch_deployment_configs: bool) -> Self {
        let pods = Informer::new(ResourceKind::Pod, Api::all(client.clone()), (), settings);
        let deployments = Informer::new(
            ResourceKind::Deployment,
            Api::all(client.clone()),
            (),
            settings,
        );
        let deployment_configs = watch_deployment_configs.then(|| {
            let resource = deployment_config_resource();
            Arc::new(Informer::new(
                ResourceKind::DeploymentConfig,
                Api::all_with(client, &resource),
                resource,
                settings,
            ))
        });

        Self {
            pods: Arc::new(pods),
            deployments: Arc::new(deployments),
            deployment_configs,
        }
    }

    /// Spawn one watch task per informer
    pub fn start(&self, shutdown: &ShutdownToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(3);

        let pods = self.pods.clone();
        let token = shutdown.clone();
        handles.push(tokio::spawn(async move { pods.run(token).await }));

        let deployments = self.deployments.clone();
        let token = shutdown.clone();
        handles.push(tokio::spawn(async move { deployments.run(token).await }));

        match &self.deployment_configs {
            Some(informer) => {
                let informer = informer.clone();
                let token = shutdown.clone();
                handles.push(tokio::spawn(async move { informer.run(token).await }));
            }
            None => info!("Deployment-config watch disabled"),
        }

        handles
    }

    /// Raw cached deployment, used as the base of full-object updates
    pub fn deployment(&self, key: &ResourceKey) -> Option<Arc<Deployment>> {
        self.deployments.get(key)
    }

    /// Raw cached deployment-config
    pub fn deployment_config(&self, key: &ResourceKey) -> Option<Arc<DynamicObject>> {
        self.deployment_configs
            .as_ref()
            .and_then(|informer| informer.get(key))
    }
}

impl ResourceCache for KubeResourceCache {
    fn get_pod(&self, key: &ResourceKey) -> Result<Option<PodSnapshot>, CacheError> {
        Ok(self.pods.get(key).map(|pod| convert::pod_snapshot(&pod)))
    }

    fn get_workload(
        &self,
        kind: WorkloadKind,
        key: &ResourceKey,
    ) -> Result<Option<WorkloadSnapshot>, CacheError> {
        match kind {
            WorkloadKind::Deployment => Ok(self
                .deployment(key)
                .map(|deployment| convert::deployment_snapshot(&deployment))),
            WorkloadKind::DeploymentConfig => self
                .deployment_config(key)
                .map(|dc| convert::deployment_config_snapshot(&dc))
                .transpose(),
        }
    }

    fn has_synced(&self) -> bool {
        self.pods.has_synced()
            && self.deployments.has_synced()
            && self
                .deployment_configs
                .as_ref()
                .map_or(true, |informer| informer.has_synced())
    }
}

impl EventSource for KubeResourceCache {
    fn add_event_handler(&self, kind: ResourceKind, handler: Arc<dyn ResourceEventHandler>) {
        match kind {
            ResourceKind::Pod => self.pods.add_event_handler(handler),
            ResourceKind::Deployment => self.deployments.add_event_handler(handler),
            ResourceKind::DeploymentConfig => match &self.deployment_configs {
                Some(informer) => informer.add_event_handler(handler),
                None => warn!("Ignoring deployment-config handler, watch disabled"),
            },
        }
    }
}
