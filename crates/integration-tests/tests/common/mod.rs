//! Shared harness: a full controller over the in-memory cache and a recording client.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use crashguard_core::application::reconcile::{
    CrashLoopReconciler, NamespaceAllowList, WorkloadObserver,
};
use crashguard_core::application::{
    shutdown_channel, Controller, EventBridge, KeyQueue, ShutdownSender,
};
use crashguard_core::domain::pod::{DEPLOYMENT_CONFIG_ANNOTATION, WORKLOAD_NAME_LABEL};
use crashguard_core::domain::{PodSnapshot, ResourceKey, WorkloadKind, WorkloadSnapshot};
use crashguard_core::port::error_sink::mocks::CollectingErrorSink;
use crashguard_core::port::resource_cache::mocks::InMemoryResourceCache;
use crashguard_core::port::workload_client::mocks::{MockBehavior, RecordingWorkloadClient};
use crashguard_core::port::ResourceKind;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

pub const SCOPED_NAMESPACE: &str = "ns";

pub struct Harness {
    pub cache: Arc<InMemoryResourceCache>,
    pub client: Arc<RecordingWorkloadClient>,
    pub sink: Arc<CollectingErrorSink>,
    pub pods: KeyQueue,
    pub deployment_configs: KeyQueue,
    pub deployments: KeyQueue,
    shutdown: ShutdownSender,
    task: JoinHandle<crashguard_core::Result<()>>,
}

impl Harness {
    /// Wire queues, bridges and reconcilers the way the daemon does and start the controller
    pub fn start(behavior: MockBehavior) -> Self {
        Self::start_with_cache(Arc::new(InMemoryResourceCache::new()), behavior)
    }

    pub fn start_with_cache(cache: Arc<InMemoryResourceCache>, behavior: MockBehavior) -> Self {
        let client = Arc::new(RecordingWorkloadClient::new(behavior).with_cache(cache.clone()));
        let sink = Arc::new(CollectingErrorSink::new());

        let pods = KeyQueue::with_default_backoff(ResourceKind::Pod.as_str());
        let deployment_configs =
            KeyQueue::with_default_backoff(ResourceKind::DeploymentConfig.as_str());
        let deployments = KeyQueue::with_default_backoff(ResourceKind::Deployment.as_str());
        EventBridge::register(cache.as_ref(), ResourceKind::Pod, pods.clone());
        EventBridge::register(
            cache.as_ref(),
            ResourceKind::DeploymentConfig,
            deployment_configs.clone(),
        );
        EventBridge::register(cache.as_ref(), ResourceKind::Deployment, deployments.clone());

        let reconciler = CrashLoopReconciler::new(
            cache.clone(),
            client.clone(),
            Arc::new(NamespaceAllowList::new([SCOPED_NAMESPACE])),
        );
        let controller = Controller::new(cache.clone())
            .with_error_sink(sink.clone())
            .with_queue(pods.clone(), Arc::new(reconciler))
            .with_queue(
                deployment_configs.clone(),
                Arc::new(WorkloadObserver::new(
                    WorkloadKind::DeploymentConfig,
                    cache.clone(),
                )),
            )
            .with_queue(
                deployments.clone(),
                Arc::new(WorkloadObserver::new(WorkloadKind::Deployment, cache.clone())),
            );

        let (shutdown, token) = shutdown_channel();
        let task = tokio::spawn(async move { controller.run(2, token).await });

        Self {
            cache,
            client,
            sink,
            pods,
            deployment_configs,
            deployments,
            shutdown,
            task,
        }
    }

    pub async fn stop(self) -> crashguard_core::Result<()> {
        self.shutdown.shutdown();
        self.task.await.expect("controller task panicked")
    }

    pub fn workload(&self, kind: WorkloadKind, namespace: &str, name: &str) -> WorkloadSnapshot {
        use crashguard_core::port::ResourceCache;
        self.cache
            .get_workload(kind, &ResourceKey::new(namespace, name))
            .unwrap()
            .expect("workload cached")
    }
}

pub fn crash_looping_pod(namespace: &str, name: &str, restarts: i32) -> PodSnapshot {
    PodSnapshot::new(namespace, name).with_container("app", restarts)
}

pub fn dc_pod(namespace: &str, name: &str, restarts: i32, dc: &str) -> PodSnapshot {
    crash_looping_pod(namespace, name, restarts).with_annotation(DEPLOYMENT_CONFIG_ANNOTATION, dc)
}

pub fn labelled_pod(namespace: &str, name: &str, restarts: i32, workload: &str) -> PodSnapshot {
    crash_looping_pod(namespace, name, restarts).with_label(WORKLOAD_NAME_LABEL, workload)
}

pub fn workload(kind: WorkloadKind, namespace: &str, name: &str, replicas: i32) -> WorkloadSnapshot {
    WorkloadSnapshot::new(kind, ResourceKey::new(namespace, name), replicas, replicas)
}

/// Poll `check` until it holds, failing after `timeout` of (possibly paused) time
pub async fn wait_until(what: &str, timeout: Duration, mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        sleep(Duration::from_millis(50)).await;
    }
}

/// Give workers time to drain everything already queued
pub async fn settle() {
    sleep(Duration::from_secs(1)).await;
}
