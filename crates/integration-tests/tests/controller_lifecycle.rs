//! Controller lifecycle: cache sync gating, notification plumbing and shutdown.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use crashguard_core::domain::{ResourceKey, WorkloadKind};
use crashguard_core::port::resource_cache::mocks::InMemoryResourceCache;
use crashguard_core::port::workload_client::mocks::MockBehavior;
use crashguard_core::port::{CacheError, ResourceKind};
use crashguard_core::AppError;

#[tokio::test(start_paused = true)]
async fn test_no_reconciliation_before_cache_sync() {
    let cache = Arc::new(InMemoryResourceCache::new());
    cache.set_synced(false);
    let harness = Harness::start_with_cache(cache, MockBehavior::Success);

    harness
        .cache
        .upsert_workload(workload(WorkloadKind::DeploymentConfig, "ns", "dc1", 2));
    harness.cache.upsert_pod(dc_pod("ns", "p1", 3, "dc1"));
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(harness.client.call_count(), 0);
    assert_eq!(harness.pods.len(), 1);

    harness.cache.set_synced(true);
    wait_until("scale after sync", Duration::from_secs(5), || {
        harness.client.call_count() == 1
    })
    .await;

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cache_sync_timeout_is_fatal() {
    let cache = Arc::new(InMemoryResourceCache::new());
    cache.set_synced(false);
    let harness = Harness::start_with_cache(cache, MockBehavior::Success);

    // Default timeout is five minutes
    tokio::time::sleep(Duration::from_secs(301)).await;
    assert!(harness.pods.is_shutting_down());

    let result = harness.stop().await;
    assert!(matches!(result, Err(AppError::CacheSync(_))));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_before_sync_returns_error() {
    let cache = Arc::new(InMemoryResourceCache::new());
    cache.set_synced(false);
    let harness = Harness::start_with_cache(cache, MockBehavior::Success);
    settle().await;

    let result = harness.stop().await;
    assert!(matches!(result, Err(AppError::CacheSync(_))));
}

#[tokio::test(start_paused = true)]
async fn test_workload_notifications_are_drained() {
    let harness = Harness::start(MockBehavior::Success);
    for i in 0..5 {
        harness.cache.upsert_workload(workload(
            WorkloadKind::Deployment,
            "ns",
            &format!("web-{}", i),
            1,
        ));
        harness.cache.upsert_workload(workload(
            WorkloadKind::DeploymentConfig,
            "ns",
            &format!("dc-{}", i),
            1,
        ));
    }

    wait_until("workload queues drained", Duration::from_secs(5), || {
        harness.deployments.is_empty() && harness.deployment_configs.is_empty()
    })
    .await;

    assert_eq!(harness.client.call_count(), 0);
    assert_eq!(harness.sink.count(), 0);
    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_tombstone_for_vanished_pod_is_reconciled() {
    let harness = Harness::start(MockBehavior::Success);
    harness.cache.emit_tombstone(ResourceKind::Pod, "ns/missed");
    settle().await;

    assert!(harness.pods.is_empty());
    assert_eq!(harness.client.call_count(), 0);
    assert_eq!(harness.sink.count(), 0);

    // Malformed tombstone keys never reach the queue
    harness.cache.emit_tombstone(ResourceKind::Pod, "a/b/c");
    assert!(harness.pods.is_empty());

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_transient_cache_failure_is_retried() {
    let harness = Harness::start(MockBehavior::Success);
    harness
        .cache
        .upsert_workload(workload(WorkloadKind::DeploymentConfig, "ns", "dc1", 2));
    harness
        .cache
        .fail_reads(Some(CacheError::Unavailable("informer restarting".into())));
    harness.cache.upsert_pod(dc_pod("ns", "p1", 3, "dc1"));

    wait_until("first failed read", Duration::from_secs(5), || {
        harness.pods.num_requeues(&ResourceKey::new("ns", "p1")) == 1
    })
    .await;
    harness.cache.fail_reads(None);

    wait_until("scale after recovery", Duration::from_secs(30), || {
        harness.client.call_count() == 1
    })
    .await;
    settle().await;
    assert_eq!(harness.pods.num_requeues(&ResourceKey::new("ns", "p1")), 0);

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_panicking_write_does_not_stop_workers() {
    let harness = Harness::start(MockBehavior::Panic("client bug".into()));
    harness
        .cache
        .upsert_workload(workload(WorkloadKind::DeploymentConfig, "ns", "dc1", 2));
    harness.cache.upsert_pod(dc_pod("ns", "p1", 3, "dc1"));

    wait_until("panic reported", Duration::from_secs(5), || {
        harness.sink.count() == 1
    })
    .await;
    assert!(harness.sink.reports()[0].2.contains("client bug"));

    harness.client.set_behavior(MockBehavior::Success);
    harness
        .cache
        .upsert_workload(workload(WorkloadKind::Deployment, "ns", "app", 1));
    harness.cache.upsert_pod(labelled_pod("ns", "p2", 3, "app"));

    wait_until("scale after panic", Duration::from_secs(5), || {
        harness.client.call_count() == 2
    })
    .await;

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_pending_retries() {
    let harness = Harness::start(MockBehavior::Fail(
        crashguard_core::port::ClientError::Transient("timeout".into()),
    ));
    harness
        .cache
        .upsert_workload(workload(WorkloadKind::DeploymentConfig, "ns", "dc1", 2));
    harness.cache.upsert_pod(dc_pod("ns", "p1", 3, "dc1"));

    wait_until("first attempt", Duration::from_secs(5), || {
        harness.client.call_count() == 1
    })
    .await;

    let client = harness.client.clone();
    let pods = harness.pods.clone();
    harness.stop().await.unwrap();

    assert!(pods.is_shutting_down());
    assert_eq!(pods.waiting_len(), 0);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(client.call_count(), 1);
}
