// Workload Client Port
// Write path to the cluster API for scalable workloads

use crate::domain::{ScaleMutation, WorkloadSnapshot};
use async_trait::async_trait;
use thiserror::Error;

/// Structured cluster API write errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Rejected by API server: {0}")]
    Rejected(String),
}

/// Cluster API client for workloads
///
/// Implementations:
/// - KubeWorkloadClient: full-object replace through the Kubernetes API
#[async_trait]
pub trait WorkloadClient: Send + Sync {
    /// Write `mutation` onto the workload described by `current`.
    ///
    /// The update is a full-object write scoped to the workload's own namespace. Optimistic
    /// concurrency is left to the API server.
    async fn update_workload(
        &self,
        current: &WorkloadSnapshot,
        mutation: &ScaleMutation,
    ) -> Result<(), ClientError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::port::resource_cache::mocks::InMemoryResourceCache;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    /// Mock client behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with the given error
        Fail(ClientError),
        /// Fail the first N calls, then succeed
        FailTimes(usize, ClientError),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Records every update call; optionally writes successful mutations back into a cache
    pub struct RecordingWorkloadClient {
        behavior: Mutex<MockBehavior>,
        calls: Mutex<Vec<(ScaleMutation, Instant)>>,
        cache: Option<Arc<InMemoryResourceCache>>,
    }

    impl RecordingWorkloadClient {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Mutex::new(behavior),
                calls: Mutex::new(Vec::new()),
                cache: None,
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(error: ClientError) -> Self {
            Self::new(MockBehavior::Fail(error))
        }

        /// Reflect successful writes into `cache`, as a watch on the API server would
        pub fn with_cache(mut self, cache: Arc<InMemoryResourceCache>) -> Self {
            self.cache = Some(cache);
            self
        }

        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn mutations(&self) -> Vec<ScaleMutation> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(m, _)| m.clone())
                .collect()
        }

        pub fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }
    }

    #[async_trait]
    impl WorkloadClient for RecordingWorkloadClient {
        async fn update_workload(
            &self,
            current: &WorkloadSnapshot,
            mutation: &ScaleMutation,
        ) -> Result<(), ClientError> {
            let call_index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((mutation.clone(), Instant::now()));
                calls.len()
            };

            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                MockBehavior::Success => {}
                MockBehavior::Fail(err) => return Err(err),
                MockBehavior::FailTimes(n, err) if call_index <= n => return Err(err),
                MockBehavior::FailTimes(..) => {}
                MockBehavior::Panic(msg) => panic!("{}", msg),
            }

            if let Some(cache) = &self.cache {
                cache.upsert_workload(mutation.apply(current));
            }
            Ok(())
        }
    }
}
