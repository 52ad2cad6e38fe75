// Worker - drains one key queue through a reconciler

pub mod constants;
mod panic_guard;
mod shutdown;

pub use panic_guard::{describe_join_error, panic_message};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::queue::KeyQueue;
use crate::application::reconcile::Reconciler;
use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::domain::ResourceKey;
use crate::error::ReconcileError;
use crate::port::ErrorSink;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Worker processes keys from a queue until the queue is shut down and drained
pub struct Worker {
    id: usize,
    queue: KeyQueue,
    reconciler: Arc<dyn Reconciler>,
    retry_policy: Arc<RetryPolicy>,
    error_sink: Arc<dyn ErrorSink>,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: KeyQueue,
        reconciler: Arc<dyn Reconciler>,
        retry_policy: Arc<RetryPolicy>,
        error_sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            id,
            queue,
            reconciler,
            retry_policy,
            error_sink,
        }
    }

    /// Run the worker loop; returns once the queue reports shutdown
    pub async fn run(&self) {
        info!(queue = %self.queue.name(), worker = self.id, "Worker started");
        while self.process_next_item().await {}
        info!(queue = %self.queue.name(), worker = self.id, "Worker stopped");
    }

    /// Process one key (returns false once the queue is shut down and empty)
    pub async fn process_next_item(&self) -> bool {
        let Some(key) = self.queue.get().await else {
            return false;
        };

        debug!(queue = %self.queue.name(), key = %key, "Reconciling");
        let result = self.reconcile_isolated(&key).await;
        self.handle_result(&key, result);
        self.queue.done(&key);
        true
    }

    /// Run the reconciler in its own task so a panic only fails this key
    async fn reconcile_isolated(&self, key: &ResourceKey) -> Result<(), ReconcileError> {
        let reconciler = Arc::clone(&self.reconciler);
        let key = key.clone();
        let handle = tokio::spawn(async move { reconciler.reconcile(&key).await });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(ReconcileError::Panicked(describe_join_error(join_err))),
        }
    }

    fn handle_result(&self, key: &ResourceKey, result: Result<(), ReconcileError>) {
        let queue = self.queue.name();
        let num_requeues = self.queue.num_requeues(key);

        match self.retry_policy.decide(&result, num_requeues) {
            RetryDecision::Forget => {
                self.queue.forget(key);
            }
            RetryDecision::Requeue => {
                if let Err(e) = &result {
                    info!(
                        queue = %queue,
                        key = %key,
                        attempt = num_requeues + 1,
                        error = %e,
                        "Retrying - reconciliation failed"
                    );
                }
                self.queue.add_rate_limited(key.clone());
            }
            RetryDecision::DropNonRetryable => {
                if let Err(e) = &result {
                    error!(
                        queue = %queue,
                        key = %key,
                        error = %e,
                        "Non-retryable error, dropping key"
                    );
                    if matches!(e, ReconcileError::Panicked(_)) {
                        self.error_sink.report(queue, key, e);
                    }
                }
                self.queue.forget(key);
            }
            RetryDecision::DropExhausted => {
                if let Err(e) = &result {
                    error!(
                        queue = %queue,
                        key = %key,
                        max_retries = self.retry_policy.max_retries(),
                        error = %e,
                        "Exhausted all retries"
                    );
                    self.error_sink.report(queue, key, e);
                }
                self.queue.forget(key);
            }
        }
    }
}
