//! Controller - wires key queues to worker pools and owns the run/shutdown lifecycle
//!
//! `run` blocks until the shutdown token fires:
//! 1. wait for the resource cache to finish its initial sync
//! 2. start `threads` workers per queue
//! 3. on shutdown, shut every queue down and join all workers

use crate::application::queue::KeyQueue;
use crate::application::reconcile::Reconciler;
use crate::application::retry::RetryPolicy;
use crate::application::worker::constants::{CACHE_SYNC_POLL_INTERVAL, DEFAULT_CACHE_SYNC_TIMEOUT};
use crate::application::worker::{ShutdownToken, Worker};
use crate::error::{AppError, Result};
use crate::port::{ErrorSink, LogErrorSink, ResourceCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{error, info};

struct Pipeline {
    queue: KeyQueue,
    reconciler: Arc<dyn Reconciler>,
}

pub struct Controller {
    cache: Arc<dyn ResourceCache>,
    pipelines: Vec<Pipeline>,
    retry_policy: Arc<RetryPolicy>,
    error_sink: Arc<dyn ErrorSink>,
    cache_sync_timeout: Duration,
}

impl Controller {
    pub fn new(cache: Arc<dyn ResourceCache>) -> Self {
        Self {
            cache,
            pipelines: Vec::new(),
            retry_policy: Arc::new(RetryPolicy::default()),
            error_sink: Arc::new(LogErrorSink),
            cache_sync_timeout: DEFAULT_CACHE_SYNC_TIMEOUT,
        }
    }

    /// Drain `queue` through `reconciler`
    pub fn with_queue(mut self, queue: KeyQueue, reconciler: Arc<dyn Reconciler>) -> Self {
        self.pipelines.push(Pipeline { queue, reconciler });
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = Arc::new(retry_policy);
        self
    }

    pub fn with_error_sink(mut self, error_sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sink = error_sink;
        self
    }

    pub fn with_cache_sync_timeout(mut self, timeout: Duration) -> Self {
        self.cache_sync_timeout = timeout;
        self
    }

    pub fn queues(&self) -> impl Iterator<Item = &KeyQueue> {
        self.pipelines.iter().map(|p| &p.queue)
    }

    /// Run until `shutdown` fires, then drain and join every worker.
    ///
    /// # Errors
    /// - `AppError::Config` if `threads` is zero
    /// - `AppError::CacheSync` if the cache did not sync in time or shutdown arrived first
    pub async fn run(&self, threads: usize, mut shutdown: ShutdownToken) -> Result<()> {
        if threads == 0 {
            return Err(AppError::Config("worker threads must be at least 1".into()));
        }

        info!(queues = self.pipelines.len(), "Starting controller");
        if let Err(e) = self.wait_for_cache_sync(&mut shutdown).await {
            self.shut_down_queues();
            return Err(e);
        }
        info!("Cache sync complete");

        let mut workers = JoinSet::new();
        for pipeline in &self.pipelines {
            for id in 0..threads {
                let worker = Worker::new(
                    id,
                    pipeline.queue.clone(),
                    Arc::clone(&pipeline.reconciler),
                    Arc::clone(&self.retry_policy),
                    Arc::clone(&self.error_sink),
                );
                workers.spawn(async move { worker.run().await });
            }
        }
        info!(threads, "Started workers");

        shutdown.wait().await;
        info!("Shutting down workers");
        self.shut_down_queues();

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Worker task ended abnormally");
            }
        }
        info!("All workers stopped");
        Ok(())
    }

    fn shut_down_queues(&self) {
        for queue in self.queues() {
            queue.shut_down();
        }
    }

    async fn wait_for_cache_sync(&self, shutdown: &mut ShutdownToken) -> Result<()> {
        let deadline = Instant::now() + self.cache_sync_timeout;
        let mut ticker = interval(CACHE_SYNC_POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.cache.has_synced() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AppError::CacheSync(format!(
                    "caches not synced after {:?}",
                    self.cache_sync_timeout
                )));
            }
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.wait() => {
                    return Err(AppError::CacheSync(
                        "shutdown requested before caches synced".into(),
                    ));
                }
            }
        }
    }
}
