// Key Queue - deduplicating, delaying, rate-limited work queue of resource keys
//
// A key is in at most one of two places: `queue` (pending) or `processing` (in flight).
// `dirty` holds every key that needs processing, including in-flight keys that were re-added;
// those are pushed back onto `queue` by `done`.

pub mod rate_limiter;

pub use rate_limiter::{ItemExponentialFailureRateLimiter, RateLimiter};

use crate::domain::ResourceKey;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

#[derive(Default)]
struct QueueState {
    queue: VecDeque<ResourceKey>,
    dirty: HashSet<ResourceKey>,
    processing: HashSet<ResourceKey>,
    waiting: HashMap<ResourceKey, Instant>,
    shutting_down: bool,
}

struct Inner {
    name: String,
    state: Mutex<QueueState>,
    ready: Notify,
    closed: watch::Sender<bool>,
    limiter: Box<dyn RateLimiter>,
}

/// Work queue shared by the event bridge (producer) and the worker pool (consumers)
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct KeyQueue {
    inner: Arc<Inner>,
}

impl KeyQueue {
    pub fn new(name: impl Into<String>, limiter: impl RateLimiter + 'static) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                state: Mutex::new(QueueState::default()),
                ready: Notify::new(),
                closed,
                limiter: Box::new(limiter),
            }),
        }
    }

    /// Queue with the controller's default 5s..300s exponential backoff
    pub fn with_default_backoff(name: impl Into<String>) -> Self {
        Self::new(name, ItemExponentialFailureRateLimiter::controller_default())
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `key` as needing processing.
    ///
    /// No-op when the key is already pending. When the key is in flight it is redelivered
    /// once, after the current holder calls [`KeyQueue::done`]. Ignored after shutdown.
    pub fn add(&self, key: ResourceKey) {
        let mut state = self.state();
        if state.shutting_down || state.dirty.contains(&key) {
            return;
        }
        state.dirty.insert(key.clone());
        if state.processing.contains(&key) {
            debug!(queue = %self.inner.name, key = %key, "Key in flight, deferring redelivery");
            return;
        }
        state.queue.push_back(key);
        drop(state);
        self.inner.ready.notify_one();
    }

    /// Add `key` once `delay` has elapsed. A key already waiting keeps its earliest deadline.
    pub fn add_after(&self, key: ResourceKey, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }

        let deadline = Instant::now() + delay;
        {
            let mut state = self.state();
            if state.shutting_down {
                return;
            }
            if matches!(state.waiting.get(&key), Some(existing) if *existing <= deadline) {
                return;
            }
            state.waiting.insert(key.clone(), deadline);
        }

        let queue = self.clone();
        let mut closed = self.inner.closed.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = sleep_until(deadline) => queue.fire(key, deadline),
                _ = closed.wait_for(|closed| *closed) => {}
            }
        });
    }

    fn fire(&self, key: ResourceKey, deadline: Instant) {
        let due = {
            let mut state = self.state();
            if state.waiting.get(&key) == Some(&deadline) {
                state.waiting.remove(&key);
                true
            } else {
                false
            }
        };
        if due {
            self.add(key);
        }
    }

    /// Requeue `key` after the rate limiter's backoff for it
    pub fn add_rate_limited(&self, key: ResourceKey) {
        let delay = self.inner.limiter.when(&key);
        debug!(
            queue = %self.inner.name,
            key = %key,
            delay_ms = delay.as_millis() as u64,
            "Scheduling rate-limited requeue"
        );
        self.add_after(key, delay);
    }

    /// Drop the retry history of `key`
    pub fn forget(&self, key: &ResourceKey) {
        self.inner.limiter.forget(key);
    }

    /// Times `key` was rate-limited since it was last forgotten
    pub fn num_requeues(&self, key: &ResourceKey) -> u32 {
        self.inner.limiter.num_requeues(key)
    }

    /// Wait for the next key.
    ///
    /// Returns `None` once the queue is shut down and every pending key has been handed out.
    /// The returned key is in flight until [`KeyQueue::done`] is called for it.
    pub async fn get(&self) -> Option<ResourceKey> {
        loop {
            let notified = self.inner.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Finish processing `key`, redelivering it if it was re-added while in flight
    pub fn done(&self, key: &ResourceKey) {
        let mut state = self.state();
        state.processing.remove(key);
        if state.dirty.contains(key) {
            state.queue.push_back(key.clone());
            drop(state);
            self.inner.ready.notify_one();
        }
    }

    /// Stop accepting keys and wake every blocked `get`.
    ///
    /// Keys already pending are still handed out; delayed adds are cancelled.
    pub fn shut_down(&self) {
        {
            let mut state = self.state();
            if state.shutting_down {
                return;
            }
            state.shutting_down = true;
            state.waiting.clear();
        }
        info!(queue = %self.inner.name, "Shutting down queue");
        self.inner.closed.send_replace(true);
        self.inner.ready.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state().shutting_down
    }

    /// Number of pending (not in-flight) keys
    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys waiting on a delayed add
    pub fn waiting_len(&self) -> usize {
        self.state().waiting.len()
    }
}
