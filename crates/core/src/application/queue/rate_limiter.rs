// Per-key rate limiting for requeued work

use crate::domain::ResourceKey;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::application::worker::constants::{DEFAULT_RETRY_BASE_DELAY, DEFAULT_RETRY_MAX_DELAY};

/// Decides how long a key waits before it is redelivered after a failure
pub trait RateLimiter: Send + Sync {
    /// Delay for the next requeue of `key`; records one more failure
    fn when(&self, key: &ResourceKey) -> Duration;

    /// Clear the failure history of `key`
    fn forget(&self, key: &ResourceKey);

    /// Failures recorded for `key` since it was last forgotten
    fn num_requeues(&self, key: &ResourceKey) -> u32;
}

/// Exponential per-key backoff: `base * 2^failures`, capped at `max`
///
/// With the controller defaults (5s base, 300s cap) the Nth requeue waits
/// `min(5s * 2^(N-1), 300s)`.
pub struct ItemExponentialFailureRateLimiter {
    base_delay: Duration,
    max_delay: Duration,
    failures: Mutex<HashMap<ResourceKey, u32>>,
}

impl ItemExponentialFailureRateLimiter {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Backoff used by every controller queue (5s doubling up to 300s)
    pub fn controller_default() -> Self {
        Self::new(DEFAULT_RETRY_BASE_DELAY, DEFAULT_RETRY_MAX_DELAY)
    }

    /// Delay after `exponent` previous failures
    pub fn backoff(&self, exponent: u32) -> Duration {
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    fn failures(&self) -> MutexGuard<'_, HashMap<ResourceKey, u32>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RateLimiter for ItemExponentialFailureRateLimiter {
    fn when(&self, key: &ResourceKey) -> Duration {
        let exponent = {
            let mut failures = self.failures();
            let count = failures.entry(key.clone()).or_insert(0);
            let exponent = *count;
            *count = count.saturating_add(1);
            exponent
        };
        self.backoff(exponent)
    }

    fn forget(&self, key: &ResourceKey) {
        self.failures().remove(key);
    }

    fn num_requeues(&self, key: &ResourceKey) -> u32 {
        self.failures().get(key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ResourceKey {
        ResourceKey::new("ns", "p1")
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let limiter = ItemExponentialFailureRateLimiter::controller_default();
        let delays: Vec<u64> = (0..7).map(|_| limiter.when(&key()).as_secs()).collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 80, 160, 300]);
        assert_eq!(limiter.num_requeues(&key()), 7);
    }

    #[test]
    fn test_backoff_capped_at_max() {
        let limiter = ItemExponentialFailureRateLimiter::controller_default();
        for n in 1..=40u32 {
            let expected = Duration::from_secs(5)
                .checked_mul(2u32.saturating_pow(n - 1))
                .map_or(Duration::from_secs(300), |d| d.min(Duration::from_secs(300)));
            assert_eq!(limiter.when(&key()), expected, "requeue #{}", n);
        }
    }

    #[test]
    fn test_forget_resets_to_base() {
        let limiter = ItemExponentialFailureRateLimiter::controller_default();
        limiter.when(&key());
        limiter.when(&key());
        limiter.forget(&key());

        assert_eq!(limiter.num_requeues(&key()), 0);
        assert_eq!(limiter.when(&key()), Duration::from_secs(5));
    }

    #[test]
    fn test_keys_are_tracked_independently() {
        let limiter = ItemExponentialFailureRateLimiter::controller_default();
        let other = ResourceKey::new("ns", "p2");
        limiter.when(&key());
        limiter.when(&key());

        assert_eq!(limiter.when(&other), Duration::from_secs(5));
        assert_eq!(limiter.num_requeues(&key()), 2);
        assert_eq!(limiter.num_requeues(&other), 1);
    }
}
