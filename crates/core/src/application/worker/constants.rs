// Worker and queue constants (no magic values)
use std::time::Duration;

/// Retryable failures allowed per key before it is dropped
pub const MAX_RETRIES: u32 = 10;

/// First requeue delay after a failure (5s)
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(5);

/// Upper bound for the per-key requeue delay (300s)
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(300);

/// Poll interval while waiting for the resource cache to finish its initial list
pub const CACHE_SYNC_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default upper bound for the initial cache sync (5 minutes)
pub const DEFAULT_CACHE_SYNC_TIMEOUT: Duration = Duration::from_secs(5 * 60);
