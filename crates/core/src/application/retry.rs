// Retry policy - what the worker does with a key after reconciling it
use crate::application::worker::constants::MAX_RETRIES;
use crate::error::ReconcileError;

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reconciled successfully, drop the retry history
    Forget,
    /// Retryable failure, requeue with backoff
    Requeue,
    /// Failure that cannot self-resolve, drop without retrying
    DropNonRetryable,
    /// Retryable failure after the retry budget was spent, drop and report
    DropExhausted,
}

/// Retry policy
///
/// Determines what happens to a key based on:
/// - The reconciliation result and whether its error is retryable
/// - How many times the key has already been requeued
pub struct RetryPolicy {
    max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_RETRIES)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decide the fate of a key
    ///
    /// # Arguments
    /// * `result` - Outcome of the reconciliation
    /// * `num_requeues` - Requeues recorded for the key since it was last forgotten
    pub fn decide(&self, result: &Result<(), ReconcileError>, num_requeues: u32) -> RetryDecision {
        match result {
            Ok(()) => RetryDecision::Forget,
            Err(err) if !err.is_retryable() => RetryDecision::DropNonRetryable,
            Err(_) if num_requeues < self.max_retries => RetryDecision::Requeue,
            Err(_) => RetryDecision::DropExhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ClientError;

    fn write_failure() -> Result<(), ReconcileError> {
        Err(ReconcileError::Scale {
            target: "Deployment ns/d".into(),
            source: ClientError::Transient("connection reset".into()),
        })
    }

    #[test]
    fn test_success_forgets() {
        assert_eq!(RetryPolicy::default().decide(&Ok(()), 7), RetryDecision::Forget);
    }

    #[test]
    fn test_non_retryable_is_dropped_immediately() {
        let result = Err(ReconcileError::non_retryable("bad object"));
        assert_eq!(
            RetryPolicy::default().decide(&result, 0),
            RetryDecision::DropNonRetryable
        );
    }

    #[test]
    fn test_retryable_requeued_until_ceiling() {
        let policy = RetryPolicy::default();
        for requeues in 0..10 {
            assert_eq!(policy.decide(&write_failure(), requeues), RetryDecision::Requeue);
        }
        // The 11th consecutive failure sees 10 recorded requeues.
        assert_eq!(policy.decide(&write_failure(), 10), RetryDecision::DropExhausted);
    }
}
