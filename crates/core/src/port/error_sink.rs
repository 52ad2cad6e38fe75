// Error Sink Port - terminal reconciliation failures end up here

use crate::domain::ResourceKey;
use crate::error::ReconcileError;
use tracing::error;

/// Receives errors that will not be retried any further
pub trait ErrorSink: Send + Sync {
    fn report(&self, queue: &str, key: &ResourceKey, err: &ReconcileError);
}

/// Default sink: one structured error line per dropped key
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, queue: &str, key: &ResourceKey, err: &ReconcileError) {
        error!(queue = %queue, key = %key, error = %err, "Dropping key after terminal failure");
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Collects reported keys and error messages
    #[derive(Default)]
    pub struct CollectingErrorSink {
        reports: Mutex<Vec<(String, ResourceKey, String)>>,
    }

    impl CollectingErrorSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reports(&self) -> Vec<(String, ResourceKey, String)> {
            self.reports.lock().unwrap().clone()
        }

        pub fn count(&self) -> usize {
            self.reports.lock().unwrap().len()
        }
    }

    impl ErrorSink for CollectingErrorSink {
        fn report(&self, queue: &str, key: &ResourceKey, err: &ReconcileError) {
            self.reports
                .lock()
                .unwrap()
                .push((queue.to_string(), key.clone(), err.to_string()));
        }
    }
}
