// Central Error Types for the Controller

use crate::port::{CacheError, ClientError};
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache sync failed: {0}")]
    CacheSync(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Outcome of a failed reconciliation.
///
/// The worker pool decides retry vs. drop through [`ReconcileError::is_retryable`].
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A condition that re-running the reconciler cannot fix
    #[error("{0}")]
    NonRetryable(String),

    #[error("Error fetching {key} from cache: {source}")]
    Cache {
        key: String,
        #[source]
        source: CacheError,
    },

    #[error("Failed to scale {target} to zero: {source}")]
    Scale {
        target: String,
        #[source]
        source: ClientError,
    },

    #[error("Reconciler panicked: {0}")]
    Panicked(String),
}

impl ReconcileError {
    pub fn non_retryable(msg: impl Into<String>) -> Self {
        ReconcileError::NonRetryable(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::NonRetryable(_) | ReconcileError::Panicked(_) => false,
            ReconcileError::Cache { source, .. } => source.is_transient(),
            ReconcileError::Scale { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ResourceKind;

    #[test]
    fn test_retryable_classification() {
        assert!(!ReconcileError::non_retryable("missing label").is_retryable());
        assert!(!ReconcileError::Panicked("boom".into()).is_retryable());

        let transient = ReconcileError::Cache {
            key: "ns/p".into(),
            source: CacheError::Unavailable("store closed".into()),
        };
        assert!(transient.is_retryable());

        let malformed = ReconcileError::Cache {
            key: "ns/dc".into(),
            source: CacheError::Malformed {
                kind: ResourceKind::DeploymentConfig,
                key: "ns/dc".into(),
                reason: "spec.replicas missing".into(),
            },
        };
        assert!(!malformed.is_retryable());

        let write = ReconcileError::Scale {
            target: "Deployment ns/d".into(),
            source: ClientError::Conflict("stale resourceVersion".into()),
        };
        assert!(write.is_retryable());
    }
}
