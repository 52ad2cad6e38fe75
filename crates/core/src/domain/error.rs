// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid resource key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("Object has no name (namespace: {namespace:?})")]
    MissingName { namespace: Option<String> },
}

pub type Result<T> = std::result::Result<T, DomainError>;
