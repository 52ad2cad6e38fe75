// Domain Layer - Pure data model of the controller

pub mod error;
pub mod key;
pub mod pod;
pub mod workload;

// Re-exports
pub use error::DomainError;
pub use key::ResourceKey;
pub use pod::{ContainerStatus, PodSnapshot};
pub use workload::{
    OwnerCandidate, OwnerSource, ScaleMutation, WorkloadKind, WorkloadRef, WorkloadSnapshot,
};
