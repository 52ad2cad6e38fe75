// Port Layer - Interfaces for external collaborators

pub mod error_sink;
pub mod resource_cache;
pub mod workload_client;

// Re-exports
pub use error_sink::{ErrorSink, LogErrorSink};
pub use resource_cache::{
    CacheError, DeletedObject, EventSource, ObjectIdentity, ResourceCache, ResourceEventHandler,
    ResourceKind,
};
pub use workload_client::{ClientError, WorkloadClient};
