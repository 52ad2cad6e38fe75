// Crashguard Infra Kube - Kubernetes adapters for the core ports
// Implements: ResourceCache, EventSource, WorkloadClient

pub mod cache;
pub mod connect;
pub mod convert;
pub mod error;
pub mod informer;
pub mod workload_client;

pub use cache::{deployment_config_resource, KubeResourceCache};
pub use connect::connect;
pub use error::KubeError;
pub use informer::{Informer, InformerSettings};
pub use workload_client::KubeWorkloadClient;
