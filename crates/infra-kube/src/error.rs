use thiserror::Error;

/// Errors emitted while connecting to the cluster.
#[derive(Debug, Error)]
pub enum KubeError {
    /// The kubeconfig file named by the operator could not be loaded.
    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Neither an in-cluster service account nor a default kubeconfig was usable.
    #[error("Failed to infer cluster configuration: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    /// The client could not be built from the resolved configuration.
    #[error("Failed to build Kubernetes client: {0}")]
    Client(#[from] kube::Error),
}
