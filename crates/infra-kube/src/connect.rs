use crate::error::KubeError;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::Path;
use tracing::info;

/// Build a client from an explicit kubeconfig path, or infer one.
///
/// Inference prefers the in-cluster service account and falls back to the user's
/// default kubeconfig.
pub async fn connect(kubeconfig_path: Option<&Path>) -> Result<Client, KubeError> {
    let config = match kubeconfig_path {
        Some(path) => {
            info!(path = %path.display(), "Loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
        None => Config::infer().await?,
    };

    let client = Client::try_from(config)?;
    info!("Constructed Kubernetes client");
    Ok(client)
}
