//! Crashguard Controller - Main Entry Point
//! Watches pods and scales their owning workload to zero once they crash-loop

mod config;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crashguard_core::application::reconcile::{CrashLoopReconciler, WorkloadObserver};
use crashguard_core::application::{shutdown_channel, Controller, EventBridge, KeyQueue};
use crashguard_core::domain::WorkloadKind;
use crashguard_core::port::{LogErrorSink, ResourceKind};
use crashguard_infra_kube::{connect, InformerSettings, KubeResourceCache, KubeWorkloadClient};

use config::{Config, LogFormat};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LOG_FILTER: &str = "crashguard=info,kube=warn";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration (exits non-zero on missing or malformed values)
    let config = Config::parse();

    // 2. Logging
    init_logging(config.log_format)?;
    info!("Crashguard controller v{} starting...", VERSION);
    info!(
        resync_period = ?config.resync_period,
        global_resync_period = ?config.global_resync_period,
        worker_threads = config.worker_threads,
        scope = %config.scope_namespaces.join(","),
        "Loaded configuration"
    );
    let scope = config.namespace_scope()?;

    // 3. Cluster client and caches
    let client = connect(config.kubeconfig.as_deref())
        .await
        .context("Failed to create Kubernetes client")?;
    let settings = InformerSettings {
        resync_period: config.resync_period,
        relist_period: config.global_resync_period,
    };
    let cache = Arc::new(KubeResourceCache::new(
        client.clone(),
        settings,
        config.watch_deployment_configs,
    ));
    let workload_client = Arc::new(KubeWorkloadClient::new(client, cache.clone()));

    // 4. Queues, bridges and reconcilers (DI wiring)
    let pods = KeyQueue::with_default_backoff(ResourceKind::Pod.as_str());
    let deployments = KeyQueue::with_default_backoff(ResourceKind::Deployment.as_str());
    EventBridge::register(cache.as_ref(), ResourceKind::Pod, pods.clone());
    EventBridge::register(cache.as_ref(), ResourceKind::Deployment, deployments.clone());

    let mut controller = Controller::new(cache.clone())
        .with_error_sink(Arc::new(LogErrorSink))
        .with_cache_sync_timeout(config.cache_sync_timeout)
        .with_queue(
            pods,
            Arc::new(CrashLoopReconciler::new(
                cache.clone(),
                workload_client,
                scope,
            )),
        )
        .with_queue(
            deployments,
            Arc::new(WorkloadObserver::new(
                WorkloadKind::Deployment,
                cache.clone(),
            )),
        );

    if config.watch_deployment_configs {
        let deployment_configs =
            KeyQueue::with_default_backoff(ResourceKind::DeploymentConfig.as_str());
        EventBridge::register(
            cache.as_ref(),
            ResourceKind::DeploymentConfig,
            deployment_configs.clone(),
        );
        controller = controller.with_queue(
            deployment_configs,
            Arc::new(WorkloadObserver::new(
                WorkloadKind::DeploymentConfig,
                cache.clone(),
            )),
        );
    }

    // 5. Start informers and the controller
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let informers = cache.start(&shutdown_rx);

    let threads = config.worker_threads;
    let mut controller_task =
        tokio::spawn(async move { controller.run(threads, shutdown_rx).await });

    info!("Controller running. Waiting for cluster events...");

    // 6. Run until a signal arrives or the controller gives up
    let outcome = tokio::select! {
        signal = wait_for_signal() => {
            let signal = signal?;
            info!(signal, "Shutdown signal received. Draining queues...");
            shutdown_tx.shutdown();
            tokio::spawn(force_exit_on_second_signal());
            controller_task.await
        }
        joined = &mut controller_task => {
            shutdown_tx.shutdown();
            joined
        }
    };

    // 7. Graceful shutdown
    for informer in informers {
        if let Err(e) = informer.await {
            error!(error = %e, "Informer task ended abnormally");
        }
    }
    telemetry::shutdown();

    match outcome {
        Ok(Ok(())) => {
            info!("Shutdown complete.");
            Ok(())
        }
        Ok(Err(e)) => Err(e).context("Controller failed"),
        Err(e) => Err(anyhow::anyhow!("Controller task failed: {}", e)),
    }
}

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Failed to create env filter")?;

    let (otel_layer, otel_error) = match telemetry::layer() {
        Ok(layer) => (layer, None),
        Err(e) => (None, Some(e)),
    };
    let otel_enabled = otel_layer.is_some();

    let registry = tracing_subscriber::registry()
        .with(otel_layer)
        .with(env_filter);
    match format {
        // Production: JSON structured logging
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
        // Development: Pretty formatting with colors
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init()?,
    }

    if let Some(e) = otel_error {
        warn!(error = ?e, "Failed to initialize OpenTelemetry (continuing without it)");
    } else if otel_enabled {
        info!("OpenTelemetry export enabled");
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

async fn force_exit_on_second_signal() {
    if let Ok(signal) = wait_for_signal().await {
        error!(signal, "Second shutdown signal received. Exiting immediately");
        std::process::exit(1);
    }
}
