//! Optional OpenTelemetry trace export
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
//! - `OTEL_SERVICE_NAME`: Service name (default: crashguard-controller)

use anyhow::Result;
use tracing_subscriber::{Layer, Registry};

pub type TelemetryLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Export layer when an OTLP endpoint is configured.
///
/// Called before the subscriber is installed, so problems are returned rather than logged.
pub fn layer() -> Result<Option<TelemetryLayer>> {
    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok(None);
    };

    #[cfg(feature = "telemetry")]
    return otlp_layer(&endpoint).map(Some);

    #[cfg(not(feature = "telemetry"))]
    anyhow::bail!(
        "OTEL_EXPORTER_OTLP_ENDPOINT={} set but feature 'telemetry' not enabled (rebuild with --features telemetry)",
        endpoint
    );
}

/// Flush pending spans
pub fn shutdown() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(feature = "telemetry")]
fn otlp_layer(endpoint: &str) -> Result<TelemetryLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "crashguard-controller".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.clone(),
        )]))
        .build();
    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(Box::new(tracing_opentelemetry::layer().with_tracer(tracer)))
}
