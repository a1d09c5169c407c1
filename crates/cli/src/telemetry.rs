//! Tracing subscriber and OpenTelemetry exporter wiring.

use anyhow::Context;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, TelemetrySettings};

const SERVICE_NAME: &str = "nodeflow";

/// Flushes exported spans on shutdown.
#[must_use]
pub struct TelemetryGuard {
    exporting: bool,
}

impl TelemetryGuard {
    pub fn shutdown(self) {
        if self.exporting {
            global::shutdown_tracer_provider();
        }
    }
}

/// Installs the global subscriber. Log output goes to stderr so that stdout
/// carries only command results.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<TelemetryGuard> {
    let filter = EnvFilter::try_new(&settings.log_level)
        .with_context(|| format!("invalid log level '{}'", settings.log_level))?;

    let otel_layer = match &settings.otlp_endpoint {
        Some(endpoint) => {
            let exporter = SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint.clone())
                .build()
                .context("failed to create OTLP span exporter")?;
            let provider = TracerProvider::builder()
                .with_batch_exporter(exporter, runtime::Tokio)
                .with_resource(Resource::new(vec![
                    KeyValue::new("service.name", SERVICE_NAME),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                ]))
                .build();
            let tracer = provider.tracer(SERVICE_NAME);
            global::set_tracer_provider(provider);
            Some(OpenTelemetryLayer::new(tracer))
        }
        None => None,
    };

    let (json_layer, text_layer) = match settings.log_format {
        LogFormat::Json => (
            Some(fmt::layer().json().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Text => (None, Some(fmt::layer().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(otel_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::debug!(
        log_format = ?settings.log_format,
        otlp_endpoint = ?settings.otlp_endpoint,
        "Telemetry initialised"
    );

    Ok(TelemetryGuard {
        exporting: settings.otlp_endpoint.is_some(),
    })
}
