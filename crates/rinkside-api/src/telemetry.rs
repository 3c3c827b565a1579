//! Tracing and metrics bootstrap.

use opentelemetry::KeyValue;
use opentelemetry::metrics::Meter;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rinkside_core::metrics::{MetricTags, Metrics};

use crate::error::AppError;

/// Initializes the tracing subscriber: JSON logs with env-filter, plus an
/// OTLP span exporter when an endpoint is configured.
///
/// # Errors
///
/// `AppError::Config` when the OTLP exporter cannot be built.
pub fn init_tracing(otlp_endpoint: Option<&str>) -> Result<(), AppError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json();

    if let Some(endpoint) = otlp_endpoint {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| AppError::Config(format!("OTLP exporter: {e}")))?;
        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .build();
        let tracer = provider.tracer("rinkside-api");
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
    Ok(())
}

/// `Metrics` sink backed by the OpenTelemetry meter API. Export failures
/// stay inside the OTLP pipeline and never reach callers.
pub struct OtelMetrics {
    meter: Meter,
}

impl OtelMetrics {
    /// Creates a sink on the global meter provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            meter: opentelemetry::global::meter("rinkside"),
        }
    }
}

impl Default for OtelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn to_key_values(tags: MetricTags<'_>) -> Vec<KeyValue> {
    tags.iter()
        .map(|(key, value)| KeyValue::new(*key, value.clone()))
        .collect()
}

impl Metrics for OtelMetrics {
    fn record_value(&self, name: &'static str, value: f64, tags: MetricTags<'_>) {
        let histogram = self.meter.f64_histogram(name).build();
        histogram.record(value, &to_key_values(tags));
    }

    fn increment(&self, name: &'static str, tags: MetricTags<'_>) {
        let counter = self.meter.u64_counter(name).build();
        counter.add(1, &to_key_values(tags));
    }
}
