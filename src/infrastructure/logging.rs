use opentelemetry::trace::TracerProvider as _;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::{LogFormat, LoggingConfig};
use crate::infrastructure::observability::{init_tracer_provider, TracingConfig};

/// Install the global subscriber: env filter, pretty or JSON output and,
/// when enabled, an OpenTelemetry layer.
pub fn init_logging(config: &LoggingConfig, tracing_config: &TracingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    };

    let (otel_layer, otel_error) = if tracing_config.enabled {
        match init_tracer_provider(tracing_config) {
            Ok(provider) => {
                let tracer = provider.tracer("cuy-farm");
                (Some(tracing_opentelemetry::layer().with_tracer(tracer)), None)
            }
            Err(e) => (None, Some(e)),
        }
    } else {
        (None, None)
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init();

    if installed.is_err() {
        return;
    }

    match otel_error {
        Some(e) => tracing::warn!("Failed to initialize OpenTelemetry: {}. Export disabled.", e),
        None if tracing_config.enabled => tracing::info!(
            endpoint = %tracing_config.otlp_endpoint,
            "Tracing initialized with OpenTelemetry export"
        ),
        None => tracing::info!(level = %config.level, "Logging initialized"),
    }
}
