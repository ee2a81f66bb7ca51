//! Observability: OTLP tracing export and Prometheus metrics

mod config;
mod metrics;
mod tracing_setup;

pub use config::{MetricsConfig, ObservabilityConfig, TracingConfig};
pub use metrics::{
    create_metrics_router, init_metrics, record_alert_created, record_alerts_resolved,
    record_http_request, record_job_run, record_notification, record_report_generated,
    PrometheusMetrics,
};
pub use tracing_setup::{init_tracer_provider, shutdown_tracing};
