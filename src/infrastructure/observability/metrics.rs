//! Prometheus metrics

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .expect("valid uuid pattern")
});

static NUMERIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d+(/|$)").expect("valid numeric segment pattern"));

/// Handle used to render the scrape endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
    path: String,
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Install the global recorder. Returns `None` when disabled or when a
/// recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("cuy_farm_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!(path = %config.path, "Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
                path: config.path.clone(),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

pub fn create_metrics_router(metrics: PrometheusMetrics) -> Router {
    let path = metrics.path().to_string();
    Router::new()
        .route(&path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

pub fn record_alert_created(kind: &str, severity: &str) {
    counter!(
        "alerts_generated_total",
        "kind" => kind.to_string(),
        "severity" => severity.to_string()
    )
    .increment(1);
}

pub fn record_alerts_resolved(rule: &str, count: usize) {
    counter!("alerts_auto_resolved_total", "rule" => rule.to_string()).increment(count as u64);
}

pub fn record_notification(channel: &str, success: bool) {
    let outcome = if success { "sent" } else { "failed" };
    counter!(
        "notification_deliveries_total",
        "channel" => channel.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_report_generated(kind: &str, format: &str, duration: Duration) {
    let labels = [("kind", kind.to_string()), ("format", format.to_string())];

    counter!("reports_generated_total", &labels).increment(1);
    histogram!("report_generation_duration_seconds", &labels).record(duration.as_secs_f64());
}

pub fn record_job_run(job: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!("scheduler_job_runs_total", "job" => job.to_string(), "status" => status)
        .increment(1);
}

/// Collapse ids in a request path so label cardinality stays bounded
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, "{id}");
    let path = NUMERIC_SEGMENT.replace_all(&path, "/{id}$1");

    path.chars().take(60).collect()
}
