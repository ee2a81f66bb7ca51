//! Request/response logging with header redaction

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::info;

use super::metrics::route_label;

/// Logs each request and its outcome. Span creation is left to `TraceLayer`.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let path = route_label(&request);
    let request_id = request_id(&request);
    let headers = redact_headers(&request);

    info!(
        method = %method,
        path = %path,
        uri = %uri,
        request_id = %request_id,
        headers = %headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = %request_id,
        "Request completed"
    );

    response
}

fn request_id(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn redact_headers(request: &Request<Body>) -> String {
    request
        .headers()
        .iter()
        .filter(|(name, _)| should_log_header(name.as_str()))
        .map(|(name, value)| {
            let value = if is_sensitive_header(name.as_str()) {
                "[REDACTED]"
            } else {
                value.to_str().unwrap_or("[invalid]")
            };
            format!("{}={}", name.as_str(), value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_sensitive_header(name: &str) -> bool {
    matches!(
        name,
        "authorization" | "x-api-key" | "cookie" | "set-cookie" | "proxy-authorization"
    )
}

fn should_log_header(name: &str) -> bool {
    matches!(
        name,
        "content-type"
            | "content-length"
            | "accept"
            | "range"
            | "user-agent"
            | "x-request-id"
            | "x-forwarded-for"
            | "authorization"
            | "x-api-key"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_credentials() {
        let request = Request::builder()
            .header("x-api-key", "granja-key")
            .header("range", "bytes=0-99")
            .header("cache-control", "no-cache")
            .body(Body::empty())
            .unwrap();

        let logged = redact_headers(&request);
        assert!(logged.contains("x-api-key=[REDACTED]"));
        assert!(logged.contains("range=bytes=0-99"));
        assert!(!logged.contains("granja-key"));
        assert!(!logged.contains("cache-control"));
    }

    #[test]
    fn test_request_id_is_reused() {
        let request = Request::builder()
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap();

        assert_eq!(request_id(&request), "req-42");
    }
}
