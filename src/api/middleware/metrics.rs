//! Per-request Prometheus metrics

use std::time::Instant;

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};

use crate::infrastructure::observability::record_http_request;

pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = route_label(&request);

    let response = next.run(request).await;

    record_http_request(
        method.as_str(),
        &path,
        response.status().as_u16(),
        start.elapsed(),
    );

    response
}

/// Matched route template when available, keeping label cardinality bounded
pub(crate) fn route_label(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_label_falls_back_to_uri() {
        let request = Request::builder()
            .uri("/api/cuyes?limit=5")
            .body(Body::empty())
            .unwrap();

        assert_eq!(route_label(&request), "/api/cuyes");
    }
}
