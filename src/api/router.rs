use axum::{middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::farm;
use super::health;
use super::middleware::{
    logging_middleware, metrics_middleware, require_api_key, security_headers_middleware,
};
use super::state::AppState;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Create the full router with application state
pub fn create_router(state: AppState, metrics: Option<PrometheusMetrics>) -> Router {
    let api = farm::create_farm_router()
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
        // Added after the route layer so signed links skip the API key
        .merge(farm::create_download_router());

    let mut router = Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .nest("/api", api)
        .with_state(state)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    if let Some(m) = metrics {
        router = router.merge(create_metrics_router(m));
    }

    router
}
