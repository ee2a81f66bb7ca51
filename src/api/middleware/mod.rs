//! API middleware components

pub mod auth;
pub mod logging;
pub mod metrics;
pub mod security;

pub use auth::{require_api_key, ApiKeyAuth};
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
pub use security::security_headers_middleware;
