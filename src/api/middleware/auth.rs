//! Static API key authentication

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;

/// Configured keys, kept only as SHA-256 digests
#[derive(Clone)]
pub struct ApiKeyAuth {
    enabled: bool,
    digests: Vec<[u8; 32]>,
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("enabled", &self.enabled)
            .field("keys", &self.digests.len())
            .finish()
    }
}

impl ApiKeyAuth {
    pub fn new(enabled: bool, keys: &[String]) -> Self {
        Self {
            enabled,
            digests: keys
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .map(digest)
                .collect(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, &[])
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn verify(&self, key: &str) -> bool {
        let candidate = digest(key);
        self.digests
            .iter()
            .fold(false, |found, stored| found | constant_time_eq(stored, &candidate))
    }

    /// Check the request headers, passing everything through when disabled
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        if !self.enabled {
            return Ok(());
        }

        let key = extract_api_key(headers)?;
        debug!(
            key_prefix = %key.chars().take(4).collect::<String>(),
            "Validating API key"
        );

        if self.verify(&key) {
            Ok(())
        } else {
            Err(ApiError::unauthorized("Invalid API key"))
        }
    }
}

/// Middleware guarding the `/api` routes
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    state.auth.authorize(request.headers())?;
    Ok(next.run(request).await)
}

fn digest(key: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(key.as_bytes()));
    out
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Key from `Authorization: Bearer <key>` or `X-API-Key: <key>`
fn extract_api_key(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid Authorization header encoding"))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    if let Some(api_key_header) = headers.get("x-api-key") {
        let key = api_key_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid X-API-Key header encoding"))?;

        return Ok(key.trim().to_string());
    }

    Err(ApiError::unauthorized(
        "API key required. Provide via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header",
    ))
}
