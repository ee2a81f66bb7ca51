//! JSON error responses

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::infrastructure::download::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    AuthenticationError,
    PermissionError,
    NotFoundError,
    ConflictError,
    RangeError,
    UpstreamError,
    ServerError,
}

impl std::fmt::Display for ApiErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequestError => write!(f, "invalid_request_error"),
            Self::AuthenticationError => write!(f, "authentication_error"),
            Self::PermissionError => write!(f, "permission_error"),
            Self::NotFoundError => write!(f, "not_found_error"),
            Self::ConflictError => write!(f, "conflict_error"),
            Self::RangeError => write!(f, "range_error"),
            Self::UpstreamError => write!(f, "upstream_error"),
            Self::ServerError => write!(f, "server_error"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Error returned by handlers, rendered as `{"error": {...}}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
    /// Value for `Content-Range` on 416 responses
    content_range: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                error: ApiErrorDetail {
                    message: message.into(),
                    error_type,
                    param: None,
                    code: None,
                },
            },
            content_range: None,
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.response.error.param = Some(param.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.response.error.code = Some(code.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiErrorType::InvalidRequestError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ApiErrorType::AuthenticationError, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ApiErrorType::PermissionError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiErrorType::NotFoundError, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, ApiErrorType::ConflictError, message)
    }

    /// 416 carrying `Content-Range: bytes */{size}`
    pub fn range_not_satisfiable(size: u64) -> Self {
        let mut err = Self::new(
            StatusCode::RANGE_NOT_SATISFIABLE,
            ApiErrorType::RangeError,
            format!("Requested range not satisfiable for {} bytes", size),
        );
        err.content_range = Some(format!("bytes */{}", size));
        err
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, ApiErrorType::UpstreamError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ApiErrorType::ServerError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.response)).into_response();

        if let Some(value) = self
            .content_range
            .and_then(|v| HeaderValue::from_str(&v).ok())
        {
            response.headers_mut().insert(header::CONTENT_RANGE, value);
        }

        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { message } => Self::not_found(message),
            DomainError::Validation { message } => Self::bad_request(message),
            DomainError::InvalidId { message } => Self::bad_request(message).with_param("id"),
            DomainError::Reference { message } => {
                Self::bad_request(message).with_code("invalid_reference")
            }
            DomainError::Conflict { message } => Self::conflict(message),
            DomainError::Notification { channel, message } => {
                Self::bad_gateway(format!("{}: {}", channel, message))
            }
            DomainError::Configuration { message }
            | DomainError::Internal { message }
            | DomainError::Storage { message } => Self::internal(message),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => Self::unauthorized(err.to_string()),
            TokenError::Expired | TokenError::InvalidSignature => {
                Self::forbidden(err.to_string())
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.response.error.error_type, self.response.error.message
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_statuses() {
        let cases = [
            (DomainError::not_found("x"), StatusCode::NOT_FOUND),
            (DomainError::validation("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_id("x"), StatusCode::BAD_REQUEST),
            (DomainError::reference("x"), StatusCode::BAD_REQUEST),
            (DomainError::conflict("x"), StatusCode::CONFLICT),
            (DomainError::storage("x"), StatusCode::INTERNAL_SERVER_ERROR),
            (DomainError::configuration("x"), StatusCode::INTERNAL_SERVER_ERROR),
            (DomainError::notification("webhook", "x"), StatusCode::BAD_GATEWAY),
        ];

        for (domain, status) in cases {
            assert_eq!(ApiError::from(domain).status, status);
        }
    }

    #[test]
    fn test_invalid_id_names_param() {
        let err = ApiError::from(DomainError::invalid_id("'abc' is not a valid cuy id"));
        assert_eq!(err.response.error.param.as_deref(), Some("id"));
    }

    #[test]
    fn test_token_errors() {
        assert_eq!(ApiError::from(TokenError::Malformed).status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(TokenError::Expired).status, StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(TokenError::InvalidSignature).status,
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_range_error_sets_content_range() {
        let response = ApiError::range_not_satisfiable(1024).into_response();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1024");
    }

    #[test]
    fn test_error_serialization() {
        let err = ApiError::conflict("Cuy code 'CU-001' already exists");
        let json = serde_json::to_string(&err.response).unwrap();

        assert!(json.contains("\"type\":\"conflict_error\""));
        assert!(!json.contains("param"));
    }
}
