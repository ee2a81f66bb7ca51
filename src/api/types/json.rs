//! JSON extractor whose rejections use the API error body

use axum::{
    extract::{rejection::JsonRejection as AxumRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json as AxumJson,
};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// Drop-in for `axum::Json`; malformed bodies become `{"error": {...}}`
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match AxumJson::<T>::from_request(req, state).await {
            Ok(AxumJson(value)) => Ok(Json(value)),
            Err(rejection) => {
                let status = rejection.status();
                let mut err = ApiError::bad_request(rejection_message(&rejection))
                    .with_code("json_parse_error");
                err.status = status;
                Err(err)
            }
        }
    }
}

fn rejection_message(rejection: &AxumRejection) -> String {
    match rejection {
        AxumRejection::JsonDataError(err) => format!("Invalid JSON data: {}", err.body_text()),
        AxumRejection::JsonSyntaxError(err) => {
            format!("Invalid JSON syntax: {}", err.body_text())
        }
        AxumRejection::MissingJsonContentType(_) => {
            "Missing Content-Type header. Expected 'application/json'.".to_string()
        }
        AxumRejection::BytesRejection(err) => {
            format!("Failed to read request body: {}", err.body_text())
        }
        _ => "Invalid JSON request".to_string(),
    }
}

impl<T> IntoResponse for Json<T>
where
    T: serde::Serialize,
{
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct WeighIn {
        weight_kg: f64,
    }

    fn request(content_type: Option<&str>, body: &str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_valid_body() {
        let Json(body) = Json::<WeighIn>::from_request(
            request(Some("application/json"), r#"{"weight_kg": 1.2}"#),
            &(),
        )
        .await
        .unwrap();

        assert_eq!(body.weight_kg, 1.2);
    }

    #[tokio::test]
    async fn test_wrong_type_is_json_error() {
        let err = Json::<WeighIn>::from_request(
            request(Some("application/json"), r#"{"weight_kg": "heavy"}"#),
            &(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.response.error.code.as_deref(), Some("json_parse_error"));
        assert!(err.response.error.message.starts_with("Invalid JSON data"));
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let err = Json::<WeighIn>::from_request(request(None, "{}"), &())
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
