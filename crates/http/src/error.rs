//! Error handling for the shelf HTTP layer

use axum::{
    extract::{rejection::JsonRejection, Request},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Standard error response format for all HTTP errors
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub details: Vec<serde_json::Value>,
    pub message: String,
    pub code: String,
    pub trace_id: String,
    pub timestamp: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Underlying cause of an internal error, stashed in the response extensions.
///
/// Only [`expose_error_details`] reads it; without that layer callers see the
/// generic message.
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    body: ErrorBody,
    cause: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("conflict: {message}")]
    Conflict {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String, code: String },

    /// The outermost context is the public message; the full chain is the detail.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Validation {
            details,
            code: "validation_error".to_string(),
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Conflict {
            details,
            code: "conflict".to_string(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            code: "unauthorized".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation(vec![], rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::now_v7();
        let timestamp = OffsetDateTime::now_utc().to_string();
        let status = self.status();

        let (error_code, message, details, cause) = match self {
            AppError::Validation {
                details,
                code,
                message,
            } => (code, message, details, None),
            AppError::Conflict {
                details,
                code,
                message,
            } => (code, message, details, None),
            AppError::NotFound { message, code } => (code, message, vec![], None),
            AppError::Unauthorized { message, code } => (code, message, vec![], None),
            AppError::Internal(e) => (
                "internal_error".to_string(),
                e.to_string(),
                vec![],
                Some(format!("{e:#}")),
            ),
        };

        if let Some(cause) = &cause {
            tracing::error!(
                error_id = %error_id,
                error_code = %error_code,
                status_code = %status.as_u16(),
                cause = %cause,
                "request failed"
            );
        } else {
            tracing::info!(
                error_id = %error_id,
                error_code = %error_code,
                status_code = %status.as_u16(),
                "request rejected"
            );
        }

        let body = ErrorBody {
            details,
            message,
            code: error_code,
            trace_id: error_id.to_string(),
            timestamp,
        };

        let mut response = (
            status,
            Json(ErrorEnvelope {
                error: body.clone(),
            }),
        )
            .into_response();

        if let Some(cause) = cause {
            response
                .extensions_mut()
                .insert(ErrorDetail { body, cause });
        }

        response
    }
}

/// Response layer that replaces generic internal error messages with their
/// full cause chain. Mounted only outside production.
pub async fn expose_error_details(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let Some(detail) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };

    let mut error = detail.body;
    error.message = detail.cause;

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let body = Json(ErrorEnvelope { error }).into_response().into_body();
    Response::from_parts(parts, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn failing_handler() -> Result<&'static str, AppError> {
        let cause = anyhow::anyhow!("connection refused");
        Err(AppError::Internal(cause.context("error fetching books")))
    }

    #[test]
    fn test_validation_error() {
        let details = vec![serde_json::json!({"field": "title", "error": "required"})];
        let error = AppError::validation(details.clone(), "Title is required");

        match error {
            AppError::Validation {
                details: d,
                code,
                message,
            } => {
                assert_eq!(d, details);
                assert_eq!(code, "validation_error");
                assert_eq!(message, "Title is required");
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::validation(vec![], "x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::conflict(vec![], "x").into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::not_found("x").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::unauthorized("x").into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_response_format() {
        let response = AppError::not_found("Book not found or access denied").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "Book not found or access denied");
        assert!(body["error"]["details"].as_array().unwrap().is_empty());
        assert!(Uuid::parse_str(body["error"]["trace_id"].as_str().unwrap()).is_ok());
        assert!(body["error"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause_by_default() {
        let app = Router::new().route("/", get(failing_handler));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "error fetching books");
    }

    #[tokio::test]
    async fn test_detail_layer_exposes_cause() {
        let app = Router::new()
            .route("/", get(failing_handler))
            .layer(middleware::from_fn(expose_error_details));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(
            body["error"]["message"],
            "error fetching books: connection refused"
        );
        assert_eq!(body["error"]["code"], "internal_error");
    }

    #[tokio::test]
    async fn test_detail_layer_keeps_response_headers() {
        let app = Router::new()
            .route(
                "/",
                get(|| async {
                    (
                        [("retry-after", "5")],
                        AppError::Internal(anyhow::anyhow!("pool exhausted")),
                    )
                }),
            )
            .layer(middleware::from_fn(expose_error_details));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["retry-after"], "5");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "pool exhausted");
    }

    #[tokio::test]
    async fn test_detail_layer_leaves_client_errors_alone() {
        let app = Router::new()
            .route(
                "/",
                get(|| async { Err::<&'static str, _>(AppError::unauthorized("Token is not valid")) }),
            )
            .layer(middleware::from_fn(expose_error_details));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Token is not valid");
    }
}
