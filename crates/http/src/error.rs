//! Error handling for the SHELF HTTP layer

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Body of every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable description of what went wrong
    pub message: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    /// The client sent something that cannot be accepted as given.
    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("timed out: {message}")]
    Timeout { message: String },

    /// Anything that went wrong on our side of the request.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Undecodable bodies are the client's fault whatever axum thinks the
/// status should be, so they all become 400 with the decoder's message.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// An id segment that cannot even be decoded is treated like any other
/// malformed id: a server-side failure to resolve it.
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Internal(anyhow::anyhow!(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::now_v7();
        let status = self.status();

        let message = match self {
            AppError::BadRequest { message }
            | AppError::NotFound { message }
            | AppError::Timeout { message } => message,
            AppError::Internal(e) => e.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                detail = %message,
                "request failed"
            );
        } else {
            tracing::warn!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                detail = %message,
                "request rejected"
            );
        }

        (status, Json(ErrorBody { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_constructors() {
        match AppError::bad_request("name must be a string") {
            AppError::BadRequest { message } => assert_eq!(message, "name must be a string"),
            other => panic!("Expected BadRequest error, got {other:?}"),
        }
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_not_found_body_is_message_only() {
        let response = AppError::not_found("Book not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "message": "Book not found" })
        );
    }

    #[tokio::test]
    async fn test_internal_error_keeps_underlying_message() {
        let error = AppError::Internal(anyhow::anyhow!("connection reset by peer"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["message"],
            "connection reset by peer"
        );
    }

    #[tokio::test]
    async fn test_timeout_mapping() {
        let response = AppError::timeout("request timed out").into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "message": "request timed out" })
        );
    }

    #[tokio::test]
    async fn test_bad_request_mapping() {
        let response = AppError::bad_request("expected a JSON object").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "expected a JSON object");
    }
}
