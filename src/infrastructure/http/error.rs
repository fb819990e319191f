//! HTTP Error Handling
//!
//! 错误响应使用真实的 HTTP 状态码，body 为 `{ "errno": <status>, "error": <message> }`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// 统一错误响应格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errno: u16,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            errno: status.as_u16(),
            error: error.into(),
        }
    }
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
    BadGateway(String),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(errno = status.as_u16(), error = %self.message(), "Request failed");
        } else {
            tracing::warn!(errno = status.as_u16(), error = %self.message(), "Request rejected");
        }

        (status, Json(ErrorResponse::new(status, self.message()))).into_response()
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        match e {
            ApplicationError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            ApplicationError::ValidationError(msg) | ApplicationError::UploadError(msg) => {
                ApiError::BadRequest(msg)
            }
            ApplicationError::Conflict(msg) => ApiError::Conflict(msg),
            ApplicationError::Unavailable(msg) => ApiError::ServiceUnavailable(msg),
            ApplicationError::RepositoryError(msg) | ApplicationError::InternalError(msg) => {
                ApiError::Internal(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_errors_map_to_status_codes() {
        let cases = [
            (ApplicationError::not_found("Book", "x"), StatusCode::NOT_FOUND),
            (ApplicationError::upload("missing file"), StatusCode::BAD_REQUEST),
            (ApplicationError::validation("bad voice"), StatusCode::BAD_REQUEST),
            (ApplicationError::Conflict("taken".into()), StatusCode::CONFLICT),
            (ApplicationError::Unavailable("queue full".into()), StatusCode::SERVICE_UNAVAILABLE),
            (ApplicationError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status(), status);
        }
    }

    #[tokio::test]
    async fn test_error_body_carries_errno() {
        let response = ApiError::NotFound("Book not found: x".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.errno, 404);
        assert_eq!(body.error, "Book not found: x");
    }
}
