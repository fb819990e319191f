//! Gateway Error - 代理错误与响应映射
//!
//! 上游返回的非 2xx 响应原样透传状态码与 body；网络失败统一为 502，等待响应头超时为 504

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::infrastructure::http::ErrorResponse;

/// 代理错误
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 未配置上游地址，不发起任何网络请求
    #[error("Generation service is not configured")]
    NotConfigured,

    /// 上游返回非 2xx
    #[error("Upstream responded with {status}")]
    Upstream {
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Bytes,
    },

    /// 连接失败等没有上游状态码的错误
    #[error("Upstream request failed: {0}")]
    Network(String),

    /// 超时内未收到上游响应头
    #[error("Upstream did not respond within {0:?}")]
    Timeout(std::time::Duration),

    #[error("{0}")]
    BadRequest(String),

    #[error("Gateway I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Upstream { status, .. } => *status,
            GatewayError::Network(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => GatewayError::Upstream {
                status,
                content_type: None,
                body: Bytes::from(err.to_string()),
            },
            None => GatewayError::Network(err.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            GatewayError::Upstream {
                status,
                content_type,
                body,
            } => {
                tracing::warn!(status = status.as_u16(), body_len = body.len(), "Relaying upstream error");
                let mut response = Response::new(Body::from(body));
                *response.status_mut() = status;
                if let Some(content_type) = content_type {
                    response.headers_mut().insert(header::CONTENT_TYPE, content_type);
                }
                response
            }
            other => {
                if status.is_server_error() {
                    tracing::error!(status = status.as_u16(), error = %other, "Gateway error");
                } else {
                    tracing::warn!(status = status.as_u16(), error = %other, "Gateway error");
                }
                (status, Json(ErrorResponse::new(status, other.to_string()))).into_response()
            }
        }
    }
}
