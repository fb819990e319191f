//! Ping Handler

use axum::Json;
use serde::{Deserialize, Serialize};

/// Ping 响应
#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
    pub version: String,
}

/// Ping endpoint - 健康检查
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "pong".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
