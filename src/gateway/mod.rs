//! Chapter Gateway - 章节流式代理
//!
//! 宿主应用通过 Gateway 访问生成服务，两者不共享存储：
//! - 上传文件先暂存到本地，再流式写入上游 multipart 请求
//! - 章节音频等下载按流转发，保留上游状态码与头部（逐跳头部除外）
//! - 上游地址通过 `GatewayConfig` 显式传入，未配置时所有代理请求返回 503

mod client;
mod error;
mod routes;

pub use client::{UploadFile, UpstreamClient};
pub use error::GatewayError;
pub use routes::{build_router, create_routes, GatewayState};
