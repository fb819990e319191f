//! HTTP Layer - RESTful API
//!
//! 生成服务的对外接口，路由见 routes.rs

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_routes;
pub use server::{build_router, with_common_layers, HttpServer, ServerConfig};
pub use state::{AppState, UploadSettings};
