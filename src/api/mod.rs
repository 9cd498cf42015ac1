//! HTTP 接口层
//!
//! 把流水线的三个操作暴露为 HTTP 路由：
//!
//! - `GET /catalog` - 目录列表（JSON）
//! - `POST /chapter` - 章节 PDF（二进制附件）
//! - `GET /panels?url=` - 分镜拼图（PNG 附件）
//! - `GET /health` - 健康检查
//!
//! 未知路由返回 404 JSON；允许任意来源跨域。

pub mod handlers;
pub mod response;
pub mod server;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::orchestrator::Pipeline;

pub use response::ApiError;
pub use server::{bind_with_fallback, serve};

/// 路由共享状态
pub type AppState = Arc<Pipeline>;

/// 构建完整的路由
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/catalog", get(handlers::catalog))
        .route("/chapter", post(handlers::chapter))
        .route("/panels", get(handlers::panels))
        .fallback(handlers::not_found)
        .layer(cors)
        .with_state(pipeline)
}
