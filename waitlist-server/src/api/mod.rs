//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`restaurants`] - 餐厅注册表和设置接口
//! - [`waitlist`] - 排队引擎操作接口
//!
//! Handler 层只做参数提取和错误映射，业务全部在 `QueueService` 里；
//! 认证/授权属于外层网关，不在本服务建模。

pub mod health;
pub mod restaurants;
pub mod waitlist;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResult};

/// Compose the full application router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(restaurants::router())
        .merge(waitlist::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
