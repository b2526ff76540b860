//! 健康检查路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 健康检查 + 队列统计 | 无 |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::waitlist::StorageStats;

/// 健康检查路由 - 公共路由
pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

/// 健康检查响应
#[derive(Serialize)]
pub struct HealthResponse {
    /// 状态 (ok | degraded)
    status: &'static str,
    /// 版本号
    version: &'static str,
    /// 实例 epoch（客户端用来检测重启）
    epoch: String,
    /// 引擎存储统计
    #[serde(skip_serializing_if = "Option::is_none")]
    queue: Option<StorageStats>,
    /// 通知派发失败计数
    notify_failures: u64,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let manager = state.queue.manager();
    let queue = match manager.storage().get_stats() {
        Ok(stats) => Some(stats),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed to read storage stats");
            None
        }
    };
    let status = if queue.is_some() { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        epoch: manager.epoch().to_string(),
        queue,
        notify_failures: manager.notify_failures(),
    })
}
