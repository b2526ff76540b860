//! Waitlist API 模块
//!
//! 排队引擎的外部边界：前台 UI、顾客扫码页和外部定时器都只经过
//! 这些路由。

mod handler;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/waitlist", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // 外部调度器触发的清扫入口（内部 Periodic 任务同款逻辑）
        .route("/sweep", post(handler::run_sweep))
        .route("/parties/{party_id}/ready", post(handler::mark_ready))
        .route("/parties/{party_id}/arrived", post(handler::confirm_arrival))
        .route("/parties/{party_id}/no-show", post(handler::mark_no_show))
        .route("/parties/{party_id}/leave", post(handler::leave))
        .route("/parties/{party_id}/reinsert", post(handler::reinsert))
        .route("/{restaurant_id}", get(handler::snapshot))
        .route("/{restaurant_id}/check-in", post(handler::check_in))
        .route("/{restaurant_id}/call-next", post(handler::call_next))
}
