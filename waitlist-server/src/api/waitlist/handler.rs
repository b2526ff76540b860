//! Waitlist API Handlers
//!
//! Thin glue over [`QueueService`]; no queue logic lives here.

use axum::{
    Json,
    extract::{Path, State},
};

use shared::waitlist::{
    CheckInRequest, CheckInResponse, NoShowTrigger, Party, QueueSnapshot, ReinsertRequest,
    SweepReport,
};

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// POST /api/waitlist/:restaurant_id/check-in - 顾客/前台登记排队
pub async fn check_in(
    State(state): State<ServerState>,
    Path(restaurant_id): Path<String>,
    Json(payload): Json<CheckInRequest>,
) -> AppResult<Json<CheckInResponse>> {
    let party = state.queue.check_in(&restaurant_id, payload).await?;
    let queue_position = party
        .queue_position
        .ok_or_else(|| AppError::internal("checked-in party without position"))?;
    Ok(Json(CheckInResponse {
        party_id: party.id,
        queue_position,
    }))
}

/// POST /api/waitlist/:restaurant_id/call-next - 叫下一位
pub async fn call_next(
    State(state): State<ServerState>,
    Path(restaurant_id): Path<String>,
) -> AppResult<Json<Party>> {
    let party = state.queue.call_next(&restaurant_id).await?;
    Ok(Json(party))
}

/// POST /api/waitlist/parties/:party_id/ready - 桌已备好
pub async fn mark_ready(
    State(state): State<ServerState>,
    Path(party_id): Path<String>,
) -> AppResult<Json<Party>> {
    let party = state.queue.mark_ready(&party_id).await?;
    Ok(Json(party))
}

/// POST /api/waitlist/parties/:party_id/arrived - 确认到场
pub async fn confirm_arrival(
    State(state): State<ServerState>,
    Path(party_id): Path<String>,
) -> AppResult<Json<Party>> {
    let party = state.queue.confirm_arrival(&party_id).await?;
    Ok(Json(party))
}

/// POST /api/waitlist/parties/:party_id/no-show - 人工标记未到场
pub async fn mark_no_show(
    State(state): State<ServerState>,
    Path(party_id): Path<String>,
) -> AppResult<Json<Party>> {
    let party = state
        .queue
        .mark_no_show(&party_id, NoShowTrigger::Staff)
        .await?;
    Ok(Json(party))
}

/// POST /api/waitlist/parties/:party_id/leave - 顾客主动离开
pub async fn leave(
    State(state): State<ServerState>,
    Path(party_id): Path<String>,
) -> AppResult<Json<Party>> {
    let party = state.queue.leave(&party_id).await?;
    Ok(Json(party))
}

/// POST /api/waitlist/parties/:party_id/reinsert - 未到场重新入队
pub async fn reinsert(
    State(state): State<ServerState>,
    Path(party_id): Path<String>,
    Json(payload): Json<ReinsertRequest>,
) -> AppResult<Json<Party>> {
    let party = state.queue.reinsert(&party_id, payload.policy).await?;
    Ok(Json(party))
}

/// GET /api/waitlist/:restaurant_id - 一致性队列快照
pub async fn snapshot(
    State(state): State<ServerState>,
    Path(restaurant_id): Path<String>,
) -> AppResult<Json<QueueSnapshot>> {
    let snapshot = state.queue.queue_snapshot(&restaurant_id).await?;
    Ok(Json(snapshot))
}

/// POST /api/waitlist/sweep - 触发一轮容忍窗口清扫
///
/// 与内部定时任务以及并发调用幂等；单个 party 的失败收敛在
/// 返回的报告里。
pub async fn run_sweep(State(state): State<ServerState>) -> AppResult<Json<SweepReport>> {
    let report = state.queue.run_sweep().await?;
    Ok(Json(report))
}
