//! Engine error taxonomy
//!
//! 分类对应处理策略：验证错误可由调用方修正；冲突错误在并发下是
//! 预期结果（"别人已经处理了"）；容量错误直接面向顾客；存储错误
//! 是系统问题。引擎内没有任何错误会导致进程退出。

use thiserror::Error;

use shared::waitlist::PartyStatus;

use super::storage::StorageError;
use crate::db::repository::RepoError;
use crate::utils::AppError;

/// Waitlist engine errors
#[derive(Debug, Error)]
pub enum WaitlistError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Registry error: {0}")]
    Registry(#[from] RepoError),

    #[error("Party not found: {0}")]
    PartyNotFound(String),

    #[error("Restaurant not found: {0}")]
    RestaurantNotFound(String),

    #[error("Queue is full for restaurant {restaurant_id} (capacity {capacity})")]
    QueueFull {
        restaurant_id: String,
        capacity: u32,
    },

    #[error("No waiting party in restaurant {0}")]
    EmptyQueue(String),

    /// 并发下的预期冲突：第二个操作观察到已迁移的状态。
    /// 调用方应当视为"已被处理"，不做重试。
    #[error("Party {party_id} is {status}, {event} not allowed")]
    InvalidTransition {
        party_id: String,
        status: PartyStatus,
        event: &'static str,
    },

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type WaitlistResult<T> = Result<T, WaitlistError>;

impl From<WaitlistError> for AppError {
    fn from(err: WaitlistError) -> Self {
        match err {
            WaitlistError::Storage(e) => AppError::database(e.to_string()),
            WaitlistError::Registry(e) => match e {
                RepoError::NotFound(msg) => AppError::NotFound(msg),
                RepoError::Duplicate(msg) => AppError::Conflict(msg),
                RepoError::Validation(msg) => AppError::Validation(msg),
                RepoError::Database(msg) => AppError::Database(msg),
            },
            WaitlistError::PartyNotFound(id) => {
                AppError::not_found(format!("Party not found: {id}"))
            }
            WaitlistError::RestaurantNotFound(id) => {
                AppError::not_found(format!("Restaurant not found: {id}"))
            }
            WaitlistError::QueueFull {
                restaurant_id,
                capacity,
            } => AppError::QueueFull(format!(
                "Queue for restaurant {restaurant_id} is at capacity ({capacity})"
            )),
            WaitlistError::EmptyQueue(id) => {
                AppError::not_found(format!("No waiting party in restaurant {id}"))
            }
            err @ WaitlistError::InvalidTransition { .. } => {
                AppError::InvalidTransition(err.to_string())
            }
            WaitlistError::Validation(msg) => AppError::Validation(msg),
        }
    }
}

impl WaitlistError {
    /// 冲突类错误在并发场景下不算失败
    pub fn is_benign_conflict(&self) -> bool {
        matches!(self, WaitlistError::InvalidTransition { .. })
    }
}
