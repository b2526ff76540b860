//! 统一错误处理
//!
//! 提供应用级错误类型：HTTP 边界上所有 handler 返回 [`AppError`]，
//! 引擎层错误 (`WaitlistError`) 在 `waitlist::error` 中归类后转换到这里。
//!
//! # 错误码规范
//!
//! | 错误码 | 分类 | HTTP |
//! |--------|------|------|
//! | E0002 | 验证失败 | 400 |
//! | E0003 | 资源不存在 | 404 |
//! | E0004 | 资源冲突 | 409 |
//! | E0005 | 业务规则违反 | 422 |
//! | E0006 | 队列已满 | 409 |
//! | E0007 | 状态迁移冲突 | 409 |
//! | E9002 | 数据库错误 | 500 |
//! | E9001 | 内部错误 | 500 |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 业务逻辑错误 (4xx) ==========
    #[error("Resource not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("Resource conflict: {0}")]
    /// 资源冲突 (409)
    Conflict(String),

    #[error("Validation failed: {0}")]
    /// 验证失败 (400)
    Validation(String),

    #[error("Business rule violation: {0}")]
    /// 业务规则违反 (422)
    BusinessRule(String),

    #[error("Queue is full: {0}")]
    /// 队列容量已满 (409)
    QueueFull(String),

    #[error("Invalid transition: {0}")]
    /// 并发冲突：状态已被他人处理 (409)
    InvalidTransition(String),

    // ========== 系统错误 (5xx) ==========
    #[error("Database error: {0}")]
    /// 数据库错误 (500)
    Database(String),

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        AppError::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

/// 错误响应体
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "E0004", msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg),
            AppError::BusinessRule(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "E0005", msg),
            AppError::QueueFull(msg) => (StatusCode::CONFLICT, "E0006", msg),
            AppError::InvalidTransition(msg) => (StatusCode::CONFLICT, "E0007", msg),
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9002",
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}

/// Application-level Result type, used in HTTP handlers
pub type AppResult<T> = Result<T, AppError>;
