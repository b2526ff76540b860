//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`AppError`] - 应用错误类型 (HTTP 边界)
//! - [`AppResult`] - handler 层 Result 别名
//! - 日志、时间、输入校验等工具

pub mod error;
pub mod logger;
pub mod time;
pub mod validation;

pub use error::{AppError, AppResult};
pub use logger::{init_logger, init_logger_with_file};
