//! 时间工具函数
//!
//! 截止时间一律以服务器端 `notified_at + tolerance` 推导；
//! 客户端倒计时只做展示，不参与判定。

/// 剩余毫秒数（已过期返回 0）
pub fn remaining_ms(deadline: i64, now: i64) -> i64 {
    (deadline - now).max(0)
}

/// 截止时间是否已到
pub fn is_expired(deadline: i64, now: i64) -> bool {
    now >= deadline
}
