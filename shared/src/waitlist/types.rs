//! Shared enums and constants for the waitlist lifecycle

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// 宽容窗口之外的固定缓冲（毫秒），吸收客户端/服务器时钟偏差
pub const GRACE_PADDING_MS: i64 = 30_000;

/// Minimum accepted party size
pub const MIN_PARTY_SIZE: i32 = 1;

/// Maximum accepted party size
pub const MAX_PARTY_SIZE: i32 = 20;

/// Authoritative tolerance deadline for a called party.
///
/// `notified_at + tolerance_minutes + GRACE_PADDING_MS`. Clients must
/// recompute countdowns from this value rather than decrementing a local
/// timer.
pub fn tolerance_deadline(notified_at: i64, tolerance_minutes: u32) -> i64 {
    notified_at + (tolerance_minutes as i64) * 60_000 + GRACE_PADDING_MS
}

// ============================================================================
// Party Status
// ============================================================================

/// 排队方状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyStatus {
    /// In the queue, holds a contiguous position
    #[default]
    Waiting,
    /// Called: "you are next" — tolerance countdown running
    Next,
    /// Called: "your table is ready" — same countdown, promoted display state
    Ready,
    /// Arrived and seated (terminal)
    Seated,
    /// Tolerance window expired or staff removal; recoverable via reinsert
    NoShow,
    /// Left the queue voluntarily (terminal)
    Left,
}

impl PartyStatus {
    /// Called states carry a non-null `notified_at` and are swept on expiry
    pub fn is_called(&self) -> bool {
        matches!(self, PartyStatus::Next | PartyStatus::Ready)
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, PartyStatus::Seated | PartyStatus::Left)
    }
}

impl std::fmt::Display for PartyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartyStatus::Waiting => write!(f, "WAITING"),
            PartyStatus::Next => write!(f, "NEXT"),
            PartyStatus::Ready => write!(f, "READY"),
            PartyStatus::Seated => write!(f, "SEATED"),
            PartyStatus::NoShow => write!(f, "NO_SHOW"),
            PartyStatus::Left => write!(f, "LEFT"),
        }
    }
}

// ============================================================================
// Reinsertion Policy
// ============================================================================

/// 未到场恢复策略 — 重新入队时的落点
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReinsertionPolicy {
    /// Rejoin at the tail (`currentMax + 1`)
    #[default]
    Last,
    /// Rejoin at position 1, pushing everyone else back
    First,
}

impl std::fmt::Display for ReinsertionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReinsertionPolicy::Last => write!(f, "LAST"),
            ReinsertionPolicy::First => write!(f, "FIRST"),
        }
    }
}

// ============================================================================
// Notification Kind
// ============================================================================

/// Outbound notification kinds the engine emits through the injected
/// notifier capability. Transport (SMS/WhatsApp/push) is out of scope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotifyKind {
    /// Party was called — tolerance countdown started
    Called,
    /// Table is ready now
    TableReady,
    /// Party was removed after the tolerance window expired
    NoShow,
}

impl std::fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyKind::Called => write!(f, "CALLED"),
            NotifyKind::TableReady => write!(f, "TABLE_READY"),
            NotifyKind::NoShow => write!(f, "NO_SHOW"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_includes_grace_padding() {
        // 2 min tolerance called at T: deadline = T + 120s + 30s
        let t = 1_700_000_000_000;
        assert_eq!(tolerance_deadline(t, 2), t + 150_000);
    }

    #[test]
    fn test_called_and_terminal_classification() {
        assert!(PartyStatus::Next.is_called());
        assert!(PartyStatus::Ready.is_called());
        assert!(!PartyStatus::Waiting.is_called());
        assert!(!PartyStatus::NoShow.is_called());

        assert!(PartyStatus::Seated.is_terminal());
        assert!(PartyStatus::Left.is_terminal());
        // NO_SHOW 可通过重新入队恢复，不是终态
        assert!(!PartyStatus::NoShow.is_terminal());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&PartyStatus::NoShow).unwrap();
        assert_eq!(json, "\"NO_SHOW\"");
        let back: PartyStatus = serde_json::from_str("\"READY\"").unwrap();
        assert_eq!(back, PartyStatus::Ready);
    }
}
