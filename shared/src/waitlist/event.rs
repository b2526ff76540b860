//! Queue events - immutable facts emitted after each committed transition
//!
//! The engine broadcasts one event per state change; a realtime fan-out
//! layer (outside this workspace) pushes them to connected clients.

use serde::{Deserialize, Serialize};

use super::types::ReinsertionPolicy;

/// Queue change-feed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number - the authoritative ordering for replay
    pub sequence: u64,
    pub restaurant_id: String,
    pub party_id: String,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
    pub event_type: QueueEventType,
    pub payload: EventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueEventType {
    PartyCheckedIn,
    PartyCalled,
    PartyReady,
    PartySeated,
    PartyNoShow,
    PartyLeft,
    PartyReinserted,
}

impl std::fmt::Display for QueueEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueEventType::PartyCheckedIn => write!(f, "PARTY_CHECKED_IN"),
            QueueEventType::PartyCalled => write!(f, "PARTY_CALLED"),
            QueueEventType::PartyReady => write!(f, "PARTY_READY"),
            QueueEventType::PartySeated => write!(f, "PARTY_SEATED"),
            QueueEventType::PartyNoShow => write!(f, "PARTY_NO_SHOW"),
            QueueEventType::PartyLeft => write!(f, "PARTY_LEFT"),
            QueueEventType::PartyReinserted => write!(f, "PARTY_REINSERTED"),
        }
    }
}

/// 未到场触发来源 — 人工操作或清扫器
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoShowTrigger {
    Staff,
    Sweep,
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    PartyCheckedIn {
        name: String,
        party_size: i32,
        queue_position: u32,
    },
    PartyCalled {
        notified_at: i64,
        tolerance_minutes: u32,
        /// Authoritative expiry deadline (clients recompute countdowns from this)
        deadline: i64,
    },
    PartyReady {
        /// Original call stamp — the countdown does NOT restart on promotion
        notified_at: i64,
        deadline: i64,
    },
    PartySeated {
        seated_at: i64,
        /// Total time from check-in to seating, for raw analytics emission
        waited_ms: i64,
    },
    PartyNoShow {
        removed_at: i64,
        trigger: NoShowTrigger,
    },
    PartyLeft {
        removed_at: i64,
    },
    PartyReinserted {
        queue_position: u32,
        policy: ReinsertionPolicy,
    },
}

impl QueueEvent {
    pub fn new(
        sequence: u64,
        restaurant_id: String,
        party_id: String,
        timestamp: i64,
        event_type: QueueEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: crate::util::new_id(),
            sequence,
            restaurant_id,
            party_id,
            timestamp,
            event_type,
            payload,
        }
    }
}
