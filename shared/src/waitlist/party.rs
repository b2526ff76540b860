//! Party snapshot - the central entity of the waitlist engine

use serde::{Deserialize, Serialize};

use super::types::{PartyStatus, tolerance_deadline};

/// A customer group checked into a restaurant's waitlist.
///
/// Parties are created by check-in, mutated only by the lifecycle state
/// machine, and never physically deleted. Timestamps are Unix milliseconds,
/// always stamped by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Party {
    /// Opaque ID, immutable
    pub id: String,
    /// Owning restaurant, immutable for the party's lifetime
    pub restaurant_id: String,
    pub name: String,
    pub phone: String,
    pub party_size: i32,
    pub status: PartyStatus,
    /// Contiguous 1..=N while WAITING, None once out of the waiting set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
    /// Set at creation, immutable
    pub joined_at: i64,
    /// Set exactly once per call; cleared only by reinsertion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notified_at: Option<i64>,
    /// Restaurant tolerance snapshotted at call time, so later setting
    /// changes never alter an in-flight grace period
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrived_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seated_at: Option<i64>,
    /// Stamp of NO_SHOW / LEFT; cleared by reinsertion (NO_SHOW recovers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_at: Option<i64>,
}

impl Party {
    /// Create a freshly checked-in party (WAITING, no position yet — the
    /// allocator assigns it inside the enqueue transaction).
    pub fn new(
        id: String,
        restaurant_id: String,
        name: String,
        phone: String,
        party_size: i32,
        joined_at: i64,
    ) -> Self {
        Self {
            id,
            restaurant_id,
            name,
            phone,
            party_size,
            status: PartyStatus::Waiting,
            queue_position: None,
            joined_at,
            notified_at: None,
            tolerance_minutes: None,
            arrived_at: None,
            seated_at: None,
            removed_at: None,
        }
    }

    /// Authoritative expiry deadline while called; None unless both
    /// `notified_at` and the tolerance snapshot are present.
    pub fn tolerance_deadline(&self) -> Option<i64> {
        match (self.notified_at, self.tolerance_minutes) {
            (Some(notified_at), Some(minutes)) => Some(tolerance_deadline(notified_at, minutes)),
            _ => None,
        }
    }
}
