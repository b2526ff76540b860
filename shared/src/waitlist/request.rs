//! Request/response payloads for the waitlist API

use serde::{Deserialize, Serialize};

use super::party::Party;
use super::types::ReinsertionPolicy;

/// Check-in payload (customer or staff-manual entry)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub name: String,
    pub phone: String,
    pub party_size: i32,
}

/// Check-in result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInResponse {
    pub party_id: String,
    pub queue_position: u32,
}

/// Reinsert payload; policy None falls back to the restaurant setting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReinsertRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<ReinsertionPolicy>,
}

/// A called party plus its authoritative countdown data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalledParty {
    pub party: Party,
    /// `notified_at + tolerance + grace padding` (Unix millis)
    pub deadline: i64,
    /// Convenience: deadline - server now, clamped at 0
    pub remaining_ms: i64,
}

/// Consistent per-restaurant queue view.
///
/// Waiting parties ordered by position ascending, then any called party.
/// Read inside the restaurant's critical section, so no party appears
/// twice or goes missing mid-compaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub restaurant_id: String,
    /// Server instance epoch - clients detect restarts and resync
    pub epoch: String,
    /// Global event sequence at read time
    pub sequence: u64,
    pub waiting: Vec<Party>,
    pub called: Vec<CalledParty>,
}

/// Per-party failure inside a sweep pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepError {
    pub party_id: String,
    pub error: String,
}

/// Result of one tolerance sweep pass.
///
/// One party's failure never aborts the batch; errors are collected here
/// and the sweep continues with the remaining candidates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    /// Called parties examined
    pub scanned: usize,
    /// Parties forced to NO_SHOW this pass
    pub expired: usize,
    /// Deadline not reached, or lost the race to a concurrent transition
    pub skipped: usize,
    pub errors: Vec<SweepError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reinsert_request_policy_optional() {
        let req: ReinsertRequest = serde_json::from_str("{}").unwrap();
        assert!(req.policy.is_none());
        let req: ReinsertRequest = serde_json::from_str(r#"{"policy":"FIRST"}"#).unwrap();
        assert_eq!(req.policy, Some(ReinsertionPolicy::First));
    }

    #[test]
    fn test_sweep_report_default_is_empty() {
        let report = SweepReport::default();
        assert_eq!(report.scanned, 0);
        assert_eq!(report.expired, 0);
        assert!(report.errors.is_empty());
    }
}
