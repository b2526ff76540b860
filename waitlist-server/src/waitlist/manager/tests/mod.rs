use std::sync::{Arc, Mutex};

use super::*;
use crate::waitlist::notify::LogNotifier;
use crate::waitlist::notify::testing::RecordingNotifier;
use crate::waitlist::storage::WaitlistStorage;

mod test_concurrency;
mod test_positions;

const REST: &str = "rest-1";

fn test_policy() -> RestaurantPolicy {
    RestaurantPolicy {
        tolerance_minutes: 10,
        reinsertion_policy: ReinsertionPolicy::Last,
        max_queue_size: None,
    }
}

fn capped_policy(capacity: u32) -> RestaurantPolicy {
    RestaurantPolicy {
        max_queue_size: Some(capacity),
        ..test_policy()
    }
}

fn create_test_manager() -> WaitlistManager {
    let storage = WaitlistStorage::open_in_memory().unwrap();
    WaitlistManager::with_storage(storage, Arc::new(LogNotifier))
}

/// Manager plus a handle on every dispatched notification
fn create_recording_manager() -> (WaitlistManager, Arc<Mutex<Vec<(String, NotifyKind)>>>) {
    let storage = WaitlistStorage::open_in_memory().unwrap();
    let recorder = RecordingNotifier::default();
    let sent = recorder.sent.clone();
    (
        WaitlistManager::with_storage(storage, Arc::new(recorder)),
        sent,
    )
}

async fn check_in(manager: &WaitlistManager, restaurant_id: &str, name: &str) -> Party {
    manager
        .check_in(
            restaurant_id,
            name.to_string(),
            "+34 600 111 222".to_string(),
            2,
            &test_policy(),
        )
        .await
        .unwrap()
}

fn waiting_positions(manager: &WaitlistManager, restaurant_id: &str) -> Vec<(u32, String)> {
    manager.storage().waiting_entries(restaurant_id).unwrap()
}

/// Positions of the waiting set must be exactly 1..=N
fn assert_contiguous(manager: &WaitlistManager, restaurant_id: &str) {
    let entries = waiting_positions(manager, restaurant_id);
    for (i, (pos, party_id)) in entries.iter().enumerate() {
        assert_eq!(
            *pos,
            (i + 1) as u32,
            "gap or duplicate at index {i} (party {party_id})"
        );
        // snapshot agrees with the index
        let party = manager.storage().get_party(party_id).unwrap().unwrap();
        assert_eq!(party.queue_position, Some(*pos));
        assert_eq!(party.status, PartyStatus::Waiting);
    }
}

/// 让 fire-and-forget 的通知任务有机会跑完
async fn drain_spawned_tasks() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
