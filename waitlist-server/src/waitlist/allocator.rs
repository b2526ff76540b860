//! Position Allocator
//!
//! Assigns and renumbers `queue_position` so that the waiting set of every
//! restaurant is exactly `{1..N}` — no gaps, no duplicates. All functions
//! operate inside the caller's write transaction; the caller is also
//! responsible for holding the restaurant's critical section, which makes
//! ties impossible (FIFO by enqueue order).
//!
//! 压缩采用"先收集后改写"：在同一个事务里一次性读出受影响的槽位，
//! 再逐个挪动并同步 party 快照，避免迭代途中覆盖尚未搬走的键。

use redb::WriteTransaction;

use shared::waitlist::Party;

use super::storage::{StorageError, StorageResult, WaitlistStorage};

/// Append a party at the tail (`current max + 1`).
///
/// Writes both the waiting slot and the party snapshot; returns the
/// assigned position.
pub fn enqueue(
    storage: &WaitlistStorage,
    txn: &WriteTransaction,
    party: &mut Party,
) -> StorageResult<u32> {
    let position = storage.max_waiting_position_txn(txn, &party.restaurant_id)? + 1;
    party.queue_position = Some(position);
    storage.insert_waiting(txn, &party.restaurant_id, position, &party.id)?;
    storage.store_party(txn, party)?;
    Ok(position)
}

/// Remove the slot at `position` and compact everything behind it by one.
///
/// Each shifted party's snapshot is rewritten in the same transaction so
/// the index and the records never diverge.
pub fn dequeue(
    storage: &WaitlistStorage,
    txn: &WriteTransaction,
    restaurant_id: &str,
    position: u32,
) -> StorageResult<()> {
    storage.remove_waiting(txn, restaurant_id, position)?;

    // 升序搬移：pos-1 槽位刚刚腾空，不会覆盖
    let tail = storage.waiting_entries_from_txn(txn, restaurant_id, position + 1)?;
    for (pos, party_id) in tail {
        storage.remove_waiting(txn, restaurant_id, pos)?;
        storage.insert_waiting(txn, restaurant_id, pos - 1, &party_id)?;

        let mut party = storage.get_party_txn(txn, &party_id)?.ok_or_else(|| {
            StorageError::Inconsistent(format!(
                "waiting slot {pos} of restaurant {restaurant_id} points to missing party {party_id}"
            ))
        })?;
        party.queue_position = Some(pos - 1);
        storage.store_party(txn, &party)?;
    }
    Ok(())
}

/// Re-add a party at position 1, pushing everyone else back by one.
pub fn reinsert_first(
    storage: &WaitlistStorage,
    txn: &WriteTransaction,
    party: &mut Party,
) -> StorageResult<u32> {
    // 降序搬移：最高位先挪进空槽
    let entries = storage.waiting_entries_txn(txn, &party.restaurant_id)?;
    for (pos, party_id) in entries.into_iter().rev() {
        storage.remove_waiting(txn, &party.restaurant_id, pos)?;
        storage.insert_waiting(txn, &party.restaurant_id, pos + 1, &party_id)?;

        let mut shifted = storage.get_party_txn(txn, &party_id)?.ok_or_else(|| {
            StorageError::Inconsistent(format!(
                "waiting slot {pos} of restaurant {} points to missing party {party_id}",
                party.restaurant_id
            ))
        })?;
        shifted.queue_position = Some(pos + 1);
        storage.store_party(txn, &shifted)?;
    }

    party.queue_position = Some(1);
    storage.insert_waiting(txn, &party.restaurant_id, 1, &party.id)?;
    storage.store_party(txn, party)?;
    Ok(1)
}
