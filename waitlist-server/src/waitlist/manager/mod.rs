//! WaitlistManager - lifecycle state machine and queue operations
//!
//! This module handles:
//! - State transitions with their side effects (timestamps, indices)
//! - Position allocation/compaction via the allocator
//! - Persistence to redb (transactional)
//! - Event broadcasting after commit
//! - Notification dispatch after commit (fire-and-forget)
//!
//! # Operation Flow
//!
//! ```text
//! operation(party/restaurant)
//!     ├─ 1. Acquire the restaurant's critical section
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Check the transition is legal (InvalidTransition otherwise)
//!     ├─ 4. Mutate party + waiting/called indices (allocator keeps 1..=N)
//!     ├─ 5. Allocate event sequence, persist everything
//!     ├─ 6. Commit transaction
//!     ├─ 7. Release the critical section
//!     ├─ 8. Broadcast QueueEvent / dispatch notification
//!     └─ 9. Return the updated party
//! ```
//!
//! 临界区内没有任何 `.await`（存储操作全部同步），所以一旦进入
//! 第 2 步，操作必然走到提交或整体放弃，不存在压缩到一半被取消
//! 的状态。

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::{Mutex, broadcast};

use shared::util::{new_id, now_millis};
use shared::waitlist::{
    CalledParty, EventPayload, NoShowTrigger, NotifyKind, Party, PartyStatus, QueueEvent,
    QueueEventType, QueueSnapshot, ReinsertionPolicy, tolerance_deadline,
};

use super::allocator;
use super::error::{WaitlistError, WaitlistResult};
use super::notify::Notifier;
use super::storage::{StorageError, WaitlistStorage};
use crate::utils::time::remaining_ms;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Per-restaurant settings snapshot handed to every operation.
///
/// Resolved by the façade from the registry immediately before the call;
/// the manager itself never reads SurrealDB.
#[derive(Debug, Clone, Copy)]
pub struct RestaurantPolicy {
    pub tolerance_minutes: u32,
    pub reinsertion_policy: ReinsertionPolicy,
    pub max_queue_size: Option<u32>,
}

/// WaitlistManager for queue lifecycle processing
///
/// The `epoch` field is a unique identifier generated on each startup.
/// Clients use it to detect server restarts and trigger full resync.
pub struct WaitlistManager {
    storage: WaitlistStorage,
    event_tx: broadcast::Sender<QueueEvent>,
    /// Server instance epoch - unique ID generated on startup
    epoch: String,
    /// Restaurant-scoped critical sections; operations for different
    /// restaurants proceed in parallel
    locks: DashMap<String, Arc<Mutex<()>>>,
    /// Injected notification transport
    notifier: Arc<dyn Notifier>,
    /// Failed dispatch counter (transport errors never fail transitions)
    notify_failures: Arc<AtomicU64>,
}

impl std::fmt::Debug for WaitlistManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitlistManager")
            .field("storage", &"<WaitlistStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl WaitlistManager {
    /// Create a new WaitlistManager with the given database path
    pub fn new(
        db_path: impl AsRef<Path>,
        notifier: Arc<dyn Notifier>,
    ) -> WaitlistResult<Self> {
        let storage = WaitlistStorage::open(db_path)?;
        Ok(Self::with_storage(storage, notifier))
    }

    /// Create a WaitlistManager with existing storage
    pub fn with_storage(storage: WaitlistStorage, notifier: Arc<dyn Notifier>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "WaitlistManager started with new epoch");
        Self {
            storage,
            event_tx,
            epoch,
            locks: DashMap::new(),
            notifier,
            notify_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get the server epoch (unique instance ID)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Subscribe to the queue change feed
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &WaitlistStorage {
        &self.storage
    }

    /// Number of notification dispatch failures since startup
    pub fn notify_failures(&self) -> u64 {
        self.notify_failures.load(Ordering::Relaxed)
    }

    /// 取餐厅的互斥锁；首次访问时惰性创建
    fn restaurant_lock(&self, restaurant_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(restaurant_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn broadcast(&self, event: QueueEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("Event broadcast skipped: no active receivers");
        }
    }

    /// Dispatch a notification on a detached task. Failure is logged and
    /// counted only; the state transition is already durable.
    fn dispatch_notification(&self, party: Party, kind: NotifyKind) {
        let notifier = self.notifier.clone();
        let failures = self.notify_failures.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&party, kind).await {
                failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    party_id = %party.id,
                    kind = %kind,
                    error = %e,
                    "Notification dispatch failed"
                );
            }
        });
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Check a party in: validate capacity, append at the tail, persist as
    /// WAITING.
    pub async fn check_in(
        &self,
        restaurant_id: &str,
        name: String,
        phone: String,
        party_size: i32,
        policy: &RestaurantPolicy,
    ) -> WaitlistResult<Party> {
        let lock = self.restaurant_lock(restaurant_id);
        let _guard = lock.lock().await;

        let txn = self.storage.begin_write()?;
        self.ensure_capacity(&txn, restaurant_id, policy)?;

        let now = now_millis();
        let mut party = Party::new(
            new_id(),
            restaurant_id.to_string(),
            name,
            phone,
            party_size,
            now,
        );
        let position = allocator::enqueue(&self.storage, &txn, &mut party)?;

        let seq = self.storage.increment_sequence(&txn)?;
        let event = QueueEvent::new(
            seq,
            restaurant_id.to_string(),
            party.id.clone(),
            now,
            QueueEventType::PartyCheckedIn,
            EventPayload::PartyCheckedIn {
                name: party.name.clone(),
                party_size: party.party_size,
                queue_position: position,
            },
        );
        txn.commit().map_err(StorageError::from)?;
        drop(_guard);

        tracing::info!(
            restaurant_id = %restaurant_id,
            party_id = %party.id,
            queue_position = position,
            "Party checked in"
        );
        self.broadcast(event);
        Ok(party)
    }

    /// Atomic select-then-claim: transition the waiting party with the
    /// lowest position to NEXT, stamp `notified_at`, snapshot the
    /// tolerance and compact the queue — all in one transaction, so two
    /// concurrent calls can never claim the same party.
    pub async fn call_next(
        &self,
        restaurant_id: &str,
        policy: &RestaurantPolicy,
    ) -> WaitlistResult<Party> {
        let lock = self.restaurant_lock(restaurant_id);
        let _guard = lock.lock().await;

        let txn = self.storage.begin_write()?;
        let Some((position, party_id)) = self.storage.first_waiting_txn(&txn, restaurant_id)?
        else {
            return Err(WaitlistError::EmptyQueue(restaurant_id.to_string()));
        };
        let mut party = self.load_indexed_party(&txn, restaurant_id, position, &party_id)?;

        allocator::dequeue(&self.storage, &txn, restaurant_id, position)?;

        let now = now_millis();
        party.status = PartyStatus::Next;
        party.queue_position = None;
        party.notified_at = Some(now);
        party.tolerance_minutes = Some(policy.tolerance_minutes);
        self.storage.store_party(&txn, &party)?;
        self.storage.mark_called(&txn, restaurant_id, &party.id)?;

        let seq = self.storage.increment_sequence(&txn)?;
        let deadline = tolerance_deadline(now, policy.tolerance_minutes);
        let event = QueueEvent::new(
            seq,
            restaurant_id.to_string(),
            party.id.clone(),
            now,
            QueueEventType::PartyCalled,
            EventPayload::PartyCalled {
                notified_at: now,
                tolerance_minutes: policy.tolerance_minutes,
                deadline,
            },
        );
        txn.commit().map_err(StorageError::from)?;
        drop(_guard);

        tracing::info!(
            restaurant_id = %restaurant_id,
            party_id = %party.id,
            deadline,
            "Party called"
        );
        self.broadcast(event);
        self.dispatch_notification(party.clone(), NotifyKind::Called);
        Ok(party)
    }

    /// Promote a NEXT party to READY ("your table is ready now").
    ///
    /// 倒计时不重置：`notified_at` 在整个叫号周期内只设置一次。
    pub async fn mark_ready(&self, party_id: &str) -> WaitlistResult<Party> {
        let pre = self.require_party(party_id)?;
        let lock = self.restaurant_lock(&pre.restaurant_id);
        let _guard = lock.lock().await;

        let txn = self.storage.begin_write()?;
        let mut party = self.require_party_txn(&txn, party_id)?;
        if party.status != PartyStatus::Next {
            return Err(WaitlistError::InvalidTransition {
                party_id: party.id,
                status: party.status,
                event: "MarkReady",
            });
        }

        party.status = PartyStatus::Ready;
        self.storage.store_party(&txn, &party)?;

        let notified_at = self.called_stamp(&party)?;
        let deadline = self.called_deadline(&party)?;
        let seq = self.storage.increment_sequence(&txn)?;
        let event = QueueEvent::new(
            seq,
            party.restaurant_id.clone(),
            party.id.clone(),
            now_millis(),
            QueueEventType::PartyReady,
            EventPayload::PartyReady {
                notified_at,
                deadline,
            },
        );
        txn.commit().map_err(StorageError::from)?;
        drop(_guard);

        self.broadcast(event);
        self.dispatch_notification(party.clone(), NotifyKind::TableReady);
        Ok(party)
    }

    /// Confirm arrival of a called party: NEXT/READY → SEATED (terminal).
    pub async fn confirm_arrival(&self, party_id: &str) -> WaitlistResult<Party> {
        let pre = self.require_party(party_id)?;
        let lock = self.restaurant_lock(&pre.restaurant_id);
        let _guard = lock.lock().await;

        let txn = self.storage.begin_write()?;
        let mut party = self.require_party_txn(&txn, party_id)?;
        if !party.status.is_called() {
            return Err(WaitlistError::InvalidTransition {
                party_id: party.id,
                status: party.status,
                event: "ConfirmArrival",
            });
        }

        let now = now_millis();
        party.status = PartyStatus::Seated;
        party.arrived_at = Some(now);
        party.seated_at = Some(now);
        self.storage.store_party(&txn, &party)?;
        self.storage
            .unmark_called(&txn, &party.restaurant_id, &party.id)?;

        let seq = self.storage.increment_sequence(&txn)?;
        let event = QueueEvent::new(
            seq,
            party.restaurant_id.clone(),
            party.id.clone(),
            now,
            QueueEventType::PartySeated,
            EventPayload::PartySeated {
                seated_at: now,
                waited_ms: now - party.joined_at,
            },
        );
        txn.commit().map_err(StorageError::from)?;
        drop(_guard);

        tracing::info!(party_id = %party.id, "Party seated");
        self.broadcast(event);
        Ok(party)
    }

    /// Force NEXT/READY → NO_SHOW (manual or sweep-triggered).
    ///
    /// 与并发的 `confirm_arrival` 竞争同一行：输家拿到
    /// `InvalidTransition`，按"已被处理"对待。
    pub async fn mark_no_show(
        &self,
        party_id: &str,
        trigger: NoShowTrigger,
    ) -> WaitlistResult<Party> {
        let pre = self.require_party(party_id)?;
        let lock = self.restaurant_lock(&pre.restaurant_id);
        let _guard = lock.lock().await;

        let txn = self.storage.begin_write()?;
        let mut party = self.require_party_txn(&txn, party_id)?;
        if !party.status.is_called() {
            return Err(WaitlistError::InvalidTransition {
                party_id: party.id,
                status: party.status,
                event: "MarkNoShow",
            });
        }

        let now = now_millis();
        party.status = PartyStatus::NoShow;
        party.removed_at = Some(now);
        self.storage.store_party(&txn, &party)?;
        self.storage
            .unmark_called(&txn, &party.restaurant_id, &party.id)?;

        let seq = self.storage.increment_sequence(&txn)?;
        let event = QueueEvent::new(
            seq,
            party.restaurant_id.clone(),
            party.id.clone(),
            now,
            QueueEventType::PartyNoShow,
            EventPayload::PartyNoShow {
                removed_at: now,
                trigger,
            },
        );
        txn.commit().map_err(StorageError::from)?;
        drop(_guard);

        tracing::info!(party_id = %party.id, trigger = ?trigger, "Party marked no-show");
        self.broadcast(event);
        self.dispatch_notification(party.clone(), NotifyKind::NoShow);
        Ok(party)
    }

    /// Voluntary departure: WAITING → LEFT (terminal), with compaction.
    pub async fn leave(&self, party_id: &str) -> WaitlistResult<Party> {
        let pre = self.require_party(party_id)?;
        let lock = self.restaurant_lock(&pre.restaurant_id);
        let _guard = lock.lock().await;

        let txn = self.storage.begin_write()?;
        let mut party = self.require_party_txn(&txn, party_id)?;
        if party.status != PartyStatus::Waiting {
            return Err(WaitlistError::InvalidTransition {
                party_id: party.id,
                status: party.status,
                event: "Leave",
            });
        }
        let position = party.queue_position.ok_or_else(|| {
            StorageError::Inconsistent(format!("waiting party {party_id} has no position"))
        })?;

        allocator::dequeue(&self.storage, &txn, &party.restaurant_id, position)?;

        let now = now_millis();
        party.status = PartyStatus::Left;
        party.queue_position = None;
        party.removed_at = Some(now);
        self.storage.store_party(&txn, &party)?;

        let seq = self.storage.increment_sequence(&txn)?;
        let event = QueueEvent::new(
            seq,
            party.restaurant_id.clone(),
            party.id.clone(),
            now,
            QueueEventType::PartyLeft,
            EventPayload::PartyLeft { removed_at: now },
        );
        txn.commit().map_err(StorageError::from)?;
        drop(_guard);

        tracing::info!(party_id = %party.id, "Party left the queue");
        self.broadcast(event);
        Ok(party)
    }

    /// Recover a NO_SHOW party back into the waiting set.
    ///
    /// `override_policy` wins over the restaurant default. Clears
    /// `notified_at`, the tolerance snapshot and `removed_at` — the next
    /// call starts a fresh grace period.
    pub async fn reinsert(
        &self,
        party_id: &str,
        policy: &RestaurantPolicy,
        override_policy: Option<ReinsertionPolicy>,
    ) -> WaitlistResult<Party> {
        let pre = self.require_party(party_id)?;
        let lock = self.restaurant_lock(&pre.restaurant_id);
        let _guard = lock.lock().await;

        let txn = self.storage.begin_write()?;
        let mut party = self.require_party_txn(&txn, party_id)?;
        if party.status != PartyStatus::NoShow {
            return Err(WaitlistError::InvalidTransition {
                party_id: party.id,
                status: party.status,
                event: "Reinsert",
            });
        }
        self.ensure_capacity(&txn, &party.restaurant_id, policy)?;

        party.status = PartyStatus::Waiting;
        party.notified_at = None;
        party.tolerance_minutes = None;
        party.removed_at = None;

        let effective = override_policy.unwrap_or(policy.reinsertion_policy);
        let position = match effective {
            ReinsertionPolicy::Last => allocator::enqueue(&self.storage, &txn, &mut party)?,
            ReinsertionPolicy::First => {
                allocator::reinsert_first(&self.storage, &txn, &mut party)?
            }
        };

        let seq = self.storage.increment_sequence(&txn)?;
        let event = QueueEvent::new(
            seq,
            party.restaurant_id.clone(),
            party.id.clone(),
            now_millis(),
            QueueEventType::PartyReinserted,
            EventPayload::PartyReinserted {
                queue_position: position,
                policy: effective,
            },
        );
        txn.commit().map_err(StorageError::from)?;
        drop(_guard);

        tracing::info!(
            party_id = %party.id,
            queue_position = position,
            policy = %effective,
            "Party reinserted"
        );
        self.broadcast(event);
        Ok(party)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Consistent per-restaurant queue view: waiting parties ordered by
    /// position, then called parties with their authoritative deadlines.
    /// Reads inside the restaurant's critical section, so a concurrent
    /// compaction can neither drop nor duplicate a party.
    pub async fn queue_snapshot(&self, restaurant_id: &str) -> WaitlistResult<QueueSnapshot> {
        let lock = self.restaurant_lock(restaurant_id);
        let _guard = lock.lock().await;

        let mut waiting = Vec::new();
        for (position, party_id) in self.storage.waiting_entries(restaurant_id)? {
            let party = self.storage.get_party(&party_id)?.ok_or_else(|| {
                StorageError::Inconsistent(format!(
                    "waiting slot {position} points to missing party {party_id}"
                ))
            })?;
            waiting.push(party);
        }

        let now = now_millis();
        let mut called = Vec::new();
        for party_id in self.storage.called_ids(restaurant_id)? {
            let party = self.storage.get_party(&party_id)?.ok_or_else(|| {
                StorageError::Inconsistent(format!(
                    "called index points to missing party {party_id}"
                ))
            })?;
            let deadline = self.called_deadline(&party)?;
            called.push(CalledParty {
                deadline,
                remaining_ms: remaining_ms(deadline, now),
                party,
            });
        }
        called.sort_by_key(|c| c.party.notified_at);

        Ok(QueueSnapshot {
            restaurant_id: restaurant_id.to_string(),
            epoch: self.epoch.clone(),
            sequence: self.storage.get_current_sequence()?,
            waiting,
            called,
        })
    }

    /// Load a party or fail with PartyNotFound
    pub fn get_party(&self, party_id: &str) -> WaitlistResult<Party> {
        self.require_party(party_id)
    }

    /// All called parties across restaurants — the sweep's candidate set.
    /// A dangling index entry is logged and skipped rather than aborting
    /// the whole scan.
    pub fn called_parties(&self) -> WaitlistResult<Vec<Party>> {
        let mut parties = Vec::new();
        for (restaurant_id, party_id) in self.storage.all_called()? {
            match self.storage.get_party(&party_id)? {
                Some(party) => parties.push(party),
                None => {
                    tracing::warn!(
                        restaurant_id = %restaurant_id,
                        party_id = %party_id,
                        "Called index points to missing party, skipping"
                    );
                }
            }
        }
        Ok(parties)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn require_party(&self, party_id: &str) -> WaitlistResult<Party> {
        self.storage
            .get_party(party_id)?
            .ok_or_else(|| WaitlistError::PartyNotFound(party_id.to_string()))
    }

    fn require_party_txn(
        &self,
        txn: &redb::WriteTransaction,
        party_id: &str,
    ) -> WaitlistResult<Party> {
        self.storage
            .get_party_txn(txn, party_id)?
            .ok_or_else(|| WaitlistError::PartyNotFound(party_id.to_string()))
    }

    fn load_indexed_party(
        &self,
        txn: &redb::WriteTransaction,
        restaurant_id: &str,
        position: u32,
        party_id: &str,
    ) -> WaitlistResult<Party> {
        Ok(self.storage.get_party_txn(txn, party_id)?.ok_or_else(|| {
            StorageError::Inconsistent(format!(
                "waiting slot {position} of restaurant {restaurant_id} points to missing party {party_id}"
            ))
        })?)
    }

    /// Capacity covers the full in-house set: WAITING + NEXT + READY
    fn ensure_capacity(
        &self,
        txn: &redb::WriteTransaction,
        restaurant_id: &str,
        policy: &RestaurantPolicy,
    ) -> WaitlistResult<()> {
        if let Some(capacity) = policy.max_queue_size {
            let occupancy = self.storage.waiting_count_txn(txn, restaurant_id)?
                + self.storage.called_count_txn(txn, restaurant_id)?;
            if occupancy >= capacity {
                return Err(WaitlistError::QueueFull {
                    restaurant_id: restaurant_id.to_string(),
                    capacity,
                });
            }
        }
        Ok(())
    }

    /// 被叫号的 party 必然带有 `notified_at`
    fn called_stamp(&self, party: &Party) -> WaitlistResult<i64> {
        Ok(party.notified_at.ok_or_else(|| {
            StorageError::Inconsistent(format!("called party {} has no notified_at", party.id))
        })?)
    }

    fn called_deadline(&self, party: &Party) -> WaitlistResult<i64> {
        Ok(party.tolerance_deadline().ok_or_else(|| {
            StorageError::Inconsistent(format!(
                "called party {} has no tolerance snapshot",
                party.id
            ))
        })?)
    }
}

#[cfg(test)]
mod tests;
