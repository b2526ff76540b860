//! redb-based storage layer for the waitlist engine
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `parties` | `party_id` | `Party` (JSON) | System of record, never physically deleted |
//! | `waiting_index` | `(restaurant_id, position)` | `party_id` | Ordered waiting set per restaurant |
//! | `called_index` | `(restaurant_id, party_id)` | `()` | NEXT/READY parties, scanned by the sweep |
//! | `sequence_counter` | `"seq"` | `u64` | Global event sequence |
//!
//! # Durability
//!
//! redb commits are durable as soon as `commit()` returns (copy-on-write
//! with atomic pointer swap). The tolerance deadline is data
//! (`notified_at` + snapshot) and therefore survives restarts; no
//! in-memory timer holds engine state.
//!
//! # Consistency
//!
//! 位置压缩和状态迁移必须落在同一个写事务里；索引与 party 快照
//! 之间的任何不一致以 [`StorageError::Inconsistent`] 暴露。

use std::path::Path;
use std::sync::Arc;

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use thiserror::Error;

use shared::waitlist::Party;

/// Party records: key = party_id, value = JSON-serialized Party
const PARTIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("parties");

/// Waiting set: key = (restaurant_id, position), value = party_id
const WAITING_TABLE: TableDefinition<(&str, u32), &str> = TableDefinition::new("waiting_index");

/// Called set: key = (restaurant_id, party_id), value = empty (existence check)
const CALLED_TABLE: TableDefinition<(&str, &str), ()> = TableDefinition::new("called_index");

/// Sequence counter: key = "seq", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const SEQUENCE_KEY: &str = "seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 索引与 party 快照不一致（理论上只在位损坏后出现）
    #[error("Inconsistent index: {0}")]
    Inconsistent(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Waitlist storage backed by redb
#[derive(Clone)]
pub struct WaitlistStorage {
    db: Arc<Database>,
}

impl WaitlistStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(PARTIES_TABLE)?;
            let _ = write_txn.open_table(WAITING_TABLE)?;
            let _ = write_txn.open_table(CALLED_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Increment and return the global event sequence (within transaction)
    pub fn increment_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(SEQUENCE_KEY, next)?;
        Ok(next)
    }

    /// Get current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    // ========== Party Operations ==========

    /// Store (insert or overwrite) a party snapshot
    pub fn store_party(&self, txn: &WriteTransaction, party: &Party) -> StorageResult<()> {
        let mut table = txn.open_table(PARTIES_TABLE)?;
        let value = serde_json::to_vec(party)?;
        table.insert(party.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a party by ID (read-only, outside transaction)
    pub fn get_party(&self, party_id: &str) -> StorageResult<Option<Party>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PARTIES_TABLE)?;
        match table.get(party_id)? {
            Some(value) => {
                let party: Party = serde_json::from_slice(value.value())?;
                Ok(Some(party))
            }
            None => Ok(None),
        }
    }

    /// Get a party by ID (within transaction)
    pub fn get_party_txn(
        &self,
        txn: &WriteTransaction,
        party_id: &str,
    ) -> StorageResult<Option<Party>> {
        let table = txn.open_table(PARTIES_TABLE)?;
        match table.get(party_id)? {
            Some(value) => {
                let party: Party = serde_json::from_slice(value.value())?;
                Ok(Some(party))
            }
            None => Ok(None),
        }
    }

    // ========== Waiting Index ==========

    /// Insert a waiting slot
    pub fn insert_waiting(
        &self,
        txn: &WriteTransaction,
        restaurant_id: &str,
        position: u32,
        party_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(WAITING_TABLE)?;
        table.insert((restaurant_id, position), party_id)?;
        Ok(())
    }

    /// Remove a waiting slot
    pub fn remove_waiting(
        &self,
        txn: &WriteTransaction,
        restaurant_id: &str,
        position: u32,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(WAITING_TABLE)?;
        table.remove((restaurant_id, position))?;
        Ok(())
    }

    /// Ordered waiting entries `(position, party_id)` for a restaurant
    /// (read-only, outside transaction)
    pub fn waiting_entries(&self, restaurant_id: &str) -> StorageResult<Vec<(u32, String)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WAITING_TABLE)?;

        let mut entries = Vec::new();
        for result in table.range((restaurant_id, 0u32)..=(restaurant_id, u32::MAX))? {
            let (key, value) = result?;
            entries.push((key.value().1, value.value().to_string()));
        }
        Ok(entries)
    }

    /// Ordered waiting entries starting at `from_position` (within transaction)
    pub fn waiting_entries_from_txn(
        &self,
        txn: &WriteTransaction,
        restaurant_id: &str,
        from_position: u32,
    ) -> StorageResult<Vec<(u32, String)>> {
        let table = txn.open_table(WAITING_TABLE)?;

        let mut entries = Vec::new();
        for result in table.range((restaurant_id, from_position)..=(restaurant_id, u32::MAX))? {
            let (key, value) = result?;
            entries.push((key.value().1, value.value().to_string()));
        }
        Ok(entries)
    }

    /// All waiting entries for a restaurant (within transaction)
    pub fn waiting_entries_txn(
        &self,
        txn: &WriteTransaction,
        restaurant_id: &str,
    ) -> StorageResult<Vec<(u32, String)>> {
        self.waiting_entries_from_txn(txn, restaurant_id, 0)
    }

    /// The waiting party with the lowest position, if any (within transaction)
    pub fn first_waiting_txn(
        &self,
        txn: &WriteTransaction,
        restaurant_id: &str,
    ) -> StorageResult<Option<(u32, String)>> {
        let table = txn.open_table(WAITING_TABLE)?;
        let mut range = table.range((restaurant_id, 0u32)..=(restaurant_id, u32::MAX))?;
        match range.next() {
            Some(result) => {
                let (key, value) = result?;
                Ok(Some((key.value().1, value.value().to_string())))
            }
            None => Ok(None),
        }
    }

    /// Highest occupied position, 0 when the waiting set is empty
    /// (within transaction)
    pub fn max_waiting_position_txn(
        &self,
        txn: &WriteTransaction,
        restaurant_id: &str,
    ) -> StorageResult<u32> {
        let table = txn.open_table(WAITING_TABLE)?;
        let mut range = table.range((restaurant_id, 0u32)..=(restaurant_id, u32::MAX))?;
        match range.next_back() {
            Some(result) => {
                let (key, _) = result?;
                Ok(key.value().1)
            }
            None => Ok(0),
        }
    }

    /// Number of waiting parties for a restaurant (within transaction)
    pub fn waiting_count_txn(
        &self,
        txn: &WriteTransaction,
        restaurant_id: &str,
    ) -> StorageResult<u32> {
        Ok(self.waiting_entries_txn(txn, restaurant_id)?.len() as u32)
    }

    // ========== Called Index ==========

    /// Mark a party as called (NEXT/READY)
    pub fn mark_called(
        &self,
        txn: &WriteTransaction,
        restaurant_id: &str,
        party_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CALLED_TABLE)?;
        table.insert((restaurant_id, party_id), ())?;
        Ok(())
    }

    /// Remove a party from the called set
    pub fn unmark_called(
        &self,
        txn: &WriteTransaction,
        restaurant_id: &str,
        party_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CALLED_TABLE)?;
        table.remove((restaurant_id, party_id))?;
        Ok(())
    }

    /// All called parties as `(restaurant_id, party_id)` pairs (read-only).
    /// The sweep scans this instead of every party record.
    pub fn all_called(&self) -> StorageResult<Vec<(String, String)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CALLED_TABLE)?;

        let mut pairs = Vec::new();
        for result in table.iter()? {
            let (key, _) = result?;
            let (restaurant_id, party_id) = key.value();
            pairs.push((restaurant_id.to_string(), party_id.to_string()));
        }
        Ok(pairs)
    }

    /// Called party IDs for one restaurant (read-only)
    pub fn called_ids(&self, restaurant_id: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .all_called()?
            .into_iter()
            .filter(|(rid, _)| rid == restaurant_id)
            .map(|(_, pid)| pid)
            .collect())
    }

    /// Number of called parties for a restaurant (within transaction).
    /// Used together with the waiting count for capacity enforcement
    /// (the cap covers WAITING + NEXT + READY).
    pub fn called_count_txn(
        &self,
        txn: &WriteTransaction,
        restaurant_id: &str,
    ) -> StorageResult<u32> {
        let table = txn.open_table(CALLED_TABLE)?;
        let mut count = 0u32;
        for result in table.iter()? {
            let (key, _) = result?;
            if key.value().0 == restaurant_id {
                count += 1;
            }
        }
        Ok(count)
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let parties_table = read_txn.open_table(PARTIES_TABLE)?;
        let waiting_table = read_txn.open_table(WAITING_TABLE)?;
        let called_table = read_txn.open_table(CALLED_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            party_count: parties_table.len()?,
            waiting_count: waiting_table.len()?,
            called_count: called_table.len()?,
            current_sequence: seq_table
                .get(SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageStats {
    pub party_count: u64,
    pub waiting_count: u64,
    pub called_count: u64,
    pub current_sequence: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::waitlist::PartyStatus;

    fn create_test_party(id: &str, restaurant_id: &str) -> Party {
        Party::new(
            id.to_string(),
            restaurant_id.to_string(),
            "Test Party".to_string(),
            "+34 600 000 000".to_string(),
            2,
            shared::util::now_millis(),
        )
    }

    #[test]
    fn test_sequence_increment() {
        let storage = WaitlistStorage::open_in_memory().unwrap();

        assert_eq!(storage.get_current_sequence().unwrap(), 0);

        let txn = storage.begin_write().unwrap();
        let seq1 = storage.increment_sequence(&txn).unwrap();
        txn.commit().unwrap();
        assert_eq!(seq1, 1);

        let txn = storage.begin_write().unwrap();
        let seq2 = storage.increment_sequence(&txn).unwrap();
        txn.commit().unwrap();
        assert_eq!(seq2, 2);

        assert_eq!(storage.get_current_sequence().unwrap(), 2);
    }

    #[test]
    fn test_party_round_trip() {
        let storage = WaitlistStorage::open_in_memory().unwrap();
        let mut party = create_test_party("p-1", "r-1");
        party.status = PartyStatus::Waiting;
        party.queue_position = Some(1);

        let txn = storage.begin_write().unwrap();
        storage.store_party(&txn, &party).unwrap();
        txn.commit().unwrap();

        let loaded = storage.get_party("p-1").unwrap().unwrap();
        assert_eq!(loaded, party);
        assert!(storage.get_party("missing").unwrap().is_none());
    }

    #[test]
    fn test_waiting_index_is_ordered_per_restaurant() {
        let storage = WaitlistStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.insert_waiting(&txn, "r-1", 2, "p-b").unwrap();
        storage.insert_waiting(&txn, "r-1", 1, "p-a").unwrap();
        storage.insert_waiting(&txn, "r-2", 1, "p-other").unwrap();
        txn.commit().unwrap();

        let entries = storage.waiting_entries("r-1").unwrap();
        assert_eq!(
            entries,
            vec![(1, "p-a".to_string()), (2, "p-b".to_string())]
        );

        let txn = storage.begin_write().unwrap();
        assert_eq!(
            storage.first_waiting_txn(&txn, "r-1").unwrap(),
            Some((1, "p-a".to_string()))
        );
        assert_eq!(storage.max_waiting_position_txn(&txn, "r-1").unwrap(), 2);
        assert_eq!(storage.max_waiting_position_txn(&txn, "r-3").unwrap(), 0);
        assert_eq!(storage.waiting_count_txn(&txn, "r-2").unwrap(), 1);
    }

    #[test]
    fn test_called_index() {
        let storage = WaitlistStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.mark_called(&txn, "r-1", "p-1").unwrap();
        storage.mark_called(&txn, "r-2", "p-2").unwrap();
        txn.commit().unwrap();

        let all = storage.all_called().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(storage.called_ids("r-1").unwrap(), vec!["p-1".to_string()]);

        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.called_count_txn(&txn, "r-1").unwrap(), 1);
        storage.unmark_called(&txn, "r-1", "p-1").unwrap();
        txn.commit().unwrap();

        assert!(storage.called_ids("r-1").unwrap().is_empty());
    }

    #[test]
    fn test_stats() {
        let storage = WaitlistStorage::open_in_memory().unwrap();
        let party = create_test_party("p-1", "r-1");

        let txn = storage.begin_write().unwrap();
        storage.store_party(&txn, &party).unwrap();
        storage.insert_waiting(&txn, "r-1", 1, "p-1").unwrap();
        storage.increment_sequence(&txn).unwrap();
        txn.commit().unwrap();

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.party_count, 1);
        assert_eq!(stats.waiting_count, 1);
        assert_eq!(stats.called_count, 0);
        assert_eq!(stats.current_sequence, 1);
    }
}
