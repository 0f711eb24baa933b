//! In-memory wallet record store
//!
//! Used by tests and `--in-memory` development servers. Mirrors the unique
//! constraints of the PostgreSQL schema so callers see the same errors from
//! both backends.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::{DbError, DbResult, NewWalletRecord, WalletRecord, WalletStore, WalletTransaction};

/// In-memory [`WalletStore`]
///
/// Cloning is cheap and every clone shares the same data.
#[derive(Clone)]
pub struct MemoryWalletStore {
    /// Per-user mutation locks, held only while a transaction is open
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    /// Committed rows per user
    committed: Arc<DashMap<Uuid, Vec<WalletRecord>>>,
    next_id: Arc<AtomicI64>,
    failing_commits: Arc<AtomicU32>,
}

impl Default for MemoryWalletStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            committed: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicI64::new(1)),
            failing_commits: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Make the next `count` commits fail with a transient
    /// [`DbError::Transaction`] and discard their writes.
    pub fn fail_next_commits(&self, count: u32) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Total rows across all users
    pub fn wallet_count(&self) -> usize {
        self.committed.iter().map(|entry| entry.value().len()).sum()
    }

    fn user_lock(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(user_id).or_default().value())
    }

    /// Drop the user's lock entry once nothing else holds or awaits it
    fn release_lock(&self, user_id: Uuid) {
        self.locks
            .remove_if(&user_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn snapshot(&self, user_id: Uuid) -> Vec<WalletRecord> {
        self.committed
            .get(&user_id)
            .map(|rows| rows.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl WalletStore for MemoryWalletStore {
    async fn begin(&self, user_id: Uuid) -> DbResult<Box<dyn WalletTransaction>> {
        let guard = self.user_lock(user_id).lock_owned().await;
        debug!(user_id = %user_id, "Acquired per-user wallet lock");

        Ok(Box::new(MemoryWalletTransaction {
            user_id,
            guard: Some(guard),
            working: self.snapshot(user_id),
            store: self.clone(),
        }))
    }

    async fn list_by_user(&self, user_id: Uuid) -> DbResult<Vec<WalletRecord>> {
        let mut rows = self.snapshot(user_id);
        sort_rows(&mut rows);
        Ok(rows)
    }

    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}

/// Working copy of one user's rows, published on commit
struct MemoryWalletTransaction {
    user_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    working: Vec<WalletRecord>,
    store: MemoryWalletStore,
}

impl MemoryWalletTransaction {
    fn other_primary(&self, except: Option<i64>) -> Option<&WalletRecord> {
        self.working
            .iter()
            .find(|row| row.is_primary && Some(row.id) != except)
    }
}

#[async_trait]
impl WalletTransaction for MemoryWalletTransaction {
    fn user_id(&self) -> Uuid {
        self.user_id
    }

    async fn list(&mut self) -> DbResult<Vec<WalletRecord>> {
        let mut rows = self.working.clone();
        sort_rows(&mut rows);
        Ok(rows)
    }

    async fn insert(&mut self, record: NewWalletRecord) -> DbResult<WalletRecord> {
        if record.address_normalized != record.address_normalized.to_lowercase() {
            return Err(DbError::Constraint(
                "address_normalized must be lowercase".to_string(),
            ));
        }

        if self.working.iter().any(|row| {
            row.address_normalized == record.address_normalized
                && row.chain_namespace == record.chain_namespace
        }) {
            return Err(DbError::Duplicate(format!(
                "{} on {}",
                record.address_normalized, record.chain_namespace
            )));
        }

        if record.is_primary {
            if let Some(existing) = self.other_primary(None) {
                return Err(DbError::PrimaryConflict(format!(
                    "wallet {} is already primary",
                    existing.id
                )));
            }
        }

        let now = Utc::now();
        let wallet = WalletRecord {
            id: self.store.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: self.user_id,
            address: record.address,
            address_normalized: record.address_normalized,
            chain_namespace: record.chain_namespace,
            label: record.label,
            is_primary: record.is_primary,
            created_at: now,
            updated_at: now,
        };
        self.working.push(wallet.clone());

        Ok(wallet)
    }

    async fn set_primary(
        &mut self,
        wallet_id: i64,
        is_primary: bool,
        at: DateTime<Utc>,
    ) -> DbResult<WalletRecord> {
        if is_primary {
            if let Some(existing) = self.other_primary(Some(wallet_id)) {
                return Err(DbError::PrimaryConflict(format!(
                    "wallet {} is already primary",
                    existing.id
                )));
            }
        }

        let row = self
            .working
            .iter_mut()
            .find(|row| row.id == wallet_id)
            .ok_or_else(|| DbError::NotFound(format!("wallet {}", wallet_id)))?;
        row.is_primary = is_primary;
        row.updated_at = at;

        Ok(row.clone())
    }

    async fn delete(&mut self, wallet_ids: &[i64]) -> DbResult<u64> {
        let before = self.working.len();
        self.working.retain(|row| !wallet_ids.contains(&row.id));
        Ok((before - self.working.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let injected = self
            .store
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(DbError::Transaction("injected commit failure".to_string()));
        }

        let mut this = *self;
        let working = std::mem::take(&mut this.working);
        if working.is_empty() {
            this.store.committed.remove(&this.user_id);
        } else {
            this.store.committed.insert(this.user_id, working);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        Ok(())
    }
}

impl Drop for MemoryWalletTransaction {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.store.release_lock(self.user_id);
    }
}

fn sort_rows(rows: &mut [WalletRecord]) {
    rows.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn new_wallet(address: &str, namespace: &str, is_primary: bool) -> NewWalletRecord {
        NewWalletRecord {
            address: address.to_string(),
            address_normalized: address.to_lowercase(),
            chain_namespace: namespace.to_string(),
            label: None,
            is_primary,
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_rows() {
        let store = MemoryWalletStore::new();
        let user = Uuid::new_v4();

        let mut tx = store.begin(user).await.unwrap();
        let wallet = tx.insert(new_wallet("0xAbC", "eip155:1", true)).await.unwrap();
        assert_eq!(wallet.address_normalized, "0xabc");
        assert!(store.list_by_user(user).await.unwrap().is_empty());

        tx.commit().await.unwrap();

        let rows = store.list_by_user(user).await.unwrap();
        assert_eq!(rows, vec![wallet]);
    }

    #[tokio::test]
    async fn test_drop_discards_writes() {
        let store = MemoryWalletStore::new();
        let user = Uuid::new_v4();

        {
            let mut tx = store.begin(user).await.unwrap();
            tx.insert(new_wallet("0xabc", "eip155:1", true)).await.unwrap();
        }

        assert!(store.list_by_user(user).await.unwrap().is_empty());
        assert_eq!(store.wallet_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_address_rejected() {
        let store = MemoryWalletStore::new();
        let user = Uuid::new_v4();

        let mut tx = store.begin(user).await.unwrap();
        tx.insert(new_wallet("0xabc", "eip155:1", true)).await.unwrap();
        let err = tx
            .insert(new_wallet("0xABC", "eip155:1", false))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));

        // Same address on another namespace is a different row
        tx.insert(new_wallet("0xabc", "eip155:137", false))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_second_primary_rejected() {
        let store = MemoryWalletStore::new();
        let user = Uuid::new_v4();

        let mut tx = store.begin(user).await.unwrap();
        let first = tx.insert(new_wallet("0xa", "eip155:1", true)).await.unwrap();
        let second = tx.insert(new_wallet("0xb", "eip155:1", false)).await.unwrap();

        let err = tx.insert(new_wallet("0xc", "eip155:1", true)).await.unwrap_err();
        assert!(matches!(err, DbError::PrimaryConflict(_)));

        let err = tx
            .set_primary(second.id, true, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::PrimaryConflict(_)));

        tx.set_primary(first.id, false, Utc::now()).await.unwrap();
        let promoted = tx.set_primary(second.id, true, Utc::now()).await.unwrap();
        assert!(promoted.is_primary);
    }

    #[tokio::test]
    async fn test_set_primary_unknown_wallet() {
        let store = MemoryWalletStore::new();
        let mut tx = store.begin(Uuid::new_v4()).await.unwrap();

        let err = tx.set_primary(42, true, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_only_touches_listed_rows() {
        let store = MemoryWalletStore::new();
        let user = Uuid::new_v4();

        let mut tx = store.begin(user).await.unwrap();
        let a = tx.insert(new_wallet("0xa", "eip155:1", true)).await.unwrap();
        let b = tx.insert(new_wallet("0xb", "eip155:1", false)).await.unwrap();
        assert_eq!(tx.delete(&[a.id, 999]).await.unwrap(), 1);
        assert_eq!(tx.list().await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn test_injected_commit_failure() {
        let store = MemoryWalletStore::new();
        let user = Uuid::new_v4();
        store.fail_next_commits(1);

        let mut tx = store.begin(user).await.unwrap();
        tx.insert(new_wallet("0xa", "eip155:1", true)).await.unwrap();
        let err = tx.commit().await.unwrap_err();
        assert!(err.is_transient());
        assert!(store.list_by_user(user).await.unwrap().is_empty());

        let mut tx = store.begin(user).await.unwrap();
        tx.insert(new_wallet("0xa", "eip155:1", true)).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.list_by_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_user_transactions_are_serialized() {
        let store = MemoryWalletStore::new();
        let user = Uuid::new_v4();

        let held = store.begin(user).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), store.begin(user)).await;
        assert!(blocked.is_err());

        // Other users are not blocked
        let other = tokio::time::timeout(Duration::from_millis(50), store.begin(Uuid::new_v4()))
            .await
            .expect("other user should not wait");
        assert!(other.is_ok());

        held.rollback().await.unwrap();
        let reopened = tokio::time::timeout(Duration::from_millis(50), store.begin(user)).await;
        assert!(reopened.is_ok());
    }

    #[tokio::test]
    async fn test_lock_entries_released_after_transaction() {
        let store = MemoryWalletStore::new();
        let user = Uuid::new_v4();

        let mut tx = store.begin(user).await.unwrap();
        tx.insert(new_wallet("0xa", "eip155:1", true)).await.unwrap();
        assert_eq!(store.locks.len(), 1);
        tx.commit().await.unwrap();
        assert!(store.locks.is_empty());

        let tx = store.begin(Uuid::new_v4()).await.unwrap();
        tx.rollback().await.unwrap();
        assert!(store.locks.is_empty());

        // A waiter keeps the entry alive until it finishes
        let held = store.begin(user).await.unwrap();
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.begin(user).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        held.rollback().await.unwrap();
        assert!(store.locks.len() <= 1);

        waiter.await.unwrap().unwrap();
        assert!(store.locks.is_empty());
        assert_eq!(store.list_by_user(user).await.unwrap().len(), 1);
    }
}
