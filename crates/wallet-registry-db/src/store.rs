//! Storage traits shared by the PostgreSQL and in-memory backends

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{DbResult, NewWalletRecord, WalletRecord};

/// A wallet record store.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Open a transaction scoped to `user_id`.
    ///
    /// The per-user lock is acquired before this returns and is released when
    /// the transaction commits, rolls back or is dropped.
    async fn begin(&self, user_id: Uuid) -> DbResult<Box<dyn WalletTransaction>>;

    /// Point-in-time read of every row owned by `user_id`, ordered by
    /// `(created_at, id)`.
    async fn list_by_user(&self, user_id: Uuid) -> DbResult<Vec<WalletRecord>>;

    /// Cheap liveness check used by readiness probes.
    async fn ping(&self) -> DbResult<()>;
}

/// Read/write primitives inside a single-user transaction.
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// every write made through it.
#[async_trait]
pub trait WalletTransaction: Send {
    /// The user this transaction is scoped to.
    fn user_id(&self) -> Uuid;

    /// Every row of the user as seen by this transaction, ordered by
    /// `(created_at, id)`.
    async fn list(&mut self) -> DbResult<Vec<WalletRecord>>;

    /// Insert a row for the user.
    ///
    /// Fails with `Duplicate` when `(address_normalized, chain_namespace)` is
    /// already registered, and with `PrimaryConflict` when inserting a primary
    /// row while another primary row exists.
    async fn insert(&mut self, record: NewWalletRecord) -> DbResult<WalletRecord>;

    /// Set or clear the primary flag of one of the user's rows, touching
    /// `updated_at`.
    async fn set_primary(
        &mut self,
        wallet_id: i64,
        is_primary: bool,
        at: DateTime<Utc>,
    ) -> DbResult<WalletRecord>;

    /// Delete the given rows of the user, returning how many were removed.
    async fn delete(&mut self, wallet_ids: &[i64]) -> DbResult<u64>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}
