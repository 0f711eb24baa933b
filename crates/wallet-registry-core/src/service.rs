//! Wallet mutation service
//!
//! Every operation runs in one per-user transaction. Deletes and clears are
//! applied before a promotion so the one-primary index is never violated
//! mid-transaction. Transient store errors restart the whole transaction,
//! which re-reads the user's rows and makes every decision again.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;
use wallet_registry_db::{NewWalletRecord, WalletRecord, WalletStore, WalletTransaction};

use crate::normalize::{
    check_address_for_namespace, normalize_address, normalize_label, normalize_namespace,
};
use crate::selector::{select_reassignment_candidate, select_representative};
use crate::verifier::verify_rows;
use crate::{RegistryConfig, RegistryError, RegistryResult};

/// Result of a removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalOutcome {
    /// Rows deleted
    pub removed: u64,
    /// Row that inherited the primary flag, if the primary was removed
    pub promoted: Option<WalletRecord>,
}

/// Adds, removes and re-points the primary wallet of a user.
#[derive(Clone)]
pub struct WalletMutationService {
    store: Arc<dyn WalletStore>,
    config: RegistryConfig,
}

impl WalletMutationService {
    pub fn new(store: Arc<dyn WalletStore>, config: RegistryConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn WalletStore> {
        &self.store
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register an address on a chain namespace.
    ///
    /// The user's first wallet becomes primary. Registering the same address
    /// twice on the same namespace is a `Conflict`.
    #[tracing::instrument(
        skip_all,
        fields(user_id = %user_id, address = %address, chain_namespace = %chain_namespace)
    )]
    pub async fn add_wallet(
        &self,
        user_id: Uuid,
        address: &str,
        chain_namespace: &str,
        label: Option<&str>,
    ) -> RegistryResult<WalletRecord> {
        let address = normalize_address(address)?;
        let chain_namespace = normalize_namespace(chain_namespace)?;
        check_address_for_namespace(&address, &chain_namespace)?;

        let record = NewWalletRecord {
            address: address.address,
            address_normalized: address.normalized,
            chain_namespace,
            label: normalize_label(label)?,
            is_primary: false,
        };
        let record = &record;

        let wallet = self
            .with_retry("add_wallet", user_id, move || {
                self.add_wallet_once(user_id, record)
            })
            .await?;

        info!(
            wallet_id = wallet.id,
            chain_namespace = %wallet.chain_namespace,
            is_primary = wallet.is_primary,
            "Wallet added"
        );
        Ok(wallet)
    }

    /// Remove one wallet row. If it was primary, the reassignment candidate
    /// among the remaining rows is promoted in the same transaction.
    #[tracing::instrument(skip_all, fields(user_id = %user_id, wallet_id = wallet_id))]
    pub async fn remove_wallet(
        &self,
        user_id: Uuid,
        wallet_id: i64,
    ) -> RegistryResult<RemovalOutcome> {
        let outcome = self
            .with_retry("remove_wallet", user_id, move || {
                self.remove_wallet_once(user_id, wallet_id)
            })
            .await?;

        info!(
            promoted_wallet_id = ?outcome.promoted.as_ref().map(|w| w.id),
            "Wallet removed"
        );
        Ok(outcome)
    }

    /// Remove every row of an address across all namespaces.
    #[tracing::instrument(skip_all, fields(user_id = %user_id, address = %address))]
    pub async fn remove_address(
        &self,
        user_id: Uuid,
        address: &str,
    ) -> RegistryResult<RemovalOutcome> {
        let address = normalize_address(address)?;
        let normalized = address.normalized.as_str();

        let outcome = self
            .with_retry("remove_address", user_id, move || {
                self.remove_address_once(user_id, normalized)
            })
            .await?;

        info!(
            removed_count = outcome.removed,
            promoted_wallet_id = ?outcome.promoted.as_ref().map(|w| w.id),
            "Address removed"
        );
        Ok(outcome)
    }

    /// Make an address the user's primary wallet.
    ///
    /// The representative row of the address is chosen with
    /// [`select_representative`]; `preferred_namespace` is a hint only.
    #[tracing::instrument(
        skip_all,
        fields(user_id = %user_id, address = %address, preferred_namespace = ?preferred_namespace)
    )]
    pub async fn set_primary_wallet(
        &self,
        user_id: Uuid,
        address: &str,
        preferred_namespace: Option<&str>,
    ) -> RegistryResult<WalletRecord> {
        let address = normalize_address(address)?;
        let normalized = address.normalized.as_str();
        let preferred_namespace = preferred_namespace
            .map(str::trim)
            .filter(|ns| !ns.is_empty());

        let wallet = self
            .with_retry("set_primary_wallet", user_id, move || {
                self.set_primary_once(user_id, normalized, preferred_namespace)
            })
            .await?;

        info!(
            wallet_id = wallet.id,
            chain_namespace = %wallet.chain_namespace,
            "Primary wallet set"
        );
        Ok(wallet)
    }

    /// Committed rows of the user, ordered by `(created_at, id)`.
    pub async fn list_wallets(&self, user_id: Uuid) -> RegistryResult<Vec<WalletRecord>> {
        self.with_retry("list_wallets", user_id, move || async move {
            Ok(self.store.list_by_user(user_id).await?)
        })
        .await
    }

    async fn add_wallet_once(
        &self,
        user_id: Uuid,
        record: &NewWalletRecord,
    ) -> RegistryResult<WalletRecord> {
        let mut tx = self.store.begin(user_id).await?;
        let outcome = add_in_tx(tx.as_mut(), record.clone()).await;
        self.settle(tx, outcome).await
    }

    async fn remove_wallet_once(
        &self,
        user_id: Uuid,
        wallet_id: i64,
    ) -> RegistryResult<RemovalOutcome> {
        let mut tx = self.store.begin(user_id).await?;
        let outcome = remove_wallet_in_tx(tx.as_mut(), wallet_id).await;
        self.settle(tx, outcome).await
    }

    async fn remove_address_once(
        &self,
        user_id: Uuid,
        address_normalized: &str,
    ) -> RegistryResult<RemovalOutcome> {
        let mut tx = self.store.begin(user_id).await?;
        let outcome = remove_address_in_tx(tx.as_mut(), address_normalized).await;
        self.settle(tx, outcome).await
    }

    async fn set_primary_once(
        &self,
        user_id: Uuid,
        address_normalized: &str,
        preferred_namespace: Option<&str>,
    ) -> RegistryResult<WalletRecord> {
        let mut tx = self.store.begin(user_id).await?;
        let outcome = set_primary_in_tx(tx.as_mut(), address_normalized, preferred_namespace).await;
        self.settle(tx, outcome).await
    }

    /// Commit on success, roll back on failure.
    ///
    /// With `verify_invariants` on, the transaction's own view is checked
    /// first and a violation rolls it back.
    async fn settle<T: Send>(
        &self,
        mut tx: Box<dyn WalletTransaction>,
        outcome: RegistryResult<T>,
    ) -> RegistryResult<T> {
        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                return Err(err);
            }
        };

        if self.config.verify_invariants {
            let user_id = tx.user_id();
            let rows = tx.list().await?;
            if let Err(violation) = verify_rows(user_id, &rows) {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                error!(
                    user_id = %user_id,
                    invariant_violation = true,
                    violation = %violation,
                    "Mutation would break primary wallet rules, rolled back"
                );
                counter!("wallet_registry_invariant_violations_total").increment(1);
                return Err(RegistryError::InvariantViolation { user_id, violation });
            }
        }

        tx.commit().await?;
        Ok(value)
    }

    /// Run `attempt` under the operation timeout, retrying transient errors
    /// with backoff.
    async fn with_retry<T, F, Fut>(
        &self,
        op: &'static str,
        user_id: Uuid,
        mut attempt: F,
    ) -> RegistryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RegistryResult<T>>,
    {
        let started = Instant::now();
        let max_attempts = self.config.retry.max_attempts.max(1);
        let timeout = self.config.operation_timeout;
        let mut attempts = 0;

        let result = loop {
            attempts += 1;

            let outcome = match tokio::time::timeout(timeout, attempt()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(RegistryError::TransientStore(format!(
                    "{} timed out after {:?}",
                    op, timeout
                ))),
            };

            match outcome {
                Err(err) if err.is_retryable() && attempts < max_attempts => {
                    let delay = self.config.retry.backoff(attempts - 1);
                    warn!(
                        op,
                        user_id = %user_id,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient store error, retrying"
                    );
                    counter!("wallet_registry_retries_total", "op" => op).increment(1);
                    tokio::time::sleep(delay).await;
                }
                other => break other,
            }
        };

        histogram!("wallet_registry_operation_seconds", "op" => op)
            .record(started.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.kind(),
        };
        counter!("wallet_registry_operations_total", "op" => op, "outcome" => outcome).increment(1);

        if let Err(RegistryError::Store(err)) = &result {
            error!(op, user_id = %user_id, error = %err, "Wallet store failure");
        }

        result
    }
}

async fn add_in_tx(
    tx: &mut dyn WalletTransaction,
    mut record: NewWalletRecord,
) -> RegistryResult<WalletRecord> {
    let rows = tx.list().await?;

    if rows.iter().any(|row| {
        row.address_normalized == record.address_normalized
            && row.chain_namespace == record.chain_namespace
    }) {
        return Err(RegistryError::Conflict(format!(
            "{} is already registered on {}",
            record.address, record.chain_namespace
        )));
    }

    record.is_primary = rows.is_empty();
    Ok(tx.insert(record).await?)
}

async fn remove_wallet_in_tx(
    tx: &mut dyn WalletTransaction,
    wallet_id: i64,
) -> RegistryResult<RemovalOutcome> {
    let rows = tx.list().await?;
    let target = rows
        .iter()
        .find(|row| row.id == wallet_id)
        .ok_or_else(|| RegistryError::NotFound(format!("wallet {}", wallet_id)))?;
    let was_primary = target.is_primary;

    let removed = tx.delete(&[wallet_id]).await?;

    let promoted = if was_primary {
        let remaining: Vec<WalletRecord> =
            rows.into_iter().filter(|row| row.id != wallet_id).collect();
        promote_successor(tx, &remaining).await?
    } else {
        None
    };

    Ok(RemovalOutcome { removed, promoted })
}

async fn remove_address_in_tx(
    tx: &mut dyn WalletTransaction,
    address_normalized: &str,
) -> RegistryResult<RemovalOutcome> {
    let rows = tx.list().await?;
    let (matching, remaining): (Vec<WalletRecord>, Vec<WalletRecord>) = rows
        .into_iter()
        .partition(|row| row.address_normalized == address_normalized);

    if matching.is_empty() {
        return Err(RegistryError::NotFound(format!(
            "address {}",
            address_normalized
        )));
    }

    let ids: Vec<i64> = matching.iter().map(|row| row.id).collect();
    let removed = tx.delete(&ids).await?;

    let promoted = if matching.iter().any(|row| row.is_primary) {
        promote_successor(tx, &remaining).await?
    } else {
        None
    };

    Ok(RemovalOutcome { removed, promoted })
}

async fn promote_successor(
    tx: &mut dyn WalletTransaction,
    remaining: &[WalletRecord],
) -> RegistryResult<Option<WalletRecord>> {
    match select_reassignment_candidate(remaining) {
        Some(candidate) => Ok(Some(tx.set_primary(candidate.id, true, Utc::now()).await?)),
        None => Ok(None),
    }
}

async fn set_primary_in_tx(
    tx: &mut dyn WalletTransaction,
    address_normalized: &str,
    preferred_namespace: Option<&str>,
) -> RegistryResult<WalletRecord> {
    let rows = tx.list().await?;
    let candidates: Vec<WalletRecord> = rows
        .iter()
        .filter(|row| row.address_normalized == address_normalized)
        .cloned()
        .collect();

    let representative = select_representative(&candidates, preferred_namespace)
        .cloned()
        .ok_or_else(|| RegistryError::NotFound(format!("address {}", address_normalized)))?;

    let current: Vec<i64> = rows
        .iter()
        .filter(|row| row.is_primary)
        .map(|row| row.id)
        .collect();
    if current == [representative.id] {
        return Ok(representative);
    }

    let now = Utc::now();
    for wallet_id in current.into_iter().filter(|id| *id != representative.id) {
        tx.set_primary(wallet_id, false, now).await?;
    }

    Ok(tx.set_primary(representative.id, true, now).await?)
}
