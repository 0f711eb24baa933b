//! Primary wallet invariant checks

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::error;
use uuid::Uuid;
use wallet_registry_db::{WalletRecord, WalletStore};

use crate::RegistryResult;

/// A broken rule in a user's wallet rows
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("wallet {wallet_id} belongs to user {owner}")]
    ForeignRow { wallet_id: i64, owner: Uuid },

    #[error("{address} is registered twice on {chain_namespace}")]
    DuplicateWallet {
        address: String,
        chain_namespace: String,
    },

    #[error("{address} has {count} primary rows")]
    AddressHasMultiplePrimaries { address: String, count: usize },

    #[error("{wallet_count} wallets but no primary")]
    MissingPrimary { wallet_count: usize },

    #[error("{count} primary wallets")]
    MultiplePrimaries { count: usize },
}

/// Check every primary wallet rule over the complete row set of `user_id`.
pub fn verify_rows(user_id: Uuid, rows: &[WalletRecord]) -> Result<(), InvariantViolation> {
    if let Some(foreign) = rows.iter().find(|row| row.user_id != user_id) {
        return Err(InvariantViolation::ForeignRow {
            wallet_id: foreign.id,
            owner: foreign.user_id,
        });
    }

    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        if !seen.insert((row.address_normalized.as_str(), row.chain_namespace.as_str())) {
            return Err(InvariantViolation::DuplicateWallet {
                address: row.address_normalized.clone(),
                chain_namespace: row.chain_namespace.clone(),
            });
        }
    }

    let mut primaries_by_address: HashMap<&str, usize> = HashMap::new();
    for row in rows.iter().filter(|row| row.is_primary) {
        *primaries_by_address
            .entry(row.address_normalized.as_str())
            .or_default() += 1;
    }
    if let Some((address, count)) = primaries_by_address.iter().find(|(_, count)| **count > 1) {
        return Err(InvariantViolation::AddressHasMultiplePrimaries {
            address: address.to_string(),
            count: *count,
        });
    }

    let primary_count: usize = primaries_by_address.values().sum();
    match (rows.len(), primary_count) {
        (0, 0) | (_, 1) => Ok(()),
        (wallet_count, 0) => Err(InvariantViolation::MissingPrimary { wallet_count }),
        (_, count) => Err(InvariantViolation::MultiplePrimaries { count }),
    }
}

/// Checks committed state in the store.
pub struct InvariantVerifier {
    store: Arc<dyn WalletStore>,
}

impl InvariantVerifier {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self { store }
    }

    /// Read a fresh snapshot of the user's rows and check them.
    ///
    /// Violations are logged and reported as `false`; they are never repaired.
    pub async fn verify(&self, user_id: Uuid) -> RegistryResult<bool> {
        let rows = self.store.list_by_user(user_id).await?;

        match verify_rows(user_id, &rows) {
            Ok(()) => Ok(true),
            Err(violation) => {
                error!(
                    user_id = %user_id,
                    invariant_violation = true,
                    violation = %violation,
                    "Committed wallet rows violate primary wallet rules"
                );
                Ok(false)
            }
        }
    }
}
