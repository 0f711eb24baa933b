//! Database models - mapped from PostgreSQL tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One registered address on one chain namespace for one user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WalletRecord {
    /// Monotonically increasing row id (smaller = created earlier)
    pub id: i64,
    pub user_id: Uuid,
    /// Address as supplied by the caller
    pub address: String,
    /// Lowercased address used for every comparison
    pub address_normalized: String,
    /// CAIP-2 style chain identifier, e.g. `eip155:1`
    pub chain_namespace: String,
    pub label: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload. The owning user comes from the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWalletRecord {
    pub address: String,
    pub address_normalized: String,
    pub chain_namespace: String,
    pub label: Option<String>,
    pub is_primary: bool,
}
