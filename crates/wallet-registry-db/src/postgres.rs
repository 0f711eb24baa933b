//! PostgreSQL wallet record store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    DatabaseConfig, DbError, DbResult, NewWalletRecord, WalletRecord, WalletStore,
    WalletTransaction,
};

/// PostgreSQL-backed [`WalletStore`]
#[derive(Clone)]
pub struct PgWalletStore {
    pool: PgPool,
}

impl PgWalletStore {
    /// Connect to PostgreSQL
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        info!("Connecting to PostgreSQL: {}", config.postgres_url_masked());

        let pool = PgPoolOptions::new()
            .max_connections(config.pg_max_connections)
            .min_connections(config.pg_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.pg_acquire_timeout_secs))
            .connect(&config.postgres_url)
            .await
            .map_err(|e| DbError::Connection(format!("PostgreSQL: {}", e)))?;

        info!("Connected to PostgreSQL");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations
    pub async fn migrate(&self) -> DbResult<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))?;
        info!("Migrations complete");
        Ok(())
    }
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn begin(&self, user_id: Uuid) -> DbResult<Box<dyn WalletTransaction>> {
        let mut tx = self.pool.begin().await?;

        // Serializes every mutation for this user until commit/rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;

        debug!(user_id = %user_id, "Acquired per-user wallet lock");

        Ok(Box::new(PgWalletTransaction { user_id, tx }))
    }

    async fn list_by_user(&self, user_id: Uuid) -> DbResult<Vec<WalletRecord>> {
        let wallets = sqlx::query_as::<_, WalletRecord>(
            r#"
            SELECT id, user_id, address, address_normalized, chain_namespace, label,
                   is_primary, created_at, updated_at
            FROM wallet_records
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(wallets)
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Open PostgreSQL transaction holding the per-user advisory lock
struct PgWalletTransaction {
    user_id: Uuid,
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl WalletTransaction for PgWalletTransaction {
    fn user_id(&self) -> Uuid {
        self.user_id
    }

    async fn list(&mut self) -> DbResult<Vec<WalletRecord>> {
        let wallets = sqlx::query_as::<_, WalletRecord>(
            r#"
            SELECT id, user_id, address, address_normalized, chain_namespace, label,
                   is_primary, created_at, updated_at
            FROM wallet_records
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(self.user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(wallets)
    }

    async fn insert(&mut self, record: NewWalletRecord) -> DbResult<WalletRecord> {
        let wallet = sqlx::query_as::<_, WalletRecord>(
            r#"
            INSERT INTO wallet_records
                (user_id, address, address_normalized, chain_namespace, label, is_primary)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, address, address_normalized, chain_namespace, label,
                      is_primary, created_at, updated_at
            "#,
        )
        .bind(self.user_id)
        .bind(&record.address)
        .bind(&record.address_normalized)
        .bind(&record.chain_namespace)
        .bind(&record.label)
        .bind(record.is_primary)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(wallet)
    }

    async fn set_primary(
        &mut self,
        wallet_id: i64,
        is_primary: bool,
        at: DateTime<Utc>,
    ) -> DbResult<WalletRecord> {
        sqlx::query_as::<_, WalletRecord>(
            r#"
            UPDATE wallet_records
            SET is_primary = $3, updated_at = $4
            WHERE user_id = $1 AND id = $2
            RETURNING id, user_id, address, address_normalized, chain_namespace, label,
                      is_primary, created_at, updated_at
            "#,
        )
        .bind(self.user_id)
        .bind(wallet_id)
        .bind(is_primary)
        .bind(at)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("wallet {}", wallet_id)))
    }

    async fn delete(&mut self, wallet_ids: &[i64]) -> DbResult<u64> {
        if wallet_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM wallet_records WHERE user_id = $1 AND id = ANY($2)")
            .bind(self.user_id)
            .bind(wallet_ids.to_vec())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
