//! Database error types

use thiserror::Error;

/// Name of the partial unique index that allows one primary row per user.
pub const PRIMARY_INDEX: &str = "wallet_records_one_primary_per_user";

/// Database operation errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(#[source] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Another transaction already holds the primary flag for this user.
    #[error("Primary conflict: {0}")]
    PrimaryConflict(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Serialization failure, deadlock or lock timeout; the transaction was
    /// rolled back and may be retried.
    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl DbError {
    /// Whether retrying the whole transaction may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::PrimaryConflict(_) | Self::Transaction(_) | Self::Timeout(_)
        )
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match classify(&err) {
            Some(mapped) => mapped,
            None => Self::Query(err),
        }
    }
}

fn classify(err: &sqlx::Error) -> Option<DbError> {
    match err {
        sqlx::Error::RowNotFound => Some(DbError::NotFound("row not found".to_string())),
        sqlx::Error::PoolTimedOut => Some(DbError::Timeout(
            "connection pool acquire timed out".to_string(),
        )),
        sqlx::Error::Io(e) => Some(DbError::Transaction(format!("I/O error: {}", e))),
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") if db_err.constraint() == Some(PRIMARY_INDEX) => {
                    Some(DbError::PrimaryConflict(message))
                }
                Some("23505") => Some(DbError::Duplicate(message)),
                // check_violation, not_null_violation, foreign_key_violation
                Some("23514" | "23502" | "23503") => Some(DbError::Constraint(message)),
                // serialization_failure, deadlock_detected, lock_not_available
                Some("40001" | "40P01" | "55P03") => Some(DbError::Transaction(message)),
                // query_canceled (statement_timeout)
                Some("57014") => Some(DbError::Timeout(message)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
