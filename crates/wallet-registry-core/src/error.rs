//! Registry error types

use thiserror::Error;
use uuid::Uuid;
use wallet_registry_db::DbError;

use crate::verifier::InvariantViolation;

/// Errors returned by registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A transaction would have committed a state that breaks the primary
    /// wallet rules. It was rolled back.
    #[error("Invariant violation for user {user_id}: {violation}")]
    InvariantViolation {
        user_id: Uuid,
        violation: InvariantViolation,
    },

    /// Contention or timeout in the store. Safe to retry.
    #[error("Transient store error: {0}")]
    TransientStore(String),

    #[error("Store error: {0}")]
    Store(#[source] DbError),
}

impl RegistryError {
    /// Whether the service retries this error internally
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }

    /// Short label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvariantViolation { .. } => "invariant_violation",
            Self::TransientStore(_) => "transient_store",
            Self::Store(_) => "store",
        }
    }
}

impl From<DbError> for RegistryError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => Self::NotFound(msg),
            DbError::Duplicate(msg) => Self::Conflict(msg),
            err if err.is_transient() => Self::TransientStore(err.to_string()),
            err => Self::Store(err),
        }
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_mapping() {
        assert!(matches!(
            RegistryError::from(DbError::Duplicate("x".into())),
            RegistryError::Conflict(_)
        ));
        assert!(matches!(
            RegistryError::from(DbError::NotFound("x".into())),
            RegistryError::NotFound(_)
        ));
        assert!(matches!(
            RegistryError::from(DbError::Connection("refused".into())),
            RegistryError::Store(_)
        ));
    }

    #[test]
    fn test_transient_db_errors_are_retryable() {
        for err in [
            DbError::Transaction("deadlock detected".into()),
            DbError::Timeout("pool".into()),
            DbError::PrimaryConflict("race".into()),
        ] {
            let mapped = RegistryError::from(err);
            assert!(mapped.is_retryable());
            assert_eq!(mapped.kind(), "transient_store");
        }
    }

    #[test]
    fn test_invariant_violation_not_retryable() {
        let err = RegistryError::InvariantViolation {
            user_id: Uuid::new_v4(),
            violation: InvariantViolation::MissingPrimary { wallet_count: 2 },
        };
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "invariant_violation");
    }
}
