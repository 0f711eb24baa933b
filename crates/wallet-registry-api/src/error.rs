//! API error handling
//!
//! Every failure is returned as a `{code, msg}` JSON body with a numeric
//! error code and a matching HTTP status.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use wallet_registry_auth::AuthError;
use wallet_registry_core::RegistryError;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error with numeric error codes
#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Authentication Errors (-1000 to -1099)
    // =========================================================================
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // =========================================================================
    // Request Errors (-1100 to -1199)
    // =========================================================================
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    // =========================================================================
    // Registry Errors (-4000 to -4099)
    // =========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // =========================================================================
    // Internal Errors (-5000 to -5199)
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service temporarily unavailable, retry later")]
    ServiceUnavailable,

    #[error("Database error")]
    DatabaseError,

    #[error("Primary wallet invariant violated, change rolled back")]
    InvariantViolation,
}

impl ApiError {
    /// Get the numeric error code
    pub fn error_code(&self) -> i32 {
        match self {
            Self::Unauthorized(_) => -1010,
            Self::BadRequest(_) => -1100,
            Self::ValidationError(_) => -1102,
            Self::NotFound(_) => -4001,
            Self::Conflict(_) => -4010,
            Self::Internal(_) => -5000,
            Self::ServiceUnavailable => -5001,
            Self::DatabaseError => -5002,
            Self::InvariantViolation => -5100,
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) | Self::DatabaseError | Self::InvariantViolation => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: i32,
    /// Human-readable error message
    pub msg: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            code: err.error_code(),
            msg: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = ErrorResponse::from(&self);

        let mut response = (status, Json(error_response)).into_response();

        if let ApiError::ServiceUnavailable = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static("1"));
        }

        response
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(msg) => Self::NotFound(msg),
            RegistryError::Conflict(msg) => Self::Conflict(msg),
            RegistryError::Validation(msg) => Self::ValidationError(msg),
            RegistryError::Unauthorized(msg) => Self::Unauthorized(msg),
            RegistryError::InvariantViolation { user_id, violation } => {
                tracing::error!(
                    user_id = %user_id,
                    violation = %violation,
                    "Request failed on invariant violation"
                );
                Self::InvariantViolation
            }
            RegistryError::TransientStore(msg) => {
                tracing::warn!(error = %msg, "Registry store unavailable after retries");
                Self::ServiceUnavailable
            }
            RegistryError::Store(err) => {
                tracing::error!(error = ?err, "Database error");
                Self::DatabaseError
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(msg) => Self::Internal(msg),
            other => Self::Unauthorized(other.client_message()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(crate::extractors::format_validation_errors(&err))
    }
}
