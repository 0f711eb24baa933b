//! Authentication types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller identity attached to the request by [`AuthMiddleware`](crate::AuthMiddleware)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// User ID (token subject)
    pub user_id: Uuid,
    /// JWT ID of the presented token
    pub token_id: String,
    /// Token expiry
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedUser {
    /// Whether this caller may act on behalf of `user_id`
    pub fn owns(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Not before (Unix timestamp)
    pub nbf: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// JWT ID (unique identifier)
    pub jti: String,
}

/// Freshly minted access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}
