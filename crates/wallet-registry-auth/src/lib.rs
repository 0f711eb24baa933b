//! Wallet Registry Authentication Layer
//!
//! Bearer JWT authentication for the registry API. The token subject is the
//! caller's `user_id`; handlers compare it against the `user_id` in each
//! request and reject mismatches.
//!
//! # Flow
//!
//! ```text
//! Request → AuthMiddleware → Handler (checks subject == user_id)
//!                │
//!                ▼
//!           JwtService ─→ AuthenticatedUser (request extension)
//! ```

pub mod config;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod types;

pub use config::JwtConfig;
pub use error::{AuthError, AuthResult, ErrorResponse};
pub use jwt::JwtService;
pub use middleware::{auth_error_response, AuthLayer, AuthMiddleware};
pub use types::{AuthenticatedUser, TokenClaims};

use std::sync::Arc;

/// Authentication service handed to the API layer
#[derive(Clone)]
pub struct AuthService {
    pub jwt: Arc<JwtService>,
    config: JwtConfig,
}

impl AuthService {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            jwt: Arc::new(JwtService::new(config.clone())),
            config,
        }
    }

    /// Get the config reference
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Create an auth layer for Axum router
    pub fn layer(&self) -> AuthLayer {
        AuthLayer::new(self.jwt.clone())
    }
}
