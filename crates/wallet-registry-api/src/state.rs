//! Application state shared across handlers

use std::sync::Arc;
use wallet_registry_auth::AuthService;
use wallet_registry_core::WalletMutationService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Wallet registry service
    pub registry: Arc<WalletMutationService>,
    /// Authentication service
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Create a new application state
    pub fn new(registry: Arc<WalletMutationService>, auth: Arc<AuthService>) -> Self {
        Self { registry, auth }
    }
}
