//! API Routes

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::state::AppState;

/// Registry routes, mounted under `/api/v1/registry`
pub fn registry_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/addWallet", post(handlers::registry::add_wallet))
        .route("/removeWallet", post(handlers::registry::remove_wallet))
        .route("/removeAddress", post(handlers::registry::remove_address))
        .route("/setPrimaryWallet", post(handlers::registry::set_primary_wallet))
        .route("/listWallets", get(handlers::registry::list_wallets))
}
