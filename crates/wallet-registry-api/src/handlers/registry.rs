//! Wallet Registry Handlers
//!
//! Every handler checks that the request `user_id` belongs to the caller
//! before touching the registry.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use wallet_registry_core::normalize::normalize_namespace;

use crate::dto::{
    AddWalletRequest, ListWalletsQuery, OkResponse, RemoveAddressRequest, RemoveAddressResponse,
    RemoveWalletRequest, SetPrimaryWalletRequest, WalletResponse,
};
use crate::error::{ApiResult, ErrorResponse};
use crate::extractors::{Caller, ValidatedJson, ValidatedQuery};
use crate::state::AppState;

/// Register a wallet
///
/// The user's first wallet becomes primary.
#[utoipa::path(
    post,
    path = "/api/v1/registry/addWallet",
    tag = "Registry",
    request_body = AddWalletRequest,
    responses(
        (status = 201, description = "Wallet registered", body = WalletResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 409, description = "Address already registered on this namespace", body = ErrorResponse),
        (status = 503, description = "Store busy, retry later", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn add_wallet(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<AddWalletRequest>,
) -> ApiResult<(StatusCode, Json<WalletResponse>)> {
    caller.authorize(req.user_id)?;

    let wallet = state
        .registry
        .add_wallet(
            req.user_id,
            &req.address,
            &req.chain_namespace,
            req.label.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(wallet.into())))
}

/// Remove a wallet
///
/// Removing the primary wallet promotes the oldest remaining one.
#[utoipa::path(
    post,
    path = "/api/v1/registry/removeWallet",
    tag = "Registry",
    request_body = RemoveWalletRequest,
    responses(
        (status = 200, description = "Wallet removed", body = OkResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Wallet not found", body = ErrorResponse),
        (status = 503, description = "Store busy, retry later", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn remove_wallet(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RemoveWalletRequest>,
) -> ApiResult<Json<OkResponse>> {
    caller.authorize(req.user_id)?;

    state
        .registry
        .remove_wallet(req.user_id, req.wallet_id)
        .await?;

    Ok(Json(OkResponse::ok()))
}

/// Remove an address on all namespaces
#[utoipa::path(
    post,
    path = "/api/v1/registry/removeAddress",
    tag = "Registry",
    request_body = RemoveAddressRequest,
    responses(
        (status = 200, description = "Address removed", body = RemoveAddressResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Address not registered", body = ErrorResponse),
        (status = 503, description = "Store busy, retry later", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn remove_address(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RemoveAddressRequest>,
) -> ApiResult<Json<RemoveAddressResponse>> {
    caller.authorize(req.user_id)?;

    let outcome = state
        .registry
        .remove_address(req.user_id, &req.address)
        .await?;

    Ok(Json(RemoveAddressResponse {
        ok: true,
        removed_count: outcome.removed,
    }))
}

/// Set the primary wallet
///
/// `preferred_namespace` picks the row when the address is registered on
/// several namespaces. A well-formed but unknown namespace is ignored.
#[utoipa::path(
    post,
    path = "/api/v1/registry/setPrimaryWallet",
    tag = "Registry",
    request_body = SetPrimaryWalletRequest,
    responses(
        (status = 200, description = "Primary wallet set", body = WalletResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Address not registered", body = ErrorResponse),
        (status = 503, description = "Store busy, retry later", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn set_primary_wallet(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SetPrimaryWalletRequest>,
) -> ApiResult<Json<WalletResponse>> {
    caller.authorize(req.user_id)?;

    let preferred_namespace = req
        .preferred_namespace
        .as_deref()
        .map(str::trim)
        .filter(|ns| !ns.is_empty());
    if let Some(ns) = preferred_namespace {
        normalize_namespace(ns)?;
    }

    let wallet = state
        .registry
        .set_primary_wallet(req.user_id, &req.address, preferred_namespace)
        .await?;

    Ok(Json(wallet.into()))
}

/// List wallets
#[utoipa::path(
    get,
    path = "/api/v1/registry/listWallets",
    tag = "Registry",
    params(ListWalletsQuery),
    responses(
        (status = 200, description = "Wallets ordered by creation", body = Vec<WalletResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list_wallets(
    caller: Caller,
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ListWalletsQuery>,
) -> ApiResult<Json<Vec<WalletResponse>>> {
    caller.authorize(query.user_id)?;

    let wallets = state.registry.list_wallets(query.user_id).await?;

    Ok(Json(wallets.into_iter().map(WalletResponse::from).collect()))
}
