//! OpenAPI Documentation
//!
//! OpenAPI 3.0 document for the registry API, served as JSON.

use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

use crate::dto;
use crate::error::ErrorResponse;
use crate::handlers;

/// Wallet Registry API Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wallet Registry API",
        description = "Registers users' blockchain addresses and maintains exactly one primary wallet per user."
    ),
    paths(
        // Health
        handlers::health::health_check,
        handlers::health::readiness_check,
        // Registry
        handlers::registry::add_wallet,
        handlers::registry::remove_wallet,
        handlers::registry::remove_address,
        handlers::registry::set_primary_wallet,
        handlers::registry::list_wallets,
    ),
    components(
        schemas(
            ErrorResponse,
            handlers::health::HealthResponse,
            handlers::health::ReadinessResponse,
            handlers::health::ComponentStatus,
            dto::OkResponse,
            dto::AddWalletRequest,
            dto::RemoveWalletRequest,
            dto::RemoveAddressRequest,
            dto::RemoveAddressResponse,
            dto::SetPrimaryWalletRequest,
            dto::WalletResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service health and status"),
        (name = "Registry", description = "Wallet registration and primary wallet management")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security scheme modifier
pub struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
