//! Wallet registry DTOs
//!
//! Shape checks (lengths, ranges) happen here. Address and namespace format
//! rules are applied by the registry service itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;
use wallet_registry_core::WalletRecord;

// =============================================================================
// Requests
// =============================================================================

/// Register an address on a chain namespace
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AddWalletRequest {
    pub user_id: Uuid,
    /// Address as displayed by the wallet
    #[validate(length(min = 1, max = 128, message = "must be 1 to 128 characters"))]
    pub address: String,
    /// CAIP-2 chain id, e.g. `eip155:1`
    #[validate(length(min = 1, max = 41, message = "must be 1 to 41 characters"))]
    pub chain_namespace: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Remove a single wallet row
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RemoveWalletRequest {
    pub user_id: Uuid,
    #[validate(range(min = 1, message = "must be a positive id"))]
    pub wallet_id: i64,
}

/// Remove an address on every namespace it is registered on
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RemoveAddressRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 128, message = "must be 1 to 128 characters"))]
    pub address: String,
}

/// Make an address the primary wallet
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SetPrimaryWalletRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 128, message = "must be 1 to 128 characters"))]
    pub address: String,
    /// Namespace to prefer when the address is registered on several.
    /// Unknown values fall back to the default ordering.
    #[serde(default)]
    #[validate(length(max = 41, message = "must be at most 41 characters"))]
    pub preferred_namespace: Option<String>,
}

/// List query
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListWalletsQuery {
    /// Owner of the wallets, must match the token subject
    pub user_id: Uuid,
}

// =============================================================================
// Responses
// =============================================================================

/// A registered wallet
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub id: i64,
    pub user_id: Uuid,
    pub address: String,
    /// Lowercased form used for comparisons
    pub address_normalized: String,
    pub chain_namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WalletRecord> for WalletResponse {
    fn from(record: WalletRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            address: record.address,
            address_normalized: record.address_normalized,
            chain_namespace: record.chain_namespace,
            label: record.label,
            is_primary: record.is_primary,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Result of `removeAddress`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RemoveAddressResponse {
    pub ok: bool,
    /// Number of wallet rows deleted
    pub removed_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fields_rejected() {
        let body = r#"{"user_id":"6f1c2b1e-6a43-4a53-9d8d-0d0c3c9b7f11","wallet_id":1,"force":true}"#;
        assert!(serde_json::from_str::<RemoveWalletRequest>(body).is_err());
    }

    #[test]
    fn test_request_validation() {
        let req = RemoveWalletRequest {
            user_id: Uuid::new_v4(),
            wallet_id: 0,
        };
        assert!(req.validate().is_err());

        let req = AddWalletRequest {
            user_id: Uuid::new_v4(),
            address: "0xabc".to_string(),
            chain_namespace: String::new(),
            label: None,
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("chain_namespace"));
    }
}
