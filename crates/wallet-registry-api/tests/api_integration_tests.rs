//! API Integration Tests
//!
//! Full request/response cycle through the router, backed by the in-memory
//! wallet store and real JWTs.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;
use wallet_registry_api::{create_test_router, AppState};
use wallet_registry_auth::{AuthService, JwtConfig};
use wallet_registry_core::{RegistryConfig, RetryConfig, WalletMutationService};
use wallet_registry_db::MemoryWalletStore;

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    store: MemoryWalletStore,
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryWalletStore::new();
        let config = RegistryConfig {
            retry: RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
            },
            verify_invariants: true,
            ..RegistryConfig::default()
        };
        let registry = Arc::new(WalletMutationService::new(Arc::new(store.clone()), config));
        let auth = Arc::new(AuthService::new(JwtConfig::development()));
        let state = Arc::new(AppState::new(registry, auth));

        Self {
            router: create_test_router(state.clone()),
            state,
            store,
        }
    }

    fn token_for(&self, user_id: Uuid) -> String {
        self.state.auth.jwt.issue_access_token(user_id).unwrap().token
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, json) = self.request_full(method, uri, token, body).await;
        (status, json)
    }

    async fn request_full(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = match body {
            Some(json_body) => Body::from(serde_json::to_vec(&json_body).unwrap()),
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!(null));

        (status, headers, json)
    }

    async fn add_wallet(&self, user_id: Uuid, address: &str, namespace: &str) -> Value {
        let token = self.token_for(user_id);
        let (status, json) = self
            .request(
                "POST",
                "/api/v1/registry/addWallet",
                Some(&token),
                Some(json!({
                    "user_id": user_id,
                    "address": address,
                    "chain_namespace": namespace,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "add failed: {}", json);
        json
    }

    async fn list(&self, user_id: Uuid) -> Vec<Value> {
        let token = self.token_for(user_id);
        let (status, json) = self
            .request(
                "GET",
                &format!("/api/v1/registry/listWallets?user_id={}", user_id),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        json.as_array().unwrap().clone()
    }
}

fn primaries(wallets: &[Value]) -> Vec<&Value> {
    wallets
        .iter()
        .filter(|w| w["is_primary"] == json!(true))
        .collect()
}

// =============================================================================
// Authentication
// =============================================================================

mod authentication {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_rejected() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();

        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/addWallet",
                None,
                Some(json!({
                    "user_id": user_id,
                    "address": "0xabc",
                    "chain_namespace": "eip155:1",
                })),
            )
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], -1010);
        assert_eq!(app.store.wallet_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();

        let (status, json) = app
            .request(
                "GET",
                &format!("/api/v1/registry/listWallets?user_id={}", user_id),
                Some("not-a-jwt"),
                None,
            )
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], -1010);
    }

    #[tokio::test]
    async fn test_other_users_registry_rejected() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        app.add_wallet(owner, "0xabc", "eip155:1").await;

        let token = app.token_for(intruder);
        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/removeAddress",
                Some(&token),
                Some(json!({ "user_id": owner, "address": "0xabc" })),
            )
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], -1010);
        assert_eq!(app.list(owner).await.len(), 1);
    }

    #[tokio::test]
    async fn test_token_reusable_until_expiry() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);
        let uri = format!("/api/v1/registry/listWallets?user_id={}", user_id);

        for _ in 0..2 {
            let (status, json) = app.request("GET", &uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json, json!([]));
        }
    }
}

// =============================================================================
// Registry endpoints
// =============================================================================

mod registry {
    use super::*;

    #[tokio::test]
    async fn test_first_wallet_is_primary() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();

        let first = app.add_wallet(user_id, "0xAbC", "eip155:1").await;
        assert_eq!(first["is_primary"], true);
        assert_eq!(first["address"], "0xAbC");
        assert_eq!(first["address_normalized"], "0xabc");

        let second = app.add_wallet(user_id, "0xdef", "eip155:1").await;
        assert_eq!(second["is_primary"], false);
    }

    #[tokio::test]
    async fn test_duplicate_wallet_conflict() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);
        app.add_wallet(user_id, "0xabc", "eip155:1").await;

        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/addWallet",
                Some(&token),
                Some(json!({
                    "user_id": user_id,
                    "address": "0xABC",
                    "chain_namespace": "eip155:1",
                })),
            )
            .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], -4010);
        assert_eq!(app.list(user_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_ordered_by_creation() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        app.add_wallet(user_id, "0xaaa", "eip155:1").await;
        app.add_wallet(user_id, "0xbbb", "eip155:1").await;
        app.add_wallet(user_id, "0xaaa", "eip155:137").await;

        let wallets = app.list(user_id).await;
        let addresses: Vec<_> = wallets
            .iter()
            .map(|w| w["address"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(addresses, vec!["0xaaa", "0xbbb", "0xaaa"]);
        assert_eq!(primaries(&wallets).len(), 1);
    }

    #[tokio::test]
    async fn test_remove_primary_promotes_oldest() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);
        let first = app.add_wallet(user_id, "0xaaa", "eip155:1").await;
        let second = app.add_wallet(user_id, "0xbbb", "eip155:1").await;
        app.add_wallet(user_id, "0xccc", "eip155:1").await;

        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/removeWallet",
                Some(&token),
                Some(json!({ "user_id": user_id, "wallet_id": first["id"] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "ok": true }));

        let wallets = app.list(user_id).await;
        let primary = primaries(&wallets);
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0]["id"], second["id"]);
    }

    #[tokio::test]
    async fn test_remove_unknown_wallet_not_found() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);

        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/removeWallet",
                Some(&token),
                Some(json!({ "user_id": user_id, "wallet_id": 999 })),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], -4001);
    }

    #[tokio::test]
    async fn test_remove_address_counts_rows() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);
        app.add_wallet(user_id, "0xaaa", "eip155:1").await;
        app.add_wallet(user_id, "0xaaa", "eip155:137").await;
        let survivor = app.add_wallet(user_id, "0xbbb", "eip155:1").await;

        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/removeAddress",
                Some(&token),
                Some(json!({ "user_id": user_id, "address": "0xAAA" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "ok": true, "removed_count": 2 }));

        let wallets = app.list(user_id).await;
        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0]["id"], survivor["id"]);
        assert_eq!(wallets[0]["is_primary"], true);
    }

    #[tokio::test]
    async fn test_set_primary_with_preferred_namespace() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);
        app.add_wallet(user_id, "0xaaa", "eip155:1").await;
        app.add_wallet(user_id, "0xbbb", "eip155:1").await;
        let polygon = app.add_wallet(user_id, "0xbbb", "eip155:137").await;

        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/setPrimaryWallet",
                Some(&token),
                Some(json!({
                    "user_id": user_id,
                    "address": "0xbbb",
                    "preferred_namespace": "eip155:137",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], polygon["id"]);
        assert_eq!(json["is_primary"], true);

        let wallets = app.list(user_id).await;
        let primary = primaries(&wallets);
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0]["id"], polygon["id"]);
    }

    #[tokio::test]
    async fn test_set_primary_unknown_hint_falls_back() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);
        app.add_wallet(user_id, "0xaaa", "eip155:1").await;
        let mainnet = app.add_wallet(user_id, "0xbbb", "eip155:1").await;
        app.add_wallet(user_id, "0xbbb", "eip155:137").await;

        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/setPrimaryWallet",
                Some(&token),
                Some(json!({
                    "user_id": user_id,
                    "address": "0xbbb",
                    "preferred_namespace": "eip155:10",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], mainnet["id"]);
    }

    #[tokio::test]
    async fn test_set_primary_malformed_hint_rejected() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);
        app.add_wallet(user_id, "0xaaa", "eip155:1").await;

        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/setPrimaryWallet",
                Some(&token),
                Some(json!({
                    "user_id": user_id,
                    "address": "0xaaa",
                    "preferred_namespace": "not a namespace",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], -1102);
    }

    #[tokio::test]
    async fn test_set_primary_unknown_address_not_found() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);
        app.add_wallet(user_id, "0xaaa", "eip155:1").await;

        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/setPrimaryWallet",
                Some(&token),
                Some(json!({ "user_id": user_id, "address": "0xfff" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], -4001);
    }
}

// =============================================================================
// Request validation
// =============================================================================

mod validation {
    use super::*;

    #[tokio::test]
    async fn test_empty_address_rejected() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);

        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/addWallet",
                Some(&token),
                Some(json!({
                    "user_id": user_id,
                    "address": "",
                    "chain_namespace": "eip155:1",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], -1102);
    }

    #[tokio::test]
    async fn test_non_hex_evm_address_rejected() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);

        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/addWallet",
                Some(&token),
                Some(json!({
                    "user_id": user_id,
                    "address": "0xZZZ",
                    "chain_namespace": "eip155:1",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], -1102);
        assert_eq!(app.store.wallet_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_fields_rejected() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);

        let (status, json) = app
            .request(
                "POST",
                "/api/v1/registry/addWallet",
                Some(&token),
                Some(json!({
                    "user_id": user_id,
                    "address": "0xabc",
                    "chain_namespace": "eip155:1",
                    "is_primary": true,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], -1100);
    }

    #[tokio::test]
    async fn test_missing_query_user_id_rejected() {
        let app = TestApp::new();
        let token = app.token_for(Uuid::new_v4());

        let (status, json) = app
            .request("GET", "/api/v1/registry/listWallets", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], -1100);
    }
}

// =============================================================================
// Store failures
// =============================================================================

mod store_failures {
    use super::*;

    #[tokio::test]
    async fn test_transient_failure_recovered_by_retry() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        app.store.fail_next_commits(2);

        let wallet = app.add_wallet(user_id, "0xabc", "eip155:1").await;
        assert_eq!(wallet["is_primary"], true);
        assert_eq!(app.list(user_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_503() {
        let app = TestApp::new();
        let user_id = Uuid::new_v4();
        let token = app.token_for(user_id);
        app.store.fail_next_commits(3);

        let (status, headers, json) = app
            .request_full(
                "POST",
                "/api/v1/registry/addWallet",
                Some(&token),
                Some(json!({
                    "user_id": user_id,
                    "address": "0xabc",
                    "chain_namespace": "eip155:1",
                })),
            )
            .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["code"], -5001);
        assert_eq!(headers.get(header::RETRY_AFTER).unwrap(), "1");
        assert_eq!(app.store.wallet_count(), 0);
    }
}

// =============================================================================
// Public endpoints
// =============================================================================

mod public_endpoints {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let app = TestApp::new();
        let (status, json) = app.request("GET", "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_readiness_check() {
        let app = TestApp::new();
        let (status, json) = app.request("GET", "/ready", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ready");
        assert_eq!(json["store"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let app = TestApp::new();
        let (status, json) = app
            .request("GET", "/api-docs/openapi.json", None, None)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["info"]["title"], "Wallet Registry API");
        assert!(json["paths"]["/api/v1/registry/setPrimaryWallet"].is_object());
    }
}
