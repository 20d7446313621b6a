//! Integration tests for API routes.
//!
//! Uses `tower::ServiceExt` to test Axum routes without a real HTTP server.
//! Campaign and credential state lives in the in-memory stores; the provider is
//! a fake that records every send, so no database or network is needed.
//!
//! ```bash
//! cargo test -p herald-api --test integration -- --nocapture
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use herald_api::middleware::auth::encode_jwt;
use herald_api::routes::create_router;
use herald_api::state::AppState;
use herald_common::config::AppConfig;
use herald_common::types::ProviderCredential;
use herald_engine::campaign::CampaignService;
use herald_engine::credentials::{ClientResolver, MemoryCredentialStore};
use herald_engine::dispatch::{DispatchEngine, DispatchWorker};
use herald_engine::store::MemoryCampaignStore;
use herald_provider::{MessageProvider, ProviderConnector, ProviderError, SentMessage};

const SID: &str = "AC0123456789abcdef0123456789abcdef";
const TOKEN: &str = "0123456789abcdef0123456789abcdef";

// ============================================================
// Helpers
// ============================================================

/// Records every recipient; numbers ending in `9` are rejected.
#[derive(Default)]
struct RecordingProvider {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl MessageProvider for RecordingProvider {
    async fn send(&self, _from: &str, _body: &str, to: &str) -> Result<SentMessage, ProviderError> {
        self.sent.lock().unwrap().push(to.to_string());
        if to.ends_with('9') {
            return Err(ProviderError::Rejected {
                status: 400,
                code: Some(21211),
                message: format!("The 'To' number {} is not a valid phone number.", to),
            });
        }
        Ok(SentMessage {
            sid: Some(format!("SM{}", to.trim_start_matches('+'))),
        })
    }
}

struct FixedConnector(Arc<RecordingProvider>);

impl ProviderConnector for FixedConnector {
    fn connect(&self, _credential: &ProviderCredential) -> Arc<dyn MessageProvider> {
        self.0.clone()
    }
}

/// Create a test AppConfig with a specific JWT secret.
fn test_config() -> AppConfig {
    AppConfig {
        database_url: "unused".to_string(),
        db_max_connections: 5,
        jwt_secret: "test-jwt-secret-for-integration-tests".to_string(),
        jwt_expiry_hours: 24,
        listen_addr: "127.0.0.1:0".to_string(),
        provider_api_base: "http://unused".to_string(),
        dispatch_interval_ms: 0,
        campaign_list_limit: 10,
    }
}

struct TestApp {
    state: AppState,
    provider: Arc<RecordingProvider>,
}

impl TestApp {
    fn new() -> Self {
        let config = test_config();
        let provider = Arc::new(RecordingProvider::default());
        let store = Arc::new(MemoryCampaignStore::new());
        let resolver = ClientResolver::new(
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(FixedConnector(provider.clone())),
        );
        let engine = Arc::new(DispatchEngine::new(store.clone(), config.dispatch_interval()));
        let campaigns = CampaignService::new(store, resolver.clone(), DispatchWorker::new(engine));

        Self {
            state: AppState::new(campaigns, resolver, config),
            provider,
        }
    }

    fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    fn token_for(&self, tenant_id: Uuid) -> String {
        let config = &self.state.config;
        encode_jwt(tenant_id, &config.jwt_secret, config.jwt_expiry_hours).unwrap()
    }

    /// New tenant with valid provider credentials already stored.
    async fn configured_tenant(&self) -> (Uuid, String) {
        let tenant_id = Uuid::new_v4();
        self.state
            .credentials
            .update(tenant_id, ProviderCredential::new(SID, TOKEN))
            .await
            .unwrap();
        (tenant_id, self.token_for(tenant_id))
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, json)
    }

    /// Poll the status endpoint until the campaign reaches a terminal status.
    async fn wait_for_terminal(&self, token: &str, campaign_id: i64) -> Value {
        for _ in 0..200 {
            let (status, _, json) = self
                .request(
                    "GET",
                    &format!("/api/campaigns/{}/status", campaign_id),
                    Some(token),
                    None,
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            if json["status"] == "completed" || json["status"] == "error" {
                return json;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("campaign {} never reached a terminal status", campaign_id);
    }
}

fn submission(file_name: &str, content: &str) -> Value {
    json!({
        "name": "Spring promo",
        "body": "20% off this weekend",
        "from": "+15550000000",
        "file_name": file_name,
        "content": content,
    })
}

// ============================================================
// Route Tests
// ============================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();
    let (status, _, json) = app.request("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "herald-api");
}

#[tokio::test]
async fn test_campaigns_require_auth() {
    let app = TestApp::new();

    let (status, _, _) = app.request("GET", "/api/campaigns", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, json) = app
        .request("GET", "/api/campaigns", Some("invalid.jwt.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_submit_and_poll_to_completion() {
    let app = TestApp::new();
    let (_, token) = app.configured_tenant().await;

    let (status, _, json) = app
        .request(
            "POST",
            "/api/campaigns",
            Some(&token),
            Some(submission("list.csv", "+15551110001\n+15551110009\n+15551110002\n")),
        )
        .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["campaign"]["status"], "pending");
    assert_eq!(json["campaign"]["total_recipients"], 3);
    assert_eq!(json["stats"]["segments"], 1);
    let campaign_id = json["campaign"]["id"].as_i64().unwrap();

    let progress = app.wait_for_terminal(&token, campaign_id).await;
    assert_eq!(progress["status"], "completed");
    assert_eq!(progress["total"], 3);
    assert_eq!(progress["successful"], 2);
    assert_eq!(progress["failed"], 1);

    assert_eq!(
        *app.provider.sent.lock().unwrap(),
        vec!["+15551110001", "+15551110009", "+15551110002"]
    );

    let (status, _, detail) = app
        .request(
            "GET",
            &format!("/api/campaigns/{}", campaign_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let messages = detail["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    let failed: Vec<&Value> = messages.iter().filter(|m| m["status"] == "failed").collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["recipient"], "+15551110009");
    assert!(failed[0]["message_sid"].is_null());
    assert!(failed[0]["error_detail"].as_str().unwrap().contains("21211"));
    assert!(detail["campaign"]["completed_at"].is_string());
}

#[tokio::test]
async fn test_status_is_never_cached() {
    let app = TestApp::new();
    let (_, token) = app.configured_tenant().await;

    let (_, _, json) = app
        .request(
            "POST",
            "/api/campaigns",
            Some(&token),
            Some(submission("numbers.txt", "+15552220001")),
        )
        .await;
    let campaign_id = json["campaign"]["id"].as_i64().unwrap();

    let (status, headers, _) = app
        .request(
            "GET",
            &format!("/api/campaigns/{}/status", campaign_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
}

#[tokio::test]
async fn test_empty_recipient_file_rejected() {
    let app = TestApp::new();
    let (_, token) = app.configured_tenant().await;

    let (status, _, json) = app
        .request(
            "POST",
            "/api/campaigns",
            Some(&token),
            Some(submission("empty.csv", " \n , \n")),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("No valid phone numbers"));
    assert!(app.provider.sent.lock().unwrap().is_empty());

    let (_, _, list) = app.request("GET", "/api/campaigns", Some(&token), None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_without_credentials_is_precondition_failed() {
    let app = TestApp::new();
    let token = app.token_for(Uuid::new_v4());

    let (status, _, json) = app
        .request(
            "POST",
            "/api/campaigns",
            Some(&token),
            Some(submission("list.csv", "+15553330001")),
        )
        .await;

    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert!(json["error"].as_str().unwrap().contains("credentials"));

    let (_, _, list) = app.request("GET", "/api/campaigns", Some(&token), None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_other_tenant_campaign_is_not_found() {
    let app = TestApp::new();
    let (_, owner_token) = app.configured_tenant().await;
    let stranger_token = app.token_for(Uuid::new_v4());

    let (_, _, json) = app
        .request(
            "POST",
            "/api/campaigns",
            Some(&owner_token),
            Some(submission("list.csv", "+15554440001")),
        )
        .await;
    let campaign_id = json["campaign"]["id"].as_i64().unwrap();

    for uri in [
        format!("/api/campaigns/{}", campaign_id),
        format!("/api/campaigns/{}/status", campaign_id),
    ] {
        let (status, _, _) = app.request("GET", &uri, Some(&stranger_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }

    let (status, _, _) = app
        .request("GET", "/api/campaigns/999999/status", Some(&owner_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_campaigns_most_recent_first() {
    let app = TestApp::new();
    let (_, token) = app.configured_tenant().await;

    for name in ["first", "second"] {
        let mut body = submission("list.csv", "+15555550001");
        body["name"] = json!(name);
        let (status, _, _) = app
            .request("POST", "/api/campaigns", Some(&token), Some(body))
            .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    let (status, _, list) = app.request("GET", "/api/campaigns", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["second", "first"]);
}

#[tokio::test]
async fn test_credential_settings_roundtrip() {
    let app = TestApp::new();
    let token = app.token_for(Uuid::new_v4());

    let (status, _, json) = app
        .request("GET", "/api/settings/credentials", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["configured"], false);

    let (status, _, _) = app
        .request(
            "PUT",
            "/api/settings/credentials",
            Some(&token),
            Some(json!({ "account_sid": "not-a-sid", "auth_token": TOKEN })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, json) = app
        .request(
            "PUT",
            "/api/settings/credentials",
            Some(&token),
            Some(json!({ "account_sid": SID, "auth_token": TOKEN })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["configured"], true);

    let (status, _, json) = app
        .request("GET", "/api/settings/credentials", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["configured"], true);
    let raw = json.to_string();
    assert!(!raw.contains(TOKEN));
    assert!(!raw.contains(SID));
    assert!(json["auth_token"].as_str().unwrap().ends_with(&TOKEN[TOKEN.len() - 4..]));
}
