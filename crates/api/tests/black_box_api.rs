use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde_json::json;

use usersync_access::{AllowedOrigins, OriginGate};
use usersync_api::app::services::AppServices;
use usersync_core::{NewUser, UserKey, UserPatch};
use usersync_infra::{InMemoryPrimaryStore, MirrorError, MirrorId, SecondaryMirror};

const ALLOWED: &str = "https://app.acme.com";
const DENIED: &str = "https://evil.example";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(AppServices::in_memory()).await
    }

    async fn spawn_with(services: AppServices) -> Self {
        // Same router as prod, in-memory stores, ephemeral port.
        let gate = OriginGate::new(AllowedOrigins::parse(ALLOWED));
        let app = usersync_api::app::router(gate, Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn users(&self) -> String {
        format!("{}/users", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Mirror that is always down.
struct OfflineMirror;

#[async_trait::async_trait]
impl SecondaryMirror for OfflineMirror {
    async fn create(&self, _user: &NewUser) -> Result<MirrorId, MirrorError> {
        Err(MirrorError::Connection("connection refused".to_string()))
    }

    async fn update(&self, _key: &UserKey, _patch: &UserPatch) -> Result<Option<MirrorId>, MirrorError> {
        Err(MirrorError::Connection("connection refused".to_string()))
    }
}

fn ann() -> serde_json::Value {
    json!({ "name": "Ann", "email": "ann@acme.com", "domain": "acme.com" })
}

#[tokio::test]
async fn health_is_not_origin_gated() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn denied_origin_gets_403_for_every_verb() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for method in [Method::GET, Method::POST, Method::PUT, Method::OPTIONS] {
        let res = client
            .request(method.clone(), srv.users())
            .header("Origin", DENIED)
            .json(&ann())
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{method} from denied origin");
        assert!(res.headers().get("access-control-allow-origin").is_none());
    }

    // No Origin header at all.
    let res = client.get(srv.users()).query(&[("domain", "acme.com")]).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn preflight_from_allowed_origin_echoes_origin() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .request(Method::OPTIONS, srv.users())
        .header("Origin", ALLOWED)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let headers = res.headers();
    assert_eq!(headers["access-control-allow-origin"], ALLOWED);
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert!(headers.get("access-control-allow-methods").is_some());
    assert!(headers.get("access-control-allow-headers").is_some());
}

#[tokio::test]
async fn end_to_end_register_list_modify() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Register
    let res = client
        .post(srv.users())
        .header("Origin", ALLOWED)
        .json(&ann())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], ALLOWED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["success"], true);
    assert!(created["primaryId"].is_string());
    assert!(created["secondaryId"].is_string());
    assert_eq!(created["message"], "User saved to primary store and mirror");

    // Same registration again: primary uniqueness rejects it.
    let res = client
        .post(srv.users())
        .header("Origin", ALLOWED)
        .json(&ann())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "duplicate_key");

    // List
    let res = client
        .get(srv.users())
        .header("Origin", ALLOWED)
        .query(&[("domain", "acme.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let listed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(listed["success"], true);
    let data = listed["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["name"], "Ann");
    assert_eq!(data[0]["email"], "ann@acme.com");
    assert_eq!(data[0]["domain"], "acme.com");
    assert_eq!(data[0]["id"], created["primaryId"]);

    // Modify
    let res = client
        .put(srv.users())
        .header("Origin", ALLOWED)
        .query(&[("email", "ann@acme.com"), ("domain", "acme.com")])
        .json(&json!({ "name": "Annie" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["primaryId"], created["primaryId"]);
    assert_eq!(updated["secondaryId"], created["secondaryId"]);

    let res = client
        .get(srv.users())
        .header("Origin", ALLOWED)
        .query(&[("domain", "acme.com")])
        .send()
        .await
        .unwrap();
    let listed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(listed["data"][0]["name"], "Annie");
}

#[tokio::test]
async fn localhost_origin_is_allowed_and_supplies_the_domain() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let origin = "http://localhost:3000";

    let res = client
        .post(srv.users())
        .header("Origin", origin)
        .json(&json!({ "name": "Dev", "email": "dev@local.test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], origin);

    // No domain parameter: derived from the origin hostname.
    let res = client.get(srv.users()).header("Origin", origin).send().await.unwrap();
    let listed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(listed["data"][0]["domain"], "localhost");
}

#[tokio::test]
async fn missing_fields_are_400_with_cors_headers() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.users())
        .header("Origin", ALLOWED)
        .json(&json!({ "name": "Ann" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.headers()["access-control-allow-origin"], ALLOWED);

    // Unparseable body behaves like an empty one.
    let res = client
        .put(srv.users())
        .header("Origin", ALLOWED)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_never_leaks_other_domains() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for (email, domain) in [("a@acme.com", "acme.com"), ("b@globex.io", "globex.io"), ("c@acme.com", "Acme.com")] {
        let res = client
            .post(srv.users())
            .header("Origin", ALLOWED)
            .json(&json!({ "name": "X", "email": email, "domain": domain }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client
        .get(srv.users())
        .header("Origin", ALLOWED)
        .query(&[("domain", "acme.com")])
        .send()
        .await
        .unwrap();
    let listed: serde_json::Value = res.json().await.unwrap();
    let data = listed["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert!(data.iter().all(|u| u["domain"] == "acme.com"));
}

#[tokio::test]
async fn modify_unknown_user_is_404() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .put(srv.users())
        .header("Origin", ALLOWED)
        .query(&[("email", "ghost@acme.com"), ("domain", "acme.com")])
        .json(&json!({ "name": "Ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()["access-control-allow-origin"], ALLOWED);
}

#[tokio::test]
async fn mirror_outage_never_fails_the_request() {
    let services = AppServices::new(Arc::new(InMemoryPrimaryStore::new()), Arc::new(OfflineMirror));
    let srv = TestServer::spawn_with(services).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.users())
        .header("Origin", ALLOWED)
        .json(&ann())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let created: serde_json::Value = res.json().await.unwrap();
    assert!(created["primaryId"].is_string());
    assert!(created["secondaryId"].is_null());
    assert_eq!(created["message"], "User saved to primary store only; mirror write failed");

    let res = client
        .put(srv.users())
        .header("Origin", ALLOWED)
        .query(&[("email", "ann@acme.com"), ("domain", "acme.com")])
        .json(&json!({ "name": "Annie" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["success"], true);
    assert!(updated["secondaryId"].is_null());
}
