//! End-to-end session flow through the gateway and a real user service.
//!
//! The user service runs in-process with its in-memory user store and
//! session registry; everything between them is real HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod harness;

use common::jwt::DEFAULT_CLOCK_SKEW;
use harness::TestGateway;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use user_service::config::MIN_BCRYPT_COST;
use user_service::crypto::{generate_signing_key, TokenIssuer};
use user_service::repositories::{InMemorySessionRegistry, InMemoryUserRepository};
use user_service::services::{AccountService, AuthService, CredentialStore, SessionValidator};

struct UserServiceHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl Drop for UserServiceHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn spawn_user_service() -> UserServiceHandle {
    let key = generate_signing_key().unwrap();
    let issuer = Arc::new(TokenIssuer::new(&key, Duration::from_secs(600), DEFAULT_CLOCK_SKEW).unwrap());
    let registry = Arc::new(InMemorySessionRegistry::new());
    let users = Arc::new(InMemoryUserRepository::new());
    let credentials = Arc::new(CredentialStore::new(users.clone(), MIN_BCRYPT_COST).unwrap());
    let state = Arc::new(user_service::routes::AppState {
        auth: AuthService::new(credentials.clone(), issuer.clone(), registry.clone(), Duration::from_millis(500)),
        accounts: AccountService::new(users, registry.clone(), Duration::from_millis(500)),
        credentials,
        sessions: SessionValidator::new(issuer, registry, Duration::from_millis(500)),
        max_request_timeout: Duration::from_secs(5),
    });
    let app = user_service::routes::build_routes(state, PrometheusBuilder::new().build_recorder().handle());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;
    });
    UserServiceHandle { addr, handle }
}

async fn gateway_for(users: &UserServiceHandle) -> TestGateway {
    let url = format!("http://{}", users.addr);
    TestGateway::spawn(&[("USER_SERVICE_URL", url.as_str())]).await.unwrap()
}

async fn register_and_login(client: &reqwest::Client, gateway: &TestGateway) -> String {
    let registered = client
        .post(format!("{}/api/v1/auth/register", gateway.url()))
        .json(&json!({
            "username": "reader",
            "email": "reader@example.com",
            "password": "correct-horse",
            "fullname": "Test Reader",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(registered.status(), 201);

    let login = client
        .post(format!("{}/api/v1/auth/login", gateway.url()))
        .json(&json!({ "username": "reader", "password": "correct-horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 200);
    let body: Value = login.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_logout_closes_access_to_protected_route() {
    let users = spawn_user_service().await;
    let gateway = gateway_for(&users).await;
    let client = reqwest::Client::new();

    let token = register_and_login(&client, &gateway).await;

    let me = client
        .get(format!("{}/api/v1/me", gateway.url()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), 200);
    let body: Value = me.json().await.unwrap();
    assert_eq!(body["username"], "reader");
    assert_eq!(body["role"], "user");

    let logout = client
        .post(format!("{}/api/v1/auth/logout", gateway.url()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(logout.status(), 200);

    let after = client
        .get(format!("{}/api/v1/me", gateway.url()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), 401);
}

#[tokio::test]
async fn test_profile_lookup_requires_session() {
    let users = spawn_user_service().await;
    let gateway = gateway_for(&users).await;
    let client = reqwest::Client::new();

    let token = register_and_login(&client, &gateway).await;
    let me: Value = client
        .get(format!("{}/api/v1/me", gateway.url()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = me["subject_id"].as_str().unwrap();

    let anonymous = client
        .get(format!("{}/api/v1/users/{}", gateway.url(), id))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), 401);

    let authed = client
        .get(format!("{}/api/v1/users/{}", gateway.url(), id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(authed.status(), 200);
    let profile: Value = authed.json().await.unwrap();
    assert_eq!(profile["email"], "reader@example.com");
}

#[tokio::test]
async fn test_account_management_is_admin_only() {
    let users = spawn_user_service().await;
    let gateway = gateway_for(&users).await;
    let client = reqwest::Client::new();

    let token = register_and_login(&client, &gateway).await;
    let me: Value = client
        .get(format!("{}/api/v1/me", gateway.url()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = me["subject_id"].as_str().unwrap();

    let listing = client
        .get(format!("{}/api/v1/users", gateway.url()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(listing.status(), 403);

    let delete = client
        .delete(format!("{}/api/v1/users/{}", gateway.url(), id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), 403);

    let still_there = client
        .get(format!("{}/api/v1/me", gateway.url()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(still_there.status(), 200);
}
