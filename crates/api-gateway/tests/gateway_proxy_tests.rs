//! Gateway integration tests against mocked user and book services.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

mod harness;

use common::deadline::REQUEST_TIMEOUT_HEADER;
use common::session::VALIDATE_SESSION_PATH;
use harness::TestGateway;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn valid_session(role: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "valid": true,
        "subject_id": "6a0e6f1c-1111-4000-8000-000000000001",
        "username": "alice",
        "role": role
    }))
}

struct Upstreams {
    users: MockServer,
    books: MockServer,
}

impl Upstreams {
    async fn start() -> Self {
        Self {
            users: MockServer::start().await,
            books: MockServer::start().await,
        }
    }

    async fn gateway(&self, extra: &[(&str, &str)]) -> TestGateway {
        let users = self.users.uri();
        let books = self.books.uri();
        let mut vars = vec![
            ("USER_SERVICE_URL", users.as_str()),
            ("BOOK_SERVICE_URL", books.as_str()),
        ];
        vars.extend_from_slice(extra);
        TestGateway::spawn(&vars).await.unwrap()
    }
}

#[tokio::test]
async fn test_missing_or_malformed_header_never_calls_user_service() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("POST"))
        .and(path(VALIDATE_SESSION_PATH))
        .respond_with(valid_session("admin"))
        .expect(0)
        .mount(&upstreams.users)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&upstreams.books)
        .await;

    let gateway = upstreams.gateway(&[]).await;
    let client = reqwest::Client::new();

    let missing = client
        .post(format!("{}/api/v1/books", gateway.url()))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 401);
    assert!(missing.headers().contains_key("www-authenticate"));

    for value in ["Token abc", "Bearer", "Bearer    "] {
        let response = client
            .post(format!("{}/api/v1/books", gateway.url()))
            .header("authorization", value)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401, "header {value:?}");
    }
}

#[tokio::test]
async fn test_authenticated_request_carries_gateway_identity_only() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("POST"))
        .and(path(VALIDATE_SESSION_PATH))
        .respond_with(valid_session("user"))
        .expect(1)
        .mount(&upstreams.users)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/books"))
        .and(header("x-user-id", "6a0e6f1c-1111-4000-8000-000000000001"))
        .and(header("x-username", "alice"))
        .and(header("x-user-role", "user"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "b-1"})))
        .expect(1)
        .mount(&upstreams.books)
        .await;

    let gateway = upstreams.gateway(&[]).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/books", gateway.url()))
        .bearer_auth("tok")
        // Spoofed identity must not survive.
        .header("x-user-role", "admin")
        .header("x-user-id", "someone-else")
        .json(&json!({"title": "Dune"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["id"], "b-1");

    let received = upstreams.books.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let roles: Vec<_> = received[0].headers.get_all("x-user-role").iter().collect();
    assert_eq!(roles.len(), 1);
    assert!(received[0].headers.contains_key(REQUEST_TIMEOUT_HEADER));
}

#[tokio::test]
async fn test_public_read_strips_spoofed_identity() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&upstreams.books)
        .await;

    let gateway = upstreams.gateway(&[]).await;
    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/books?page=2&limit=5", gateway.url()))
        .header("x-user-id", "forged")
        .header("x-user-role", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let received = upstreams.books.received_requests().await.unwrap();
    assert!(!received[0].headers.contains_key("x-user-id"));
    assert!(!received[0].headers.contains_key("x-user-role"));
    assert_eq!(received[0].url.query(), Some("page=2&limit=5"));
}

#[tokio::test]
async fn test_book_search_is_forwarded_with_query() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/books/search"))
        .and(query_param("q", "le guin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [], "total": 0})))
        .expect(1)
        .mount(&upstreams.books)
        .await;
    Mock::given(method("POST"))
        .and(path(VALIDATE_SESSION_PATH))
        .respond_with(valid_session("user"))
        .expect(0)
        .mount(&upstreams.users)
        .await;

    let gateway = upstreams.gateway(&[]).await;
    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/books/search?q=le%20guin&page=1", gateway.url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_user_role_cannot_delete_books() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("POST"))
        .and(path(VALIDATE_SESSION_PATH))
        .respond_with(valid_session("user"))
        .mount(&upstreams.users)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&upstreams.books)
        .await;

    let gateway = upstreams.gateway(&[]).await;
    let response = reqwest::Client::new()
        .delete(format!("{}/api/v1/books/b-1", gateway.url()))
        .bearer_auth("tok")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_admin_can_delete_books() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("POST"))
        .and(path(VALIDATE_SESSION_PATH))
        .respond_with(valid_session("admin"))
        .mount(&upstreams.users)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/books/b-1"))
        .and(header("x-user-role", "admin"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&upstreams.books)
        .await;

    let gateway = upstreams.gateway(&[]).await;
    let response = reqwest::Client::new()
        .delete(format!("{}/api/v1/books/b-1", gateway.url()))
        .bearer_auth("tok")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_upstream_rejection_passes_through() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("POST"))
        .and(path(VALIDATE_SESSION_PATH))
        .respond_with(valid_session("user"))
        .mount(&upstreams.users)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/books"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "error": {"code": "REFERENCE_NOT_FOUND", "message": "Category not found: cat-missing-2"}
        })))
        .mount(&upstreams.books)
        .await;

    let gateway = upstreams.gateway(&[]).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/books", gateway.url()))
        .bearer_auth("tok")
        .json(&json!({"category_ids": ["cat-exists-1", "cat-missing-2"]}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 422);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "REFERENCE_NOT_FOUND");
}

#[tokio::test]
async fn test_user_service_down_is_503_not_401() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("POST"))
        .and(path(VALIDATE_SESSION_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstreams.users)
        .await;

    let gateway = upstreams.gateway(&[]).await;
    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/me", gateway.url()))
        .bearer_auth("tok")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn test_slow_user_service_is_503() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("POST"))
        .and(path(VALIDATE_SESSION_PATH))
        .respond_with(valid_session("user").set_delay(Duration::from_secs(3)))
        .mount(&upstreams.users)
        .await;

    let gateway = upstreams
        .gateway(&[("SESSION_VALIDATE_TIMEOUT_MS", "200")])
        .await;
    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/me", gateway.url()))
        .bearer_auth("tok")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn test_exhausted_request_deadline_is_504() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("POST"))
        .and(path(VALIDATE_SESSION_PATH))
        .respond_with(valid_session("user").set_delay(Duration::from_secs(3)))
        .mount(&upstreams.users)
        .await;

    let gateway = upstreams
        .gateway(&[
            ("SESSION_VALIDATE_TIMEOUT_MS", "5000"),
            ("REQUEST_TIMEOUT_MS", "200"),
        ])
        .await;
    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/me", gateway.url()))
        .bearer_auth("tok")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 504);
}

#[tokio::test]
async fn test_me_returns_identity() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("POST"))
        .and(path(VALIDATE_SESSION_PATH))
        .respond_with(valid_session("admin"))
        .expect(1)
        .mount(&upstreams.users)
        .await;

    let gateway = upstreams.gateway(&[]).await;
    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/me", gateway.url()))
        .bearer_auth("tok")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "admin");
}
