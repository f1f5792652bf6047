#![allow(clippy::unwrap_used)]
// Integration tests for `ServiceClient` using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fairdesk_api::{Error, ServiceClient};

// ── Helpers ─────────────────────────────────────────────────────────

fn secret(value: &str) -> SecretString {
    value.to_string().into()
}

async fn setup() -> (MockServer, ServiceClient) {
    let server = MockServer::start().await;
    let client =
        ServiceClient::from_reqwest(&server.uri(), reqwest::Client::new(), &secret("anon-key"))
            .unwrap();
    (server, client)
}

// ── Row-count probe ─────────────────────────────────────────────────

#[tokio::test]
async fn test_count_rows_reads_content_range() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("limit", "0"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .and(header("prefer", "count=exact"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "*/17")
                .set_body_json(json!([])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let count = client.count_rows("profiles", None).await.unwrap();
    assert_eq!(count, Some(17));
}

#[tokio::test]
async fn test_count_rows_without_total() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/fairs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_eq!(client.count_rows("fairs", None).await.unwrap(), None);
}

#[tokio::test]
async fn test_access_token_replaces_bearer() {
    let server = MockServer::start().await;
    let client =
        ServiceClient::from_reqwest(&server.uri(), reqwest::Client::new(), &secret("anon-key"))
            .unwrap()
            .with_access_token(&secret("user-jwt"))
            .unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/projects"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer user-jwt"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "*/3"))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.count_rows("projects", None).await.unwrap(), Some(3));
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn test_structured_error_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/customers"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "code": "42501",
            "message": "permission denied for table customers",
            "details": null,
            "hint": null
        })))
        .mount(&server)
        .await;

    let err = client.count_rows("customers", None).await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(err.code(), Some("42501"));
    assert_eq!(err.message(), "permission denied for table customers");
    assert!(err.is_auth_rejected());
    assert!(!err.is_transport());
}

#[tokio::test]
async fn test_service_unavailable_is_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream connect error"))
        .mount(&server)
        .await;

    let err = client.count_rows("profiles", None).await.unwrap_err();
    assert!(
        matches!(err, Error::Api { status: 503, .. }),
        "expected 503 Api error, got: {err:?}"
    );
}

#[tokio::test]
async fn test_numeric_auth_error_code() {
    let server = MockServer::start().await;
    let client =
        ServiceClient::from_reqwest(&server.uri(), reqwest::Client::new(), &secret("anon-key"))
            .unwrap()
            .with_access_token(&secret("user-jwt"))
            .unwrap();

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": 500,
            "msg": "Database error querying schema"
        })))
        .mount(&server)
        .await;

    let err = client.current_session(None).await.unwrap_err();
    assert_eq!(err.code(), Some("500"));
    assert_eq!(err.message(), "Database error querying schema");
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    // Bind then drop a listener so the port is (almost certainly) closed.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = ServiceClient::from_reqwest(
        &format!("http://{addr}"),
        reqwest::Client::new(),
        &secret("anon-key"),
    )
    .unwrap();

    let err = client.count_rows("profiles", None).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got: {err:?}");
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = client
        .count_rows("profiles", Some(Duration::from_millis(100)))
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Timeout { timeout_ms: 100 }),
        "expected timeout, got: {err:?}"
    );
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_invalid_resource_never_hits_network() {
    let (server, client) = setup().await;

    let err = client.count_rows("profiles/../secrets", None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidResource(_)));
    assert!(err.is_unsent());
    assert!(!err.is_transport());
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ── Read probe ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_read_sample_returns_rows() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/projects"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 7, "name": "Hall 4 stand" }
        ])))
        .mount(&server)
        .await;

    let rows = client.read_sample("projects", None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Hall 4 stand");
}

#[tokio::test]
async fn test_non_json_body_with_multibyte_text() {
    let (server, client) = setup().await;

    // Byte 200 falls inside a two-byte character.
    let body = format!("a{}", "é".repeat(150));
    Mock::given(method("GET"))
        .and(path("/rest/v1/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&server)
        .await;

    let err = client.read_sample("projects", None).await.unwrap_err();
    let Error::Deserialization { message, body: raw } = err else {
        panic!("expected deserialization error, got: {err:?}");
    };
    assert_eq!(raw, body);
    assert!(message.contains("body preview"), "{message}");
}

// ── Session lookup ──────────────────────────────────────────────────

#[tokio::test]
async fn test_session_without_token_skips_request() {
    let (server, client) = setup().await;

    assert_eq!(client.current_session(None).await.unwrap(), None);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_session_with_valid_token() {
    let server = MockServer::start().await;
    let client =
        ServiceClient::from_reqwest(&server.uri(), reqwest::Client::new(), &secret("anon-key"))
            .unwrap()
            .with_access_token(&secret("user-jwt"))
            .unwrap();

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer user-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "9f1c2d4e-0000-4000-8000-000000000001",
            "email": "planner@example.com",
            "role": "authenticated",
            "app_metadata": {}
        })))
        .mount(&server)
        .await;

    let session = client.current_session(None).await.unwrap().unwrap();
    assert_eq!(session.user_id, "9f1c2d4e-0000-4000-8000-000000000001");
    assert_eq!(session.email.as_deref(), Some("planner@example.com"));
}

#[tokio::test]
async fn test_session_with_expired_token() {
    let server = MockServer::start().await;
    let client =
        ServiceClient::from_reqwest(&server.uri(), reqwest::Client::new(), &secret("anon-key"))
            .unwrap()
            .with_access_token(&secret("stale-jwt"))
            .unwrap();

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401,
            "msg": "invalid JWT: token is expired"
        })))
        .mount(&server)
        .await;

    assert_eq!(client.current_session(None).await.unwrap(), None);
}
