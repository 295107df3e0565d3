//! Integration tests for the waitlist endpoints.
//!
//! Tests cover:
//! - JSON and form-encoded signups
//! - Invalid addresses rejected with `{ok:false}`
//! - Case-insensitive idempotence and single notification per address
//! - Relay failures not affecting the response
//! - Persistence across server restarts

mod common;

use common::{TestServer, TestServerOptions};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn relay_options(relay: &MockServer) -> TestServerOptions {
    TestServerOptions {
        mail_endpoint: Some(format!("{}/send", relay.uri()).parse().expect("url")),
        ..TestServerOptions::default()
    }
}

async fn count(server: &TestServer) -> u64 {
    let body: Value = reqwest::get(server.url("/api/waitlist/count"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    body["count"].as_u64().expect("count")
}

#[tokio::test]
async fn test_json_signup() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/waitlist"))
        .json(&json!({ "email": "  Ada@Example.com " }))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body, json!({ "ok": true }));
    assert!(server.state().waitlist().get("ada@example.com").is_some());
    assert_eq!(count(&server).await, 1);

    server.shutdown().await;
}

#[tokio::test]
async fn test_form_signup() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/waitlist"))
        .header("content-type", "application/x-www-form-urlencoded")
        .header("user-agent", "form-test")
        .body("email=grace%40example.org")
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), 200);
    let record = server
        .state()
        .waitlist()
        .get("grace@example.org")
        .expect("stored");
    assert_eq!(record.ua, "form-test");

    server.shutdown().await;
}

#[tokio::test]
async fn test_invalid_email_rejected() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    for body in [json!({ "email": "nope" }), json!({}), json!({ "email": "a b@c.d" })] {
        let resp = client
            .post(server.url("/api/waitlist"))
            .json(&body)
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body, json!({ "ok": false, "error": "Invalid email" }));
    }

    // Malformed JSON counts as an empty address.
    let resp = client
        .post(server.url("/api/waitlist"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 400);
    assert_eq!(count(&server).await, 0);

    server.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_signup_stored_once_and_notified_once() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(body_string_contains("New waitlist signup"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&relay)
        .await;

    let server = TestServer::start_with(relay_options(&relay)).await;
    let client = reqwest::Client::new();

    for email in ["ada@example.com", "ADA@example.com", " Ada@Example.COM"] {
        let resp = client
            .post(server.url("/api/waitlist"))
            .json(&json!({ "email": email }))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), 200);
    }

    assert_eq!(count(&server).await, 1);
    server.shutdown().await;
    relay.verify().await;
}

#[tokio::test]
async fn test_relay_failure_still_ok() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&relay)
        .await;

    let server = TestServer::start_with(relay_options(&relay)).await;
    let resp = reqwest::Client::new()
        .post(server.url("/api/waitlist"))
        .json(&json!({ "email": "ada@example.com" }))
        .send()
        .await
        .expect("request");

    assert_eq!(resp.status(), 200);
    assert_eq!(count(&server).await, 1);
    server.shutdown().await;
}

#[tokio::test]
async fn test_signups_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");

    let server = TestServer::start_with(TestServerOptions {
        data_dir: Some(dir.path().to_path_buf()),
        ..TestServerOptions::default()
    })
    .await;
    reqwest::Client::new()
        .post(server.url("/api/waitlist"))
        .json(&json!({ "email": "ada@example.com" }))
        .send()
        .await
        .expect("request");
    server.shutdown().await;

    let server = TestServer::start_with(TestServerOptions {
        data_dir: Some(dir.path().to_path_buf()),
        ..TestServerOptions::default()
    })
    .await;
    assert_eq!(count(&server).await, 1);
    server.shutdown().await;
}
