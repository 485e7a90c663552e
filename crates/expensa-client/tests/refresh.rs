//! Session refresh against a mock Expensa server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use expensa_client::{Error, ExpensaClient, LoginRequest, OutboundRequest};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ExpensaClient {
    ExpensaClient::builder()
        .base_url(format!("{}/api/v1", server.uri()))
        .build()
        .unwrap()
}

fn expired() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"}))
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": data}))
}

/// 401 on the first call to `route`, `data` afterwards.
async fn expire_once(server: &MockServer, verb: &str, route: &str, data: serde_json::Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(expired())
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ok(data))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_expiry_triggers_one_refresh() {
    let server = MockServer::start().await;

    expire_once(&server, "GET", "/api/v1/expense/all", json!([])).await;
    expire_once(&server, "GET", "/api/v1/expense/total", json!(42.5)).await;
    expire_once(&server, "GET", "/api/v1/expense/summary", json!("ok")).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ok(json!({"user": {"id": 7, "email": "ada@example.com", "name": "Ada"}}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let expenses = client.expenses();
    let (list, total, summary) = tokio::join!(
        expenses.list(),
        expenses.total(),
        client.send(OutboundRequest::get("expense/summary")),
    );

    assert!(list.unwrap().is_empty());
    assert_eq!(total.unwrap(), 42.5);
    assert_eq!(summary.unwrap().data::<String>().unwrap(), "ok");

    assert_eq!(client.coordinator().refresh_count(), 1);
    let session = client.session().current().unwrap();
    assert_eq!(session.id, "7");
    assert_eq!(session.display_name(), "Ada");
}

#[tokio::test]
async fn test_replay_carries_refreshed_cookie() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/expense/total"))
        .and(header("cookie", "access_token=fresh"))
        .respond_with(ok(json!(10.0)))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/expense/total"))
        .respond_with(expired())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "access_token=fresh; Path=/; HttpOnly")
                .set_body_json(json!({"status": "success"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.expenses().total().await.unwrap(), 10.0);

    let saved = client.saved_cookies();
    assert!(saved.cookies.iter().any(|c| c.pair == "access_token=fresh"));
}

#[tokio::test]
async fn test_refresh_failure_signs_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ok(json!({"user": {"id": "u-1", "email": "ada@example.com"}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/expense/all"))
        .respond_with(expired())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Refresh token expired"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = notified.clone();
    let client = ExpensaClient::builder()
        .base_url(format!("{}/api/v1", server.uri()))
        .on_session_expired(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    client
        .auth()
        .login(&LoginRequest {
            email: "ada@example.com".into(),
            password: "hunter2".into(),
        })
        .await
        .unwrap();
    assert!(client.is_authenticated());

    let err = client.expenses().list().await.unwrap_err();

    match &err {
        Error::RefreshFailed(cause) => assert!(cause.is_auth_error()),
        other => panic!("expected RefreshFailed, got {:?}", other),
    }
    assert!(!client.is_authenticated());
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refresh_endpoint_unauthorized_is_not_intercepted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(expired())
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .send(OutboundRequest::post("auth/refresh"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Unauthorized(_)));
    assert_eq!(client.coordinator().refresh_count(), 0);
}

#[tokio::test]
async fn test_still_unauthorized_after_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/expense/all"))
        .respond_with(expired())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.expenses().list().await.unwrap_err();

    assert!(matches!(err, Error::AlreadyRetried(_)));
}

#[tokio::test]
async fn test_server_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/expense/all"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ok(json!(null)))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.expenses().list().await.unwrap_err();

    assert!(err.is_server_error());
    assert!(err.to_string().contains("boom"));
}
