//! CLI integration tests for the Expensa command-line interface.
//!
//! Every test points `EXPENSA_CONFIG_DIR` at a fresh temp directory, so the
//! session, cookies and client config never touch the real user config.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get a command for the expensa binary with an isolated config dir.
fn expensa(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("expensa").unwrap();
    cmd.env("EXPENSA_CONFIG_DIR", config_dir.path())
        .env_remove("EXPENSA_SERVER_URL");
    cmd
}

fn api(server: &MockServer) -> String {
    format!("{}/api/v1", server.uri())
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": data}))
}

fn expired() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"}))
}

/// Mount a login endpoint that hands out both credential cookies.
async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(
            ok(json!({"user": {"id": 7, "email": "ada@example.com", "name": "Ada"}}))
                .append_header("set-cookie", "access_token=a1; Path=/; HttpOnly")
                .append_header("set-cookie", "refresh_token=r1; Path=/; HttpOnly"),
        )
        .mount(server)
        .await;
}

fn login(dir: &TempDir, server: &MockServer) {
    expensa(dir)
        .args(["--server", &api(server)])
        .args(["auth", "login", "--email", "ada@example.com", "--password-stdin"])
        .write_stdin("hunter2\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Parsing
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    expensa(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("expense"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_expense_add_requires_amount() {
    let dir = TempDir::new().unwrap();
    expensa(&dir)
        .args(["expense", "add", "Taxi", "--category", "Travel"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--amount"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Route guard
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_expense_commands_require_login() {
    let dir = TempDir::new().unwrap();
    expensa(&dir)
        .args(["--server", "http://127.0.0.1:9/api/v1", "expense", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_status_when_logged_out() {
    let dir = TempDir::new().unwrap();
    expensa(&dir)
        .args(["--json", "auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"authenticated\": false"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_set_context_becomes_current() {
    let dir = TempDir::new().unwrap();
    expensa(&dir)
        .args([
            "config",
            "set-context",
            "staging",
            "--server",
            "https://staging.example.com/api/v1",
            "--refresh-timeout",
            "3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("set as current context"));

    expensa(&dir)
        .args(["--json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://staging.example.com/api/v1"))
        .stdout(predicate::str::contains("\"refresh_timeout_secs\": 3"));

    expensa(&dir)
        .args(["config", "use-context", "missing"])
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions across invocations
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_then_refresh_in_a_later_process() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/expense/total"))
        .respond_with(expired())
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/expense/total"))
        .respond_with(ok(json!(42.5)))
        .mount(&server)
        .await;
    // Only answers when the refresh cookie from the earlier login is sent.
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(header_regex("cookie", "refresh_token=r1"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    login(&dir, &server);
    assert!(dir.path().join("session.json").exists());
    assert!(dir.path().join("cookies.json").exists());

    expensa(&dir)
        .args(["--server", &api(&server), "expense", "total"])
        .assert()
        .success()
        .stdout(predicate::str::contains("42.50"));

    expensa(&dir)
        .args(["--json", "auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ada@example.com"));
}

#[tokio::test]
async fn test_failed_refresh_signs_out() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/expense/all"))
        .respond_with(expired())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(expired())
        .expect(1)
        .mount(&server)
        .await;

    login(&dir, &server);

    expensa(&dir)
        .args(["--server", &api(&server), "expense", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("session has expired"));

    assert!(!dir.path().join("session.json").exists());
    assert!(!dir.path().join("cookies.json").exists());
}

#[tokio::test]
async fn test_logout_survives_server_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    login(&dir, &server);

    expensa(&dir)
        .args(["--server", &api(&server), "auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out."));

    assert!(!dir.path().join("session.json").exists());
}
