//! Integration tests for the `fairdesk` CLI binary.
//!
//! Argument parsing, help output and completions run offline; the
//! diagnostics commands run against a wiremock data service.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `fairdesk` binary with env isolation.
///
/// Clears all `FAIRDESK_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn fairdesk_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fairdesk");
    cmd.env("HOME", "/tmp/fairdesk-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/fairdesk-cli-test-nonexistent")
        .env_remove("FAIRDESK_PROFILE")
        .env_remove("FAIRDESK_URL")
        .env_remove("FAIRDESK_API_KEY")
        .env_remove("FAIRDESK_ACCESS_TOKEN")
        .env_remove("FAIRDESK_OUTPUT")
        .env_remove("FAIRDESK_INSECURE")
        .env_remove("FAIRDESK_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}):\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

/// Command pointed at `server` through flags, not config.
fn against(server: &MockServer, args: &[&str]) -> assert_cmd::Command {
    let mut cmd = fairdesk_cmd();
    cmd.args(["--url", &server.uri(), "--api-key", "anon-key"])
        .args(args);
    cmd
}

async fn mount_count(server: &MockServer, resource: &str, total: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/rest/v1/{resource}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", format!("*/{total}").as_str())
                .set_body_json(json!([])),
        )
        .mount(server)
        .await;
}

async fn mount_error(server: &MockServer, resource: &str, status: u16, code: &str, message: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/rest/v1/{resource}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "code": code,
            "message": message,
            "details": null,
            "hint": null,
        })))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = fairdesk_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    fairdesk_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("data service")
            .and(predicate::str::contains("check"))
            .and(predicate::str::contains("sweep"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    fairdesk_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fairdesk"));
}

#[test]
fn test_invalid_subcommand() {
    let output = fairdesk_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("foobar"), "Expected the bad subcommand in:\n{text}");
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    fairdesk_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    fairdesk_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_points_at_toml() {
    fairdesk_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_unknown_profile_is_rejected() {
    let output = fairdesk_cmd()
        .args(["--profile", "nope", "check"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(text.contains("nope"), "Expected profile name in:\n{text}");
}

// ── Unconfigured ────────────────────────────────────────────────────

#[test]
fn test_check_without_config_reports_configuration() {
    let output = fairdesk_cmd().args(["check", "-o", "json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(7));

    let json = stdout_json(&output);
    assert_eq!(json["success"], false);
    assert_eq!(json["kind"], "configuration");
}

#[test]
fn test_health_without_config_exits_usage() {
    let output = fairdesk_cmd().args(["health", "-o", "json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));

    let json = stdout_json(&output);
    assert_eq!(json["env"]["url_present"], false);
    assert_eq!(json["connection"], false);
}

#[test]
fn test_sweep_without_config_is_fatal() {
    let output = fairdesk_cmd().args(["sweep", "-o", "json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["overall_status"], "failure");
    assert!(
        json["fatal_error"]
            .as_str()
            .unwrap()
            .contains("not configured")
    );
}

#[test]
fn test_watch_rejects_zero_interval() {
    let output = fairdesk_cmd()
        .args([
            "--url",
            "http://127.0.0.1:1",
            "--api-key",
            "anon-key",
            "watch",
            "--interval",
            "0",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Against a mock service ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_check_success() {
    let server = MockServer::start().await;
    mount_count(&server, "profiles", 12).await;

    let output = run(against(&server, &["check", "-o", "plain"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("Connected"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_denied_key() {
    let server = MockServer::start().await;
    mount_error(&server, "profiles", 401, "PGRST301", "JWT expired").await;

    let output = run(against(&server, &["check", "-o", "json"])).await;
    assert_eq!(output.status.code(), Some(7));
    assert_eq!(stdout_json(&output)["kind"], "auth_denied");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sweep_json_success() {
    let server = MockServer::start().await;
    mount_count(&server, "profiles", 12).await;
    mount_count(&server, "fairs", 4).await;

    let output = run(against(&server, &["sweep", "profiles", "fairs", "-o", "json"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let json = stdout_json(&output);
    assert_eq!(json["overall_status"], "success");
    assert_eq!(json["resources"]["fairs"]["count"], 4);
    let keys: Vec<&String> = json["resources"].as_object().unwrap().keys().collect();
    assert_eq!(keys, ["profiles", "fairs"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sweep_policy_denial_is_warning() {
    let server = MockServer::start().await;
    mount_count(&server, "profiles", 12).await;
    mount_error(
        &server,
        "customers",
        403,
        "42501",
        "permission denied for table customers",
    )
    .await;

    let output = run(against(
        &server,
        &["sweep", "profiles", "customers", "-o", "json"],
    ))
    .await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let json = stdout_json(&output);
    assert_eq!(json["overall_status"], "warning");
    assert_eq!(json["resources"]["customers"]["status"], "error");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sweep_canary_failure_exits_one() {
    let server = MockServer::start().await;
    mount_error(&server, "profiles", 401, "PGRST301", "JWT expired").await;
    mount_count(&server, "fairs", 4).await;

    let output = run(against(&server, &["sweep", "profiles", "fairs", "-o", "json"])).await;
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output)["overall_status"], "failure");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_net_reachable() {
    let server = MockServer::start().await;
    mount_count(&server, "profiles", 12).await;

    let output = run(against(&server, &["net", "-o", "json"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let json = stdout_json(&output);
    assert_eq!(json["online"], true);
    assert_eq!(json["reachable"], true);
    assert!(json["latency_ms"].is_u64());
}

#[test]
fn test_net_unreachable_service() {
    let output = fairdesk_cmd()
        .args([
            "--url",
            "http://127.0.0.1:1",
            "--api-key",
            "anon-key",
            "--timeout",
            "2000",
            "net",
            "-o",
            "json",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));

    let json = stdout_json(&output);
    assert_eq!(json["online"], true);
    assert_eq!(json["config_ok"], true);
    assert_eq!(json["reachable"], false);
    assert!(json.get("latency_ms").is_none());
}
