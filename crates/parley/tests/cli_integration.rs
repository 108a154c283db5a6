//! CLI integration tests for the Parley command-line interface.
//!
//! Most tests only exercise argument parsing and help output. The
//! `end_to_end` tests start `parley serve` on a free port and drive it with
//! the client subcommands.

use std::net::{TcpListener, TcpStream};
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the parley binary.
fn parley() -> Command {
    Command::cargo_bin("parley").unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    parley()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Parley"))
        .stdout(predicate::str::contains("A2A task server and client"));
}

#[test]
fn test_version_displays() {
    parley()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("parley"));
}

#[test]
fn test_help_lists_subcommands() {
    parley()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("send"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("cancel"))
        .stdout(predicate::str::contains("card"));
}

#[test]
fn test_serve_help_lists_overrides() {
    parley()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--bind"))
        .stdout(predicate::str::contains("--store"))
        .stdout(predicate::str::contains("--dir"))
        .stdout(predicate::str::contains("--config"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Flag Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_verbose_flag_accepted() {
    parley().args(["--verbose", "--help"]).assert().success();
}

#[test]
fn test_json_flag_accepted() {
    parley().args(["--json", "--help"]).assert().success();
}

#[test]
fn test_server_flag_accepted() {
    parley()
        .args(["--server", "http://localhost:9999", "--help"])
        .assert()
        .success();
}

// ─────────────────────────────────────────────────────────────────────────────
// Invalid Input Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_subcommand_rejected() {
    parley()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_invalid_store_rejected() {
    parley()
        .args(["serve", "--store", "redis"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_send_requires_text() {
    parley()
        .arg("send")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<TEXT>"));
}

#[test]
fn test_send_without_server_reports_network_error() {
    let config_dir = tempfile::tempdir().unwrap();
    parley()
        .env("PARLEY_CONFIG_DIR", config_dir.path())
        .args(["--server", "http://127.0.0.1:1", "send", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Network error"));
}

// ─────────────────────────────────────────────────────────────────────────────
// End-to-end
// ─────────────────────────────────────────────────────────────────────────────

/// A `parley serve` child process, killed on drop.
struct ServeProcess {
    child: Child,
    url: String,
    config_dir: tempfile::TempDir,
}

impl ServeProcess {
    fn start() -> Self {
        let config_dir = tempfile::tempdir().unwrap();
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let child = std::process::Command::new(env!("CARGO_BIN_EXE_parley"))
            .env("PARLEY_CONFIG_DIR", config_dir.path())
            .current_dir(config_dir.path())
            .args(["serve", "--port", &port.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while TcpStream::connect(("127.0.0.1", port)).is_err() {
            assert!(Instant::now() < deadline, "server did not start");
            std::thread::sleep(Duration::from_millis(50));
        }

        Self {
            child,
            url: format!("http://127.0.0.1:{port}"),
            config_dir,
        }
    }

    fn cli(&self) -> Command {
        let mut cmd = parley();
        cmd.env("PARLEY_CONFIG_DIR", self.config_dir.path())
            .args(["--json", "--server", &self.url]);
        cmd
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.cli().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "{}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

impl Drop for ServeProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[test]
fn test_end_to_end_send_get_cancel() {
    let server = ServeProcess::start();

    let task = server.json(&["send", "hello", "--task-id", "cli-1"]);
    assert_eq!(task["id"], "cli-1");
    assert_eq!(task["status"]["state"], "completed");
    assert_eq!(task["artifacts"][0]["parts"][0]["text"], "hello");

    let fetched = server.json(&["get", "cli-1"]);
    assert_eq!(fetched["status"]["state"], "completed");

    // Cancelling a finished task leaves it as it was.
    let cancelled = server.json(&["cancel", "cli-1"]);
    assert_eq!(cancelled["status"]["state"], "completed");
}

#[test]
fn test_end_to_end_stream_prints_events() {
    let server = ServeProcess::start();

    server
        .cli()
        .args(["send", "streamed", "--stream"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"working\""))
        .stdout(predicate::str::contains("\"streamed\""))
        .stdout(predicate::str::contains("\"final\":true"));
}

#[test]
fn test_end_to_end_card_and_unknown_task() {
    let server = ServeProcess::start();

    let card = server.json(&["card"]);
    assert_eq!(card["name"], "Parley Echo");
    assert_eq!(card["skills"][0]["id"], "echo");

    server
        .cli()
        .args(["get", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found: ghost"));
}
