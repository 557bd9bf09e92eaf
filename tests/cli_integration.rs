//! End-to-end tests of the `dusk` binary.
//!
//! Every test gets its own data directory and config file, and runs against
//! the built-in echo provider unless it configures another one.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Fixtures
// =============================================================================

struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn write_config(&self, contents: &str) {
        fs::write(self.config_path(), contents).unwrap();
    }

    /// A `dusk` invocation isolated from the user's environment.
    fn dusk(&self) -> Command {
        let mut cmd = Command::cargo_bin("dusk").unwrap();
        cmd.env("DUSK_CONFIG", self.config_path())
            .env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("xdg"))
            .env_remove("DUSK_DATA_DIR")
            .env_remove("DUSK_LOG")
            .arg("--data-dir")
            .arg(self.dir.path().join("data"))
            .arg("--no-interactive");
        cmd
    }

    /// Run ids in creation order.
    fn run_ids(&self) -> Vec<String> {
        let out = self.dusk().args(["runs", "--json"]).output().unwrap();
        assert!(out.status.success());
        let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        value["runs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect()
    }
}

// =============================================================================
// Running prompts
// =============================================================================

#[test]
fn run_prints_output() {
    let env = TestEnv::new();
    env.dusk()
        .args(["run", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[gpt-4] hello"));

    let ids = env.run_ids();
    assert_eq!(ids.len(), 1);
    assert!(ids[0].starts_with("run-"));
}

#[test]
fn empty_prompt_is_rejected() {
    let env = TestEnv::new();
    env.dusk()
        .args(["run", ""])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error:"));
    assert!(env.run_ids().is_empty());
}

#[test]
fn history_filters_by_status() {
    let env = TestEnv::new();
    env.dusk().args(["run", "first"]).assert().success();
    env.dusk().args(["run", "second", "-m", "mistral-7b"]).assert().success();

    env.dusk()
        .args(["history", "-l", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"second\"").and(predicate::str::contains("first").not()));

    env.dusk()
        .args(["history", "-f", "failed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No runs yet."));

    env.dusk()
        .args(["history", "-f", "sideways"])
        .assert()
        .code(1);
}

#[test]
fn retry_and_compare() {
    let env = TestEnv::new();
    env.dusk().args(["run", "hello"]).assert().success();
    let first = env.run_ids().remove(0);

    env.dusk()
        .args(["retry", &first[..12], "-m", "mistral-7b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[mistral-7b] hello"));
    let ids = env.run_ids();
    assert_eq!(ids.len(), 2);

    env.dusk()
        .args(["compare", &ids[0], &ids[1], "-d"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("-[gpt-4] hello")
                .and(predicate::str::contains("+[mistral-7b] hello")),
        );

    let out = env
        .dusk()
        .args(["compare", &ids[0], &ids[1], "-f", "json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["identical"], false);
    assert!(value["left_digest"].as_str().unwrap().starts_with("sha256:"));
}

#[test]
fn explain_shows_lineage() {
    let env = TestEnv::new();
    env.dusk().args(["run", "hello"]).assert().success();
    let root = env.run_ids().remove(0);
    env.dusk()
        .args(["branch", &root, "-n", "exp", "-m", "claude-3-opus"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created branch 'exp'"));
    let child = env.run_ids().remove(1);

    env.dusk()
        .args(["explain", &child, "--trace"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Branch:    exp (started here)")
                .and(predicate::str::contains("Trace (root first):")),
        );
}

// =============================================================================
// Branches and deletion
// =============================================================================

#[test]
fn branch_lifecycle() {
    let env = TestEnv::new();
    env.dusk().args(["run", "hello"]).assert().success();
    let root = env.run_ids().remove(0);

    env.dusk()
        .args(["branch", &root, "--name", "exp"])
        .assert()
        .success();
    env.dusk()
        .args(["branch", &root, "--name", "exp"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("exp"));

    env.dusk()
        .args(["runs", "--tree"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[branch: exp]"));

    env.dusk()
        .args(["delete", "main", "--branch", "--force"])
        .assert()
        .code(1);
    env.dusk()
        .args(["delete", "exp", "--branch", "--force"])
        .assert()
        .success();
    assert_eq!(env.run_ids(), vec![root]);

    env.dusk()
        .args(["delete", "exp", "--branch", "--force"])
        .assert()
        .code(2);
}

#[test]
fn delete_requires_confirmation_or_force() {
    let env = TestEnv::new();
    env.dusk().args(["run", "hello"]).assert().success();
    let root = env.run_ids().remove(0);
    env.dusk().args(["retry", &root]).assert().success();

    env.dusk()
        .args(["delete", &root])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("child run"));

    env.dusk()
        .args(["delete", &root, "--cascade"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--force"));
    assert_eq!(env.run_ids().len(), 2);

    env.dusk()
        .args(["delete", &root, "--cascade", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 run(s) removed"));
    assert!(env.run_ids().is_empty());
}

#[test]
fn unknown_run_exits_with_not_found() {
    let env = TestEnv::new();
    env.dusk()
        .args(["show", "run-deadbeef"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn show_truncates_unless_full() {
    let env = TestEnv::new();
    let long = "x".repeat(300);
    env.dusk().args(["run", &long]).assert().success();
    let id = env.run_ids().remove(0);

    env.dusk()
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("use --full"));
    env.dusk()
        .args(["show", &id, "--full"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("[gpt-4] {}", long)));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn config_set_changes_default_model() {
    let env = TestEnv::new();
    env.dusk()
        .args(["config", "set", "default_model", "claude-3-opus"])
        .assert()
        .success();
    env.dusk()
        .args(["config", "get", "default_model"])
        .assert()
        .success()
        .stdout("claude-3-opus\n");
    env.dusk()
        .args(["run", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[claude-3-opus] hello"));

    env.dusk()
        .args(["config", "set", "colour", "blue"])
        .assert()
        .code(1);
}

#[test]
fn models_lists_catalog() {
    let env = TestEnv::new();
    env.dusk()
        .args(["models", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("llama-2-7b").and(predicate::str::contains("gpt-4").not()));
    env.dusk()
        .args(["models"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gpt-4 (OpenAI) [default]"));
}

#[test]
fn completion_generates_script() {
    let env = TestEnv::new();
    env.dusk()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dusk"));
}

#[cfg(unix)]
#[test]
fn failing_command_provider_records_failure() {
    let env = TestEnv::new();
    env.write_config(
        r#"
[provider]
kind = "command"
command = "sh"
args = ["-c", "echo overloaded >&2; exit 3"]
"#,
    );

    env.dusk()
        .args(["run", "hello"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("overloaded"));

    env.dusk()
        .args(["history", "--filter", "failed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("failed"));
}
