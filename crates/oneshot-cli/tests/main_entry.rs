//! Integration tests for the `oneshot` binary entry point.
//!
//! Runs the bundled reference engine against a throwaway model file and
//! checks what reaches stdout, stderr and the exit status.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use predicates::str::contains;
use rstest::{fixture, rstest};
use serde_json::Value;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn model(&self) -> String {
        self.path("tiny.gguf").display().to_string()
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> Result<String> {
        let path = self.path(name);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path.display().to_string())
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("create temp dir");
    fs::write(dir.path().join("tiny.gguf"), b"reference model bytes").expect("write model");
    Workspace { dir }
}

fn stdout_json(output: &std::process::Output) -> Result<Value> {
    serde_json::from_slice(&output.stdout).context("stdout is not a JSON document")
}

#[rstest]
fn help_cli_succeeds_without_a_model() {
    let mut command = cargo_bin_cmd!("oneshot");
    command.arg("--help-cli");
    command
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(contains("--documents-file"));
}

#[rstest]
fn chat_text_prints_a_completion(workspace: Workspace) -> Result<()> {
    let mut command = cargo_bin_cmd!("oneshot");
    command.args(["chat", "--text", "hi", "--no-stream", "-m", &workspace.model()]);
    let output = command.assert().success().get_output().clone();
    let payload = stdout_json(&output)?;
    assert_eq!(payload["object"], "chat.completion");
    assert_eq!(payload["choices"][0]["message"]["content"], "hi");
    Ok(())
}

#[rstest]
fn streamed_chat_ends_with_done_marker(workspace: Workspace) {
    let mut command = cargo_bin_cmd!("oneshot");
    command.args(["chat", "--text", "hello world", "--stream", "-m", &workspace.model()]);
    command
        .assert()
        .success()
        .stdout(contains("chat.completion.chunk").and(contains("data: [DONE]")));
}

#[rstest]
fn embeddings_switch_on_embedding_mode(workspace: Workspace) -> Result<()> {
    let mut command = cargo_bin_cmd!("oneshot");
    command.args(["embeddings", "--text", "x", "-m", &workspace.model()]);
    let output = command.assert().success().get_output().clone();
    let payload = stdout_json(&output)?;
    assert_eq!(payload["data"][0]["embedding"].as_array().map(Vec::len), Some(64));
    Ok(())
}

#[rstest]
fn rerank_honours_top_n(workspace: Workspace) -> Result<()> {
    let mut command = cargo_bin_cmd!("oneshot");
    command.args([
        "rerank",
        "--query",
        "q",
        "--document",
        "a",
        "--document",
        "b",
        "--top-n",
        "1",
        "-m",
        &workspace.model(),
    ]);
    let output = command.assert().success().get_output().clone();
    let payload = stdout_json(&output)?;
    assert_eq!(payload["results"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[rstest]
fn body_file_drives_tokenize(workspace: Workspace) -> Result<()> {
    let body = workspace.write("request.json", r#"{"content":"ab"}"#)?;
    let mut command = cargo_bin_cmd!("oneshot");
    command.args(["tokenize", "--body-file", &body, "-m", &workspace.model()]);
    command
        .assert()
        .success()
        .stdout(contains(r#"{"tokens":[100,101]}"#));
    Ok(())
}

#[rstest]
fn stdin_body_drives_detokenize(workspace: Workspace) {
    let mut command = cargo_bin_cmd!("oneshot");
    command
        .args(["detokenize", "--stdin", "-m", &workspace.model()])
        .write_stdin(r#"{"tokens":[107,108]}"#);
    command.assert().success().stdout(contains(r#""content":"hi""#));
}

#[rstest]
fn handler_errors_exit_with_failure_on_stderr(workspace: Workspace) {
    let mut command = cargo_bin_cmd!("oneshot");
    command.args(["chat", "--body", "{not json", "-m", &workspace.model()]);
    command
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(contains(r#""code":500"#).and(contains("malformed request body")));
}

#[rstest]
fn unsupported_operation_fails(workspace: Workspace) {
    let mut command = cargo_bin_cmd!("oneshot");
    command.args(["frobnicate", "--body", "{}", "-m", &workspace.model()]);
    command
        .assert()
        .failure()
        .stderr(contains("unsupported operation: frobnicate"));
}

#[rstest]
fn missing_model_path_fails_with_usage() {
    let mut command = cargo_bin_cmd!("oneshot");
    command.args(["chat", "--text", "hi"]);
    command
        .assert()
        .failure()
        .stderr(contains("model path is required").and(contains("Usage:")));
}

#[rstest]
fn engine_load_failure_exits_before_dispatch(workspace: Workspace) {
    let missing = workspace.path("missing.gguf").display().to_string();
    let mut command = cargo_bin_cmd!("oneshot");
    command.args(["chat", "--text", "hi", "-m", &missing]);
    command
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(contains("failed to read model"));
}

#[rstest]
fn json_log_format_is_accepted(workspace: Workspace) {
    let mut command = cargo_bin_cmd!("oneshot");
    command.args([
        "--log-format",
        "json",
        "--log-filter",
        "info",
        "health",
        "--body",
        "{}",
        "-m",
        &workspace.model(),
    ]);
    command
        .assert()
        .success()
        .stdout(contains(r#"{"status":"ok"}"#))
        .stderr(contains("\"event\":\"engine_ready\""));
}
