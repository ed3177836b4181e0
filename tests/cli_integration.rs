//! End-to-end tests for the chatbranch binary
//!
//! Every test points `--db` at a fresh temporary database and `--config` at
//! a path that does not exist, so defaults apply.

use assert_cmd::Command;
use chatbranch::storage::NewMessage;
use predicates::prelude::*;
use serial_test::serial;
use std::path::Path;

mod common;
use common::{create_temp_store, seed_linear, temp_config_file};

fn chatbranch(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("chatbranch").unwrap();
    cmd.env_remove("CHATBRANCH_DB_PATH")
        .env_remove("CHATBRANCH_MAX_TOKENS")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg("/nonexistent/chatbranch.yaml")
        .arg("--db")
        .arg(db);
    cmd
}

#[test]
fn test_version_succeeds() {
    let mut cmd = Command::cargo_bin("chatbranch").unwrap();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("chatbranch"));
}

#[test]
fn test_thread_new_then_list() {
    let (store, _tmp) = create_temp_store();

    chatbranch(store.db_path())
        .args(["thread", "new", "Design review"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created thread"));

    chatbranch(store.db_path())
        .args(["thread", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Design review"));
}

#[test]
fn test_thread_list_json_is_parseable() {
    let (store, _tmp) = create_temp_store();
    store.create_thread("Alpha").unwrap();
    store.create_thread("Beta").unwrap();

    let output = chatbranch(store.db_path())
        .args(["thread", "list", "--search", "alp", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let threads: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<_> = threads
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Alpha"]);
}

#[test]
fn test_view_shows_deepest_branch_and_usage() {
    let (store, _tmp) = create_temp_store();
    let (thread, _) = seed_linear(&store);

    chatbranch(store.db_path())
        .args(["view", &thread.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("second answer"))
        .stdout(predicate::str::contains("Tokens used: 350/128,000 - 0.27%"));
}

#[test]
fn test_view_json_with_current_message() {
    let (store, _tmp) = create_temp_store();
    let (thread, ids) = seed_linear(&store);

    let output = chatbranch(store.db_path())
        .args([
            "view",
            &thread.to_string(),
            "--message",
            &ids[0].to_string(),
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["origin"], "anchored");
    assert_eq!(view["current_message_id"], ids[0]);
    let shown: Vec<_> = view["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect();
    assert_eq!(shown, vec![ids[0], ids[1]]);
    assert_eq!(view["usage"]["total_tokens"], 100);
}

#[test]
fn test_message_add_and_branch_then_tree() {
    let (store, _tmp) = create_temp_store();
    let thread = store.create_thread("cli").unwrap().to_string();

    chatbranch(store.db_path())
        .args(["message", "add", &thread, "hello"])
        .assert()
        .success();
    let root = store.get_messages(thread.parse().unwrap()).unwrap()[0]
        .id
        .to_string();

    chatbranch(store.db_path())
        .args([
            "message",
            "add",
            &thread,
            "hi there",
            "--role",
            "assistant",
            "--parent",
            &root,
            "--prompt-tokens",
            "12",
            "--completion-tokens",
            "8",
        ])
        .assert()
        .success();

    chatbranch(store.db_path())
        .args(["message", "branch", &root, "hey!", "--role", "assistant"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created branch message"));

    chatbranch(store.db_path())
        .args(["tree", &thread])
        .assert()
        .success()
        .stdout(predicate::str::contains("hi there"))
        .stdout(predicate::str::contains("(20 tokens)"))
        .stdout(predicate::str::contains("  ["));
}

#[test]
fn test_message_add_total_tokens() {
    let (store, _tmp) = create_temp_store();
    let thread = store.create_thread("totals").unwrap();
    let root = store
        .add_message(NewMessage::user(thread, "q"))
        .unwrap();

    chatbranch(store.db_path())
        .args([
            "message",
            "add",
            &thread.to_string(),
            "a",
            "--role",
            "assistant",
            "--parent",
            &root.to_string(),
            "--total-tokens",
            "2048",
        ])
        .assert()
        .success();

    chatbranch(store.db_path())
        .args(["usage", &thread.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tokens used: 2,048/128,000"));
}

#[test]
fn test_usage_command() {
    let (store, _tmp) = create_temp_store();
    let (thread, ids) = seed_linear(&store);

    chatbranch(store.db_path())
        .args(["usage", &thread.to_string(), "-m", &ids[1].to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tokens used: 100/128,000"));
}

#[test]
fn test_message_delete_cascades() {
    let (store, _tmp) = create_temp_store();
    let (thread, ids) = seed_linear(&store);

    chatbranch(store.db_path())
        .args(["message", "delete", &ids[1].to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 descendant(s)"));

    let remaining: Vec<_> = store
        .get_messages(thread)
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(remaining, vec![ids[0]]);
}

#[test]
fn test_missing_thread_fails() {
    let (store, _tmp) = create_temp_store();

    chatbranch(store.db_path())
        .args(["view", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Thread not found: 99"));
}

#[test]
fn test_blank_content_is_rejected() {
    let (store, _tmp) = create_temp_store();
    let thread = store.create_thread("blank").unwrap();

    chatbranch(store.db_path())
        .args(["message", "add", &thread.to_string(), "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"));
}

#[test]
#[serial]
fn test_invalid_config_is_rejected() {
    let (store, _tmp) = create_temp_store();
    let (_cfg_dir, config_path) = temp_config_file(
        r#"
tokens:
  max_tokens: 0
"#,
    );

    let mut cmd = Command::cargo_bin("chatbranch").unwrap();
    cmd.env_remove("CHATBRANCH_MAX_TOKENS")
        .arg("--config")
        .arg(&config_path)
        .arg("--db")
        .arg(store.db_path())
        .args(["thread", "list"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("max_tokens"));
}

#[test]
#[serial]
fn test_config_max_tokens_changes_display() {
    let (store, _tmp) = create_temp_store();
    let (thread, _) = seed_linear(&store);
    let (_cfg_dir, config_path) = temp_config_file(
        r#"
tokens:
  max_tokens: 1000
"#,
    );

    let mut cmd = Command::cargo_bin("chatbranch").unwrap();
    cmd.env_remove("CHATBRANCH_MAX_TOKENS")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(&config_path)
        .arg("--db")
        .arg(store.db_path())
        .args(["usage", &thread.to_string()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Tokens used: 350/1,000 - 35%"));
}
