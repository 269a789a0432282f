//! Basic CLI E2E tests.
//!
//! Tests run the built binary against an isolated HOME and verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_devquest"))
        .args(args)
        .env("HOME", home)
        .env_remove("DEVQUEST_ENV")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "command {args:?} failed: {stderr}");
    stdout
}

fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("event line is JSON"))
        .collect()
}

#[test]
fn test_profile_status_starts_fresh() {
    let home = tempfile::tempdir().unwrap();
    let out = run_ok(home.path(), &["profile", "status"]);
    let status: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(status["level"], 1);
    assert_eq!(status["current_xp"], 0);
    assert_eq!(status["xp_to_next_level"], 120);
    assert_eq!(status["burnout_status"], "optimal");
}

#[test]
fn test_quest_lifecycle() {
    let home = tempfile::tempdir().unwrap();
    let id = run_ok(home.path(), &["quest", "add", "Fix flaky test"])
        .trim()
        .to_string();
    let sub = run_ok(
        home.path(),
        &["quest", "sub", "add", &id[..8], "bisect", "--tier", "complex"],
    )
    .trim()
    .to_string();

    let events = json_lines(&run_ok(home.path(), &["quest", "sub", "toggle", &id, &sub]));
    assert_eq!(events[0]["type"], "sub_quest_toggled");
    assert_eq!(events[0]["completed"], true);

    let events = json_lines(&run_ok(home.path(), &["quest", "complete", &id]));
    assert!(events
        .iter()
        .any(|e| e["type"] == "quest_completed" && e["xp_reward"] == 75));

    let list: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["quest", "list", "--all"])).unwrap();
    assert_eq!(list[0]["completed"], true);
    assert_eq!(list[0]["progress"], 1.0);

    let status: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["profile", "status"])).unwrap();
    assert_eq!(status["current_xp"], 100);
}

#[test]
fn test_timer_logs_work_session() {
    let home = tempfile::tempdir().unwrap();
    let id = run_ok(home.path(), &["quest", "add", "Read RFC"])
        .trim()
        .to_string();

    let events = json_lines(&run_ok(home.path(), &["quest", "start", &id]));
    assert_eq!(events[0]["type"], "timer_started");
    let events = json_lines(&run_ok(home.path(), &["quest", "stop", &id]));
    assert_eq!(events[0]["type"], "timer_stopped");

    let stats: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["stats", "today"])).unwrap();
    assert_eq!(stats["today_sessions"], 1);
}

#[test]
fn test_unknown_quest_is_an_error() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["quest", "complete", "deadbeef"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("quest not found"));
}

#[test]
fn test_arcade_report() {
    let home = tempfile::tempdir().unwrap();
    let events = json_lines(&run_ok(
        home.path(),
        &["arcade", "report", "--xp", "12", "--burnout", "0.1"],
    ));
    assert_eq!(events[0]["type"], "arcade_reported");
    assert!(events.iter().any(|e| e["type"] == "xp_awarded"));

    let (_, _, code) = run_cli(home.path(), &["arcade", "report", "--burnout", "2"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_get_set() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(home.path(), &["config", "get", "focus.focus_minutes"]).trim(), "25");
    run_ok(home.path(), &["config", "set", "focus.focus_minutes", "50"]);
    assert_eq!(run_ok(home.path(), &["config", "get", "focus.focus_minutes"]).trim(), "50");

    let (_, _, code) = run_cli(home.path(), &["config", "set", "focus.sessions_per_cycle", "0"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(home.path(), &["config", "get", "ui.dark_mode"]);
    assert_eq!(code, 1);

    run_ok(home.path(), &["config", "reset"]);
    assert_eq!(run_ok(home.path(), &["config", "get", "focus.focus_minutes"]).trim(), "25");
}

#[test]
fn test_focus_run_quits_on_command() {
    use std::io::Write;
    use std::process::Stdio;

    let home = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_devquest"))
        .args(["focus", "run"])
        .env("HOME", home.path())
        .env_remove("DEVQUEST_ENV")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"p\nq\n").unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let events = json_lines(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(events[0]["type"], "focus_started");
    assert_eq!(events.last().unwrap()["type"], "session_reset");
}

#[test]
fn test_running_focus_session_blocks_profile_writes() {
    use std::io::{BufRead, BufReader, Write};
    use std::process::Stdio;

    let home = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_devquest"))
        .args(["focus", "run"])
        .env("HOME", home.path())
        .env_remove("DEVQUEST_ENV")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    let mut first = String::new();
    stdout.read_line(&mut first).unwrap();
    let started: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(started["type"], "focus_started");

    let (_, stderr, code) = run_cli(home.path(), &["quest", "add", "Write changelog"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("focus session is running"), "{stderr}");
    let (_, _, code) = run_cli(home.path(), &["arcade", "report", "--xp", "5"]);
    assert_eq!(code, 1);

    // Reads still work.
    run_ok(home.path(), &["profile", "status"]);
    run_ok(home.path(), &["quest", "list"]);

    stdin.write_all(b"q\n").unwrap();
    drop(stdin);
    assert!(child.wait().unwrap().success());

    run_ok(home.path(), &["quest", "add", "Write changelog"]);
    let list: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["quest", "list"])).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
}
