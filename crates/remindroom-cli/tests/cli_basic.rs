//! Basic CLI E2E tests.
//!
//! Tests run the built binary against a throwaway data directory and verify
//! the JSON it prints.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::Value;

fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_remindroom-cli"));
    cmd.env("REMINDROOM_DATA_DIR", data_dir)
        .env("RUST_LOG", "warn");
    cmd
}

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = cli(data_dir)
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_reminder_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();

    let created = run_json(
        d,
        &[
            "reminder",
            "add",
            "Water plants",
            "--due",
            "2030-03-01 08:00",
            "--recurrence",
            "weekly",
        ],
    );
    assert_eq!(created["title"], "Water plants");
    assert_eq!(created["due_time"], "2030-03-01 08:00");
    assert_eq!(created["recurrence"], "Weekly");
    assert_eq!(created["enabled"], true);
    let id = created["id"].as_i64().unwrap().to_string();

    let list = run_json(d, &["reminder", "list"]);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let updated = run_json(
        d,
        &["reminder", "update", &id, "--message", "the ferns too", "--due", "2030-03-02 09:30"],
    );
    assert_eq!(updated["message"], "the ferns too");
    assert_eq!(updated["due_time"], "2030-03-02 09:30");

    let recurred = run_json(d, &["reminder", "recur", &id]);
    assert_eq!(recurred["recurrence"], "Monthly");

    let disabled = run_json(d, &["reminder", "disable", &id]);
    assert_eq!(disabled["enabled"], false);
    let enabled_only = run_json(d, &["reminder", "list", "--enabled"]);
    assert!(enabled_only.as_array().unwrap().is_empty());

    let all = run_json(d, &["reminder", "enable-all"]);
    assert_eq!(all["changed"], 1);

    let deleted = run_json(d, &["reminder", "delete", &id]);
    assert_eq!(deleted["deleted"].as_i64().unwrap().to_string(), id);

    let (_, stderr, code) = run_cli(d, &["reminder", "get", &id]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
}

#[test]
fn test_reminder_add_rejects_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();

    let (_, _, code) = run_cli(d, &["reminder", "add", "   "]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(d, &["reminder", "add", "x", "--due", "tomorrow"]);
    assert_ne!(code, 0);
    let (_, _, code) = run_cli(d, &["reminder", "add", "x", "--recurrence", "hourly"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_get_set() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();

    let (stdout, _, code) = run_cli(d, &["config", "get", "reminders.after_dismiss"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "disable");

    let set = run_json(d, &["config", "set", "reminders.after_dismiss", "keep"]);
    assert_eq!(set["value"], "keep");
    let set = run_json(d, &["config", "set", "poller.tick_ms", "250"]);
    assert_eq!(set["value"], "250");
    let (stdout, _, _) = run_cli(d, &["config", "get", "reminders.after_dismiss"]);
    assert_eq!(stdout.trim(), "keep");

    let (_, _, code) = run_cli(d, &["config", "set", "poller.tick_ms", "fast"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(d, &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);

    let listed = run_json(d, &["config", "list"]);
    assert_eq!(listed["notifications"]["default_snooze_minutes"], 10);
    assert_eq!(listed["poller"]["tick_ms"], 250);

    let reset = run_json(d, &["config", "reset"]);
    assert_eq!(reset["reminders"]["after_dismiss"], "disable");
}

#[test]
fn test_stats() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    run_json(d, &["reminder", "add", "past", "--due", "2000-01-01 00:00"]);
    run_json(d, &["reminder", "add", "future", "--due", "2999-01-01 00:00", "--recurrence", "daily"]);

    let stats = run_json(d, &["stats"]);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["enabled"], 2);
    assert_eq!(stats["recurring"], 1);
    assert_eq!(stats["overdue"], 1);
}

#[test]
fn test_sound_settings() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    std::fs::write(d.join("chime.wav"), b"RIFF").unwrap();

    let shown = run_json(d, &["sound", "show"]);
    assert!(shown["sound_file"].is_null());
    assert_eq!(shown["source"], "platform_alias");

    let chime = d.join("chime.wav");
    let set = run_json(d, &["sound", "set", chime.to_str().unwrap()]);
    assert_eq!(set["sound_file"], "chime.wav");

    let shown = run_json(d, &["sound", "show"]);
    assert!(shown["source"]["file"].is_string());

    let played = run_json(d, &["sound", "test", "--mute", "--seconds", "0"]);
    assert!(played["played"]["file"].is_string());

    let (_, _, code) = run_cli(d, &["sound", "set", "/no/such/file.wav"]);
    assert_eq!(code, 1);

    run_json(d, &["sound", "clear"]);
    let shown = run_json(d, &["sound", "show"]);
    assert!(shown["sound_file"].is_null());
}

#[test]
fn test_watch_fires_and_dismisses() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    let created = run_json(
        d,
        &["reminder", "add", "Stand up", "--due", "2000-01-01 09:00"],
    );
    let id = created["id"].as_i64().unwrap();

    let mut child = cli(d)
        .args(["watch", "--mute"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to start watch");
    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    let mut read_event = || -> Value {
        let mut line = String::new();
        stdout.read_line(&mut line).unwrap();
        serde_json::from_str(&line).expect("watch printed a non-JSON line")
    };

    let fired = read_event();
    assert_eq!(fired["type"], "ReminderFired");
    assert_eq!(fired["id"], id);
    assert_eq!(read_event()["type"], "SoundStarted");

    writeln!(stdin, "snooze {id} 0").unwrap();
    writeln!(stdin, "dismiss {id}").unwrap();
    let dismissed = read_event();
    assert_eq!(dismissed["type"], "ReminderDismissed");
    assert_eq!(dismissed["disabled"], true);

    writeln!(stdin, "quit").unwrap();
    let shutdown = read_event();
    assert_eq!(shutdown["type"], "EngineShutdown");
    assert_eq!(shutdown["dismissed"], 0);
    assert!(child.wait().unwrap().success());

    let stored = run_json(d, &["reminder", "get", &id.to_string()]);
    assert_eq!(stored["enabled"], false);
    assert_eq!(stored["due_time"], "2000-01-01 09:00");
}

#[test]
fn test_watch_closed_stdout_still_dismisses_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    let daily = run_json(
        d,
        &["reminder", "add", "Pills", "--due", "2000-01-01 09:00", "--recurrence", "daily"],
    );
    let once = run_json(d, &["reminder", "add", "Call back", "--due", "2000-01-01 09:00"]);

    let mut child = cli(d)
        .args(["watch", "--mute"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to start watch");
    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    let mut line = String::new();
    stdout.read_line(&mut line).unwrap();
    assert!(line.contains("ReminderFired"), "first line: {line}");

    // Close the reading end, then ask for more output.
    drop(stdout);
    writeln!(stdin, "list").unwrap();
    let status = child.wait().unwrap();
    assert!(status.success(), "watch exited with {status}");
    drop(stdin);

    let daily = run_json(d, &["reminder", "get", &daily["id"].to_string()]);
    assert_eq!(daily["due_time"], "2000-01-02 09:00");
    assert_eq!(daily["enabled"], true);
    let once = run_json(d, &["reminder", "get", &once["id"].to_string()]);
    assert_eq!(once["enabled"], false);
}
