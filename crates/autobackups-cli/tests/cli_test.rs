//! CLI integration tests using assert_cmd
//!
//! These tests run the binary against a temporary home and backup root.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a command instance for the autobackups binary, isolated in `home`
fn autobackups_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("autobackups").expect("Failed to find autobackups binary");
    cmd.env("HOME", home).env_remove("AUTOBACKUPS_LOG");
    cmd
}

struct Workspace {
    temp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            temp: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn home(&self) -> &Path {
        self.temp.path()
    }

    fn backups(&self) -> PathBuf {
        self.temp.path().join("backups")
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let dir = self.temp.path().join("work");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn settings(&self, body: &str) -> PathBuf {
        let path = self.temp.path().join("settings.sublime-settings");
        fs::write(&path, body).unwrap();
        path
    }

    /// Command with `--backup-dir` pointing into the workspace
    fn cmd(&self) -> Command {
        let mut cmd = autobackups_cmd(self.home());
        cmd.arg("--backup-dir").arg(self.backups());
        cmd
    }
}

#[test]
fn test_help_command() {
    let ws = Workspace::new();
    autobackups_cmd(ws.home())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "AutoBackups - automatic backups of edited files",
        ));
}

#[test]
fn test_version_command() {
    let ws = Workspace::new();
    autobackups_cmd(ws.home())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("autobackups"));
}

#[test]
fn test_list_help() {
    let ws = Workspace::new();
    autobackups_cmd(ws.home())
        .args(["list", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("List the backups of a file, newest first"));
}

// =============================================================================
// Events
// =============================================================================

#[test]
fn test_save_then_list() {
    let ws = Workspace::new();
    let file = ws.file("doc.txt", "hello");

    ws.cmd()
        .arg("save")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Backup saved to: "));

    ws.cmd()
        .arg("list")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(" - doc.txt\t"));

    ws.cmd()
        .arg("latest")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(ws.backups().to_string_lossy().as_ref()))
        .stdout(predicate::str::ends_with("doc.txt\n"));
}

#[test]
fn test_list_json() {
    let ws = Workspace::new();
    let file = ws.file("doc.txt", "hello");
    ws.cmd().arg("save").arg(&file).assert().success();

    ws.cmd()
        .args(["list", "--json"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"backup\""));
}

#[test]
fn test_list_without_backups() {
    let ws = Workspace::new();
    let file = ws.file("doc.txt", "hello");

    ws.cmd()
        .arg("list")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found."));
}

#[test]
fn test_latest_without_backups_fails() {
    let ws = Workspace::new();
    let file = ws.file("doc.txt", "hello");

    ws.cmd()
        .arg("latest")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Error: Backups for this file not exists!",
        ));
}

#[test]
fn test_save_missing_file_fails() {
    let ws = Workspace::new();

    ws.cmd()
        .arg("save")
        .arg(ws.home().join("missing.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: File not found"));
}

#[test]
fn test_save_too_large_is_skipped() {
    let ws = Workspace::new();
    let settings = ws.settings(r#"{ "max_backup_file_size_bytes": 10 }"#);
    let file = ws.file("big.txt", "more than ten bytes");

    ws.cmd()
        .arg("--config")
        .arg(&settings)
        .arg("save")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped: file too large"));

    assert!(!ws.backups().exists());
}

#[test]
fn test_open_disabled_by_default() {
    let ws = Workspace::new();
    let file = ws.file("doc.txt", "hello");

    ws.cmd()
        .arg("open")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("backups on open are disabled"));
}

#[test]
fn test_open_twice_keeps_first_backup() {
    let ws = Workspace::new();
    let settings = ws.settings(r#"{ "backup_on_open_file": true }"#);
    let file = ws.file("doc.txt", "first");

    ws.cmd()
        .arg("--config")
        .arg(&settings)
        .arg("open")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup saved to: "));

    fs::write(&file, "second").unwrap();
    ws.cmd()
        .arg("--config")
        .arg(&settings)
        .arg("open")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped: backup already exists"));
}

#[test]
fn test_browse_prints_chosen_backup() {
    let ws = Workspace::new();
    let file = ws.file("doc.txt", "hello");
    ws.cmd().arg("save").arg(&file).assert().success();

    ws.cmd()
        .args(["browse", "--line", "4"])
        .arg(&file)
        .write_stdin("1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("doc.txt:4"));
}

// =============================================================================
// Maintenance
// =============================================================================

#[test]
fn test_gc_deletes_old_days() {
    let ws = Workspace::new();
    let old = ws.backups().join("2000-01-01/home");
    fs::create_dir_all(&old).unwrap();
    fs::write(old.join("doc.txt"), "old").unwrap();

    ws.cmd()
        .args(["gc", "--days", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 backup folders older than"));

    assert!(!ws.backups().join("2000-01-01").exists());
}

#[test]
fn test_gc_disabled_by_default() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.backups().join("2000-01-01")).unwrap();

    ws.cmd()
        .arg("gc")
        .assert()
        .success()
        .stdout(predicate::str::contains("Retention is disabled."));

    assert!(ws.backups().join("2000-01-01").is_dir());
}

#[test]
fn test_folder_prints_root() {
    let ws = Workspace::new();

    ws.cmd()
        .arg("folder")
        .assert()
        .success()
        .stdout(predicate::str::contains(ws.backups().to_string_lossy().as_ref()));
}

#[test]
fn test_donate_print() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["donate", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("https://www.paypal.com/"));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_reads_commented_settings() {
    let ws = Workspace::new();
    let settings = ws.settings(
        r#"{
    // keep a week of history
    "delete_old_backups": 7,
    "backup_per_time": "file", // HHMMSS in the name
    "backup_name_mode": "suffix"
}"#,
    );

    ws.cmd()
        .arg("--config")
        .arg(&settings)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"retention_days\": 7"))
        .stdout(predicate::str::contains("\"layout\": \"per_day_time_file\""))
        .stdout(predicate::str::contains("\"naming_mode\": \"suffix\""));
}

#[test]
fn test_config_default_settings_file_in_home() {
    let ws = Workspace::new();
    let dir = ws.home().join(".autobackups");
    fs::create_dir_all(&dir).unwrap();
    let name = match std::env::consts::OS {
        "windows" => "AutoBackups (Windows).sublime-settings",
        "macos" => "AutoBackups (OSX).sublime-settings",
        _ => "AutoBackups (Linux).sublime-settings",
    };
    fs::write(dir.join(name), r#"{ "default_browser": "firefox" }"#).unwrap();

    ws.cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"default_browser\": \"firefox\""));
}

#[test]
fn test_invalid_settings_fail() {
    let ws = Workspace::new();
    let settings = ws.settings(r#"{ "backup_per_time": "hourly" }"#);

    ws.cmd()
        .arg("--config")
        .arg(&settings)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
