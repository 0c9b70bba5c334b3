use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

use coworkers_core::config;

fn coworkers_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("coworkers"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("COWORKERS_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn sign_in_offline(home: &Path, endpoint: &str) {
    coworkers_cmd(home)
        .args([
            "sign-in",
            "--endpoint",
            endpoint,
            "--username",
            "anton@example.com",
            "--password",
            "secret",
            "--no-verify",
        ])
        .assert()
        .success()
        .stdout(contains("Signed in as 'anton@example.com'"));
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn second_sign_in_is_rejected() {
    let home = TempDir::new().expect("home");
    sign_in_offline(home.path(), "http://directory/rest/coworkers");

    let account = config::load_account_at(home.path()).expect("account saved");
    assert_eq!(account.endpoint, "http://directory/rest/coworkers");

    coworkers_cmd(home.path())
        .args([
            "sign-in",
            "--endpoint",
            "http://other",
            "--username",
            "olena",
            "--password",
            "pw",
            "--no-verify",
        ])
        .assert()
        .failure()
        .stderr(contains("already signed in as 'anton@example.com'"));
}

#[test]
fn sign_in_requires_a_password() {
    let home = TempDir::new().expect("home");

    coworkers_cmd(home.path())
        .args([
            "sign-in",
            "--endpoint",
            "http://directory",
            "--username",
            "anton",
            "--no-verify",
        ])
        .assert()
        .failure()
        .stderr(contains("password must not be empty"));

    assert!(!config::account_path_at(home.path()).exists());
}

#[test]
fn password_can_come_from_the_environment() {
    let home = TempDir::new().expect("home");

    coworkers_cmd(home.path())
        .env("COWORKERS_PASSWORD", "from-env")
        .args([
            "sign-in",
            "--endpoint",
            "http://directory",
            "--username",
            "anton",
            "--no-verify",
        ])
        .assert()
        .success();

    let account = config::load_account_at(home.path()).expect("account saved");
    assert_eq!(account.password, "from-env");
}

#[test]
fn sign_out_forgets_the_account() {
    let home = TempDir::new().expect("home");
    sign_in_offline(home.path(), "http://directory");

    coworkers_cmd(home.path())
        .args(["sign-out", "--purge"])
        .assert()
        .success()
        .stdout(contains("Signed out 'anton@example.com'"));
    assert!(config::find_account_at(home.path()).expect("read").is_none());

    coworkers_cmd(home.path())
        .arg("sign-out")
        .assert()
        .success()
        .stdout(contains("Not signed in."));
}

#[test]
fn settings_round_trip_through_the_cli() {
    let home = TempDir::new().expect("home");

    coworkers_cmd(home.path())
        .args(["settings", "set", "photos", "any"])
        .assert()
        .success();
    coworkers_cmd(home.path())
        .args(["settings", "set", "sync_frequency", "monthly"])
        .assert()
        .success();

    let output = coworkers_cmd(home.path())
        .args(["settings", "show", "--json"])
        .output()
        .expect("run settings show");
    assert!(output.status.success());
    let settings = stdout_json(&output);
    assert_eq!(settings["photos"], "any");
    assert_eq!(settings["sync_frequency"], "monthly");
    assert_eq!(settings["group_title"], "Coworkers");

    coworkers_cmd(home.path())
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(contains("prefer_native_names"));
}

#[test]
fn settings_reject_unknown_values() {
    let home = TempDir::new().expect("home");

    coworkers_cmd(home.path())
        .args(["settings", "set", "photos", "sometimes"])
        .assert()
        .failure()
        .stderr(contains("cannot set 'photos'"));
    coworkers_cmd(home.path())
        .args(["settings", "set", "colour", "blue"])
        .assert()
        .failure();

    assert!(!config::settings_path_at(home.path()).exists());
}

#[test]
fn status_without_account() {
    let home = TempDir::new().expect("home");

    coworkers_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Not signed in."));

    let output = coworkers_cmd(home.path())
        .args(["status", "--json"])
        .output()
        .expect("run status");
    let status = stdout_json(&output);
    assert_eq!(status["signed_in"], false);
    assert_eq!(status["daemon_running"], false);
}

#[test]
fn sync_needs_an_account() {
    let home = TempDir::new().expect("home");

    coworkers_cmd(home.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(contains("sign-in"));
}

#[test]
fn unreachable_directory_is_reported_and_recorded() {
    let home = TempDir::new().expect("home");
    sign_in_offline(home.path(), "http://127.0.0.1:9/rest/coworkers");

    coworkers_cmd(home.path())
        .args(["sync", "--timeout", "2"])
        .assert()
        .failure()
        .stderr(contains("directory-unavailable"));

    let output = coworkers_cmd(home.path())
        .args(["status", "--json"])
        .output()
        .expect("run status");
    let status = stdout_json(&output);
    assert_eq!(status["signed_in"], true);
    assert_eq!(status["last_run"]["status"], "directory-unavailable");
    assert!(status.get("next_run").is_none());
}

#[test]
fn rejects_unknown_network() {
    let home = TempDir::new().expect("home");

    coworkers_cmd(home.path())
        .args(["sync", "--network", "satellite"])
        .assert()
        .failure()
        .stderr(contains("expected: offline, metered, unmetered"));
}

#[test]
fn daemon_status_when_not_running() {
    let home = TempDir::new().expect("home");

    coworkers_cmd(home.path())
        .args(["daemon", "status"])
        .assert()
        .success()
        .stdout(contains("\"running\": false"));
    coworkers_cmd(home.path())
        .args(["daemon", "stop"])
        .assert()
        .success()
        .stdout(contains("daemon is not running"));
}
