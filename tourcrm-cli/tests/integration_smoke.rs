//! Smoke tests to verify command wiring without a database or portal

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the developer's `.env`, config files and variables
fn tourcrm(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tourcrm").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("DATABASE_URL")
        .env_remove("BITRIX24_WEBHOOK_URL")
        .env_remove("BITRIX24_TOURIST_ENTITY_TYPE_ID");
    cmd
}

#[test]
fn test_top_level_help_lists_commands() {
    let home = TempDir::new().unwrap();
    tourcrm(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("bitrix"))
        .stdout(predicate::str::contains("report"));
}

#[test]
fn test_serve_help() {
    let home = TempDir::new().unwrap();
    tourcrm(&home)
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--cors-permissive"));
}

#[test]
fn test_report_summary_help() {
    let home = TempDir::new().unwrap();
    tourcrm(&home)
        .args(["report", "summary", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--include-cancelled"));
}

#[test]
fn test_report_summary_rejects_bad_event_id() {
    let home = TempDir::new().unwrap();
    tourcrm(&home)
        .args(["report", "summary", "--event", "not-a-uuid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_migrate_without_database_url_fails() {
    let home = TempDir::new().unwrap();
    tourcrm(&home)
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL not set"));
}

#[test]
fn test_bitrix_check_without_webhook_fails() {
    let home = TempDir::new().unwrap();
    tourcrm(&home)
        .args(["bitrix", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured"));
}

#[test]
fn test_bitrix_disabled_in_config_file() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("tourcrm.toml"),
        "[bitrix]\nenabled = false\nwebhook_url = \"https://acme.bitrix24.ru/rest/1/x/\"\n",
    )
    .unwrap();
    tourcrm(&home)
        .args(["bitrix", "setup-fields"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured"));
}

#[test]
fn test_invalid_config_file_reported() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("tourcrm.toml"), "[server\n").unwrap();
    tourcrm(&home)
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid TOML"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    tourcrm(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tourcrm"));
}
