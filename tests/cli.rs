use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn hoegye(home: &Path, db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hoegye").unwrap();
    cmd.env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("HOEGYE_DB")
        .env_remove("RUST_LOG")
        .arg("--db")
        .arg(db);
    cmd
}

fn setup() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data").join("hoegye.db");
    hoegye(dir.path(), &db)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized database"));
    (dir, db)
}

#[test]
fn init_creates_database() {
    let (_dir, db) = setup();
    assert!(db.exists());
}

#[test]
fn missing_database_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    hoegye(dir.path(), &dir.path().join("nope.db"))
        .args(["rules", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hoegye init"));
}

#[test]
fn status_reports_counts_after_demo() {
    let (dir, db) = setup();
    hoegye(dir.path(), &db).arg("demo").assert().success();
    hoegye(dir.path(), &db)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Transactions:  100"))
        .stdout(predicate::str::contains("Rules:         2 (2 active)"));
}

#[test]
fn demo_loads_once() {
    let (dir, db) = setup();
    hoegye(dir.path(), &db).arg("demo").assert().success();
    hoegye(dir.path(), &db)
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("already present"));
}

#[test]
fn transaction_entry_uses_matching_rule() {
    let (dir, db) = setup();
    hoegye(dir.path(), &db).arg("demo").assert().success();
    hoegye(dir.path(), &db)
        .args([
            "transactions", "add", "--account", "1", "--amount", "-4500",
            "--counterparty", "스타벅스", "--description", "아메리카노", "--date", "2025-03-01",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("classified by rule 1"));
}

#[test]
fn rule_lifecycle() {
    let (dir, db) = setup();
    hoegye(dir.path(), &db).arg("demo").assert().success();

    hoegye(dir.path(), &db)
        .args([
            "rules", "add", "수수료 입금", "--field", "description", "--value", "수수료",
            "--priority", "5", "--category", "6",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added rule 3"));

    hoegye(dir.path(), &db)
        .args(["rules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("수수료 입금"));

    hoegye(dir.path(), &db)
        .args(["rules", "toggle", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled"));

    hoegye(dir.path(), &db)
        .args(["rules", "apply", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("건의 거래가 분류되었습니다."));
}

#[test]
fn unknown_rule_is_an_error() {
    let (dir, db) = setup();
    hoegye(dir.path(), &db)
        .args(["rules", "toggle", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No rule with ID 42"));
}

#[test]
fn invalid_regex_rule_is_saved_with_warning() {
    let (dir, db) = setup();
    hoegye(dir.path(), &db)
        .args(["rules", "add", "broken", "--type", "regex", "--value", "("])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added rule 1"))
        .stderr(predicate::str::contains("never matches"));
    hoegye(dir.path(), &db)
        .args(["rules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("broken"));
}

#[test]
fn non_finite_amounts_are_rejected() {
    let (dir, db) = setup();
    hoegye(dir.path(), &db).arg("demo").assert().success();
    hoegye(dir.path(), &db)
        .args(["transactions", "add", "--account", "1", "--amount", "inf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid amount"));
    hoegye(dir.path(), &db)
        .args(["transactions", "split", "2", "--part", "inf", "--part", "-inf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid split"));
}

#[test]
fn transaction_list_filters() {
    let (dir, db) = setup();
    hoegye(dir.path(), &db).arg("demo").assert().success();
    hoegye(dir.path(), &db)
        .args(["transactions", "list", "--search", "수수료", "--limit", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("프로젝트 수수료 입금"))
        .stdout(predicate::str::contains("스타벅스 강남점").not());
}

#[test]
fn classify_reports_counts() {
    let (dir, db) = setup();
    hoegye(dir.path(), &db).arg("demo").assert().success();
    hoegye(dir.path(), &db)
        .arg("classify")
        .assert()
        .success()
        .stdout(predicate::str::contains("transactions changed"));
}

#[test]
fn split_replaces_parent() {
    let (dir, db) = setup();
    hoegye(dir.path(), &db).arg("demo").assert().success();
    // TXN-000001: -12000 office supplies, database id 2
    hoegye(dir.path(), &db)
        .args(["transactions", "split", "2", "--part", "-7000:사무용품 A", "--part", "-5000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Split transaction 2 into"));
    hoegye(dir.path(), &db)
        .args(["transactions", "split", "3", "--part", "-1", "--part", "-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid split"));
}
