use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn check_lists_classified_objects() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("asa-objconv"));
    cmd.arg("check")
        .arg(fixture("fixtures/asa_objects.cfg"))
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("network=Kaspersky10 kind=fqdn"))
        .stdout(predicate::str::contains("network=T3 kind=range"))
        .stdout(predicate::str::contains("service=EMP kind=service"))
        .stdout(predicate::str::contains("objects=5 errors=0 skipped_lines=5"));
}

#[test]
fn check_fails_when_objects_are_rejected() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("asa-objconv"));
    cmd.arg("check")
        .arg(fixture("fixtures/asa_mixed.cfg"))
        .env("NO_COLOR", "1")
        .assert()
        .failure()
        .stdout(predicate::str::contains("REJECT line=5 network=BadMask"))
        .stdout(predicate::str::contains("PARSE line=6 network=<unnamed>"))
        .stderr(predicate::str::contains("check failed: 4 object(s) rejected"));
}

#[test]
fn check_json_reports_kinds() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("asa-objconv"));
    cmd.arg("check")
        .arg(fixture("fixtures/asa_objects.cfg"))
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"subnet\""))
        .stdout(predicate::str::contains("\"prefix\": 24"))
        .stdout(predicate::str::contains("\"protocol\": \"tcp\""));
}
