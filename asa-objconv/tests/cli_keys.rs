use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn objconv() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("asa-objconv"))
}

#[test]
fn keys_lists_what_convert_saved() {
    let dir = tempdir().expect("tempdir");
    let registry = dir.path().join("keys.json");

    objconv()
        .arg("convert")
        .arg("-")
        .arg("--registry")
        .arg(&registry)
        .write_stdin("object network WEB host 10.0.0.80\nobject service WEB service tcp destination eq 80\n")
        .assert()
        .success();

    objconv()
        .arg("keys")
        .arg(&registry)
        .assert()
        .success()
        .stdout(predicate::str::contains("- network 1195 WEB"))
        .stdout(predicate::str::contains("- service 1195 WEB"));

    objconv()
        .arg("keys")
        .arg(&registry)
        .arg("--namespace")
        .arg("service")
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"namespace\": \"service\""))
        .stdout(predicate::str::contains("\"network\"").not());
}

#[test]
fn keys_on_missing_registry_fails() {
    let dir = tempdir().expect("tempdir");
    objconv()
        .arg("keys")
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn keys_rejects_conflicting_registry() {
    let dir = tempdir().expect("tempdir");
    let registry = dir.path().join("keys.json");
    fs::write(&registry, r#"{"network": {"a": 5, "b": 5}}"#).expect("write");

    objconv()
        .arg("keys")
        .arg(&registry)
        .assert()
        .failure()
        .stderr(predicate::str::contains("maps both"));
}
