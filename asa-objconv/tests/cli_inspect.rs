use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn inspect_prints_tree_with_attributes() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("asa-objconv"));
    cmd.arg("inspect")
        .arg(fixture("fixtures/export_sample.xml"))
        .arg("--depth")
        .arg("2")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "generic_import_export build=11575 update_package_version=1773",
        ))
        .stdout(predicate::str::contains("  network name=Madaba2 broadcast=true"))
        .stdout(predicate::str::contains("    protocol = tcp"));
}

#[test]
fn inspect_depth_zero_shows_only_root() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("asa-objconv"));
    cmd.arg("inspect")
        .arg(fixture("fixtures/export_sample.xml"))
        .arg("--depth")
        .arg("0")
        .assert()
        .success()
        .stdout(predicate::str::contains("host").not());
}
