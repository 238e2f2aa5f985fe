//! CLI integration tests.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn gluvol(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gluvol").unwrap();
    cmd.env_remove("GLUVOL_ROOT")
        .env_remove("GLUVOL_STATE_DIR")
        .env_remove("MOUNT_UNIQ")
        .env_remove("DEBUG")
        .arg("--root")
        .arg(dir.path().join("mounts"))
        .arg("--state-dir")
        .arg(dir.path().join("state"));
    cmd
}

#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin("gluvol").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("GlusterFS volume driver"));
}

#[test]
fn test_version_command() {
    let dir = TempDir::new().unwrap();
    gluvol(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("gluvol "));
}

#[test]
fn test_capabilities() {
    let dir = TempDir::new().unwrap();
    gluvol(&dir)
        .arg("capabilities")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""Scope": "local""#));
}

#[test]
fn test_volume_round_trip() {
    let dir = TempDir::new().unwrap();

    gluvol(&dir)
        .args(["create", "data", "-o", "voluri=node-1,node-2:gv0"])
        .assert()
        .success()
        .stdout("data\n");
    assert!(dir.path().join("mounts/data").is_dir());
    assert!(dir.path().join("state/persistence.json").is_file());

    gluvol(&dir)
        .args(["ls", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""Name": "data""#));

    gluvol(&dir)
        .args(["inspect", "data"])
        .assert()
        .success()
        .stdout(predicate::str::contains("node-1,node-2:gv0"));

    gluvol(&dir)
        .args(["path", "data"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mounts/data"));

    gluvol(&dir).args(["rm", "data"]).assert().success();
    assert!(!dir.path().join("mounts/data").exists());

    gluvol(&dir)
        .args(["ls", "-q"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_shared_mount_naming() {
    let dir = TempDir::new().unwrap();

    gluvol(&dir)
        .args(["--mount-uniq", "create", "data", "-o", "voluri=node-1:gv0"])
        .assert()
        .success();

    gluvol(&dir)
        .args(["path", "data"])
        .assert()
        .success()
        .stdout(predicate::str::ends_with("mounts/node-1:gv0\n"));
}

#[test]
fn test_invalid_voluri() {
    let dir = TempDir::new().unwrap();
    gluvol(&dir)
        .args(["create", "data", "-o", "voluri=missing-volume"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("voluri option is malformed"));
}

#[test]
fn test_inspect_unknown_volume() {
    let dir = TempDir::new().unwrap();
    gluvol(&dir)
        .args(["inspect", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Volume not found: nope"));
}
