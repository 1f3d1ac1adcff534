//! Exit-code contract of the command line tool.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("webgal_apk_builder").expect("binary");
    cmd.env_remove("WEBGAL_APK_LIB_DIR");
    cmd
}

fn project(root: &Path) -> std::path::PathBuf {
    let project = root.join("public/games/demo");
    std::fs::create_dir_all(project.join("game")).expect("mkdir");
    std::fs::write(
        project.join("game/config.txt"),
        "Game_name:Demo;\nPackage_name:com.example.demo;\nVersion_code:2;\n",
    )
    .expect("write");
    project
}

#[test]
fn test_missing_project_argument_exits_1() {
    bin()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PROJECT"));
}

#[test]
fn test_help_exits_0() {
    bin()
        .arg("--help")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("--create-keystore"));
}

#[test]
fn test_nonexistent_project_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    bin()
        .arg(tmp.path().join("no-such-game"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_missing_config_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    bin()
        .arg(tmp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Game configuration not found"));
}

#[test]
fn test_progress_json_reports_missing_tools() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let project = project(tmp.path());
    let lib = tmp.path().join("empty-lib");
    std::fs::create_dir_all(&lib).expect("mkdir");

    bin()
        .arg(&project)
        .arg("--lib-dir")
        .arg(&lib)
        .arg("--progress-json")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""stage":"INITIALIZING""#))
        .stdout(predicate::str::contains(r#""stage":"ERROR""#))
        .stdout(predicate::str::contains(r#""message":"APKEditor not found""#))
        .stdout(predicate::str::contains(r#""success":false"#));
}

#[test]
fn test_progress_json_reports_missing_config() {
    let tmp = tempfile::tempdir().expect("tempdir");
    bin()
        .arg(tmp.path())
        .arg("--progress-json")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""stage":"ERROR""#))
        .stdout(predicate::str::contains(r#""success":false"#));
}

#[test]
fn test_missing_engine_dir_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let project = project(tmp.path());
    bin()
        .arg(&project)
        .arg("--engine-dir")
        .arg(tmp.path().join("no-engine"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--engine-dir"));
}
