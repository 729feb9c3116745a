use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn gallery() -> Command {
    let mut cmd = Command::cargo_bin("repo-gallery").expect("bin");
    cmd.env_remove("REPO_GALLERY_SOURCE__OWNER")
        .env_remove("REPO_GALLERY_SOURCE__REPO");
    cmd
}

#[test]
fn prints_version() {
    gallery()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    gallery()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("repo-gallery"))
        .stdout(predicate::str::contains("--print-config"));
}

#[test]
fn print_config_shows_defaults_and_env_overrides() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.yaml");
    fs::write(&path, "source:\n  folder: art\n").expect("write config");

    gallery()
        .arg("--config")
        .arg(&path)
        .arg("--print-config")
        .env("REPO_GALLERY_SOURCE__BRANCH", "gh-pages")
        .assert()
        .success()
        .stdout(predicate::str::contains("owner: mayank19o7"))
        .stdout(predicate::str::contains("folder: art"))
        .stdout(predicate::str::contains("branch: gh-pages"))
        .stdout(predicate::str::contains("search_debounce: 200ms"));
}

#[test]
fn missing_config_file_fails() {
    gallery()
        .args(["--config", "/definitely/not/here.yaml", "--print-config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn unknown_argument_is_rejected() {
    gallery()
        .arg("--frobnicate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown argument"));
}
