use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn postbox_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("postbox"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("POSTBOX_TOKEN")
        .env_remove("POSTBOX_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn digest_prints_sha256_hex() {
    let home = TempDir::new().expect("home");
    postbox_cmd(home.path())
        .args(["digest", "abc"])
        .assert()
        .success()
        .stdout("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad\n");
}

#[test]
fn config_init_writes_yaml_under_home() {
    let home = TempDir::new().expect("home");
    postbox_cmd(home.path())
        .args(["config", "init", "--owner", "neon", "--repo", "blog", "--branch", "pages"])
        .assert()
        .success()
        .stdout(contains("Configured neon/blog (pages)"));

    let yaml = fs::read_to_string(home.path().join(".postbox/config.yaml")).expect("config");
    assert!(yaml.contains("owner: neon"));
    assert!(yaml.contains("branch: pages"));
    assert!(yaml.contains("max_attempts: 3"));

    postbox_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("name: blog"))
        .stdout(contains("posts_path: posts.json"));
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let home = TempDir::new().expect("home");
    postbox_cmd(home.path())
        .args(["config", "init", "--owner", "a", "--repo", "b"])
        .assert()
        .success();

    postbox_cmd(home.path())
        .args(["config", "init", "--owner", "c", "--repo", "d"])
        .assert()
        .failure()
        .stderr(contains("already exists"));

    postbox_cmd(home.path())
        .args(["config", "init", "--owner", "c", "--repo", "d", "--force"])
        .assert()
        .success();
}

#[test]
fn posts_without_config_points_at_init() {
    let home = TempDir::new().expect("home");
    postbox_cmd(home.path())
        .arg("posts")
        .assert()
        .failure()
        .stderr(contains("postbox config init"));
}

#[test]
fn admin_requires_a_token() {
    let home = TempDir::new().expect("home");
    postbox_cmd(home.path())
        .args(["admin", "--username", "editor"])
        .assert()
        .failure()
        .stderr(contains("--token"));
}
