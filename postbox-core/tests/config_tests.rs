//! Config load/save error-message and atomic-write-safety tests.

use std::fs;

use assert_fs::prelude::*;
use postbox_core::{
    config::{self, config_path_at},
    Config, ConfigError, RepoConfig,
};
use predicates::prelude::predicate;
use rstest::rstest;

fn sample() -> Config {
    Config {
        repo: RepoConfig::new("neon", "blog"),
        ..Config::default()
    }
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let dir = home.path().join(".postbox");
    fs::create_dir_all(&dir).expect("mkdir");
    fs::write(dir.join("config.yaml"), b": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"), "must contain file path, got: {err}");
}

#[rstest]
#[case::only_repo("repo:\n  owner: neon\n  name: blog\n", "main", 3)]
#[case::custom_branch("repo:\n  owner: neon\n  name: blog\n  branch: gh-pages\n", "gh-pages", 3)]
#[case::custom_retry(
    "repo:\n  owner: neon\n  name: blog\nretry:\n  max_attempts: 5\n",
    "main",
    5
)]
fn partial_files_fill_in_defaults(
    #[case] yaml: &str,
    #[case] branch: &str,
    #[case] attempts: u32,
) {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".postbox/config.yaml").write_str(yaml).expect("write");

    let loaded = config::load_at(home.path()).expect("load");
    assert_eq!(loaded.repo.owner, "neon");
    assert_eq!(loaded.repo.branch, branch);
    assert_eq!(loaded.retry.max_attempts, attempts);
    assert_eq!(loaded.retry.backoff_step_ms, 500);
    assert_eq!(loaded.repo.assets_prefix, "blog-images");
    loaded.validate().expect("valid");
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn save_then_load_round_trips() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let path = config::save_at(home.path(), &sample()).expect("save");
    assert_eq!(path, config_path_at(home.path()));

    let loaded = config::load_at(home.path()).expect("load");
    assert_eq!(loaded, sample());
}

#[test]
fn save_cleans_up_tmp_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &sample()).expect("save");

    home.child(".postbox/config.yaml.tmp")
        .assert(predicate::path::missing());
    home.child(".postbox/config.yaml")
        .assert(predicate::str::contains("owner: neon"));
}

#[cfg(unix)]
#[test]
fn saved_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let home = assert_fs::TempDir::new().expect("tempdir");
    let path = config::save_at(home.path(), &sample()).expect("save");
    let mode = fs::metadata(path).expect("metadata").permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}
