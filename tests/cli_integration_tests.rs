// CLI behaviour of the continuation-fetch binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn cli(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("continuation-fetch").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env("CONTINUATION_FETCH_PROFILE_LOOKUP__LATENCY_MS", "1")
        .env("CONTINUATION_FETCH_IMAGE_LOOKUP__LATENCY_MS", "1");
    cmd
}

#[test]
fn test_default_run_fetches_user_one() {
    let dir = tempfile::tempdir().unwrap();

    cli(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "UserDto(profile=Profile(id=1), image=Image(id=1))",
        ));
}

#[test]
fn test_fetch_json_output() {
    let dir = tempfile::tempdir().unwrap();

    let output = cli(&dir)
        .args(["fetch", "--user-id", "7", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let dto: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(dto["profile"]["id"], 7);
    assert_eq!(dto["image"]["id"], 7);
}

#[test]
fn test_native_fetch_matches() {
    let dir = tempfile::tempdir().unwrap();

    cli(&dir)
        .args(["fetch", "--user-id", "4", "--native"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile(id=4)"));
}

#[test]
fn test_unknown_user_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("continuation-fetch.toml"),
        "[profile_lookup]\nknown_keys = [1]\n",
    )
    .unwrap();

    cli(&dir)
        .args(["fetch", "--user-id", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fetch_profile"));
}

#[test]
fn test_batch_reports_each_user() {
    let dir = tempfile::tempdir().unwrap();

    cli(&dir)
        .args(["batch", "1", "2", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("user 2: UserDto(profile=Profile(id=2)"))
        .stdout(predicate::str::contains("started=3 resumed=0 completed=3 failed=0"));
}

#[test]
fn test_resume_from_snapshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("state.json");
    fs::write(
        &snapshot,
        r#"{"user_id":5,"step":"fetch_image","profile":{"id":5},"image":null}"#,
    )
    .unwrap();

    cli(&dir)
        .args(["resume", "--snapshot"])
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Image(id=5)"));
}

#[test]
fn test_resume_finished_snapshot_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("done.json");
    fs::write(
        &snapshot,
        r#"{"user_id":1,"step":"done","profile":{"id":1},"image":{"id":1}}"#,
    )
    .unwrap();

    cli(&dir)
        .args(["resume", "--snapshot"])
        .arg(&snapshot)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already complete"));
}

#[test]
fn test_resume_rejects_user_id_flag() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("state.json");
    fs::write(
        &snapshot,
        r#"{"user_id":5,"step":"fetch_image","profile":{"id":5},"image":null}"#,
    )
    .unwrap();

    // the owning user always comes from the snapshot
    cli(&dir)
        .args(["resume", "--user-id", "1", "--snapshot"])
        .arg(&snapshot)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user-id"));
}

#[test]
fn test_config_shows_environment_override() {
    let dir = tempfile::tempdir().unwrap();

    cli(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[profile_lookup]"))
        .stdout(predicate::str::contains("latency_ms = 1"));
}
