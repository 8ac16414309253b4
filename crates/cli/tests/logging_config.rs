use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn write_config(root: &std::path::Path, logging: &str) -> std::path::PathBuf {
    let vault = root.join("vault");
    fs::create_dir_all(&vault).unwrap();
    fs::write(vault.join("a.md"), "# A\n").unwrap();

    let config_path = root.join("config.toml");
    let content = format!("version = 1\nvault = \"{}\"\n\n[logging]\n{}", vault.display(), logging);
    fs::write(&config_path, content).unwrap();
    config_path
}

fn quire() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("quire"));
    cmd.env_remove("QUIRE_VAULT");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_logging_to_file() {
    let dir = tempdir().unwrap();
    let log_file = dir.path().join("quire.log");
    let config_path =
        write_config(dir.path(), &format!("level = \"debug\"\nfile = \"{}\"\n", log_file.display()));

    quire().arg("--config").arg(&config_path).arg("reindex").assert().success();

    assert!(log_file.exists(), "Log file should be created");
}

#[test]
fn test_default_vault_from_config() {
    let dir = tempdir().unwrap();
    let config_path = write_config(dir.path(), "level = \"trace\"\n");

    quire()
        .arg("--config")
        .arg(&config_path)
        .args(["--json", "reindex"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"files_indexed\": 1"));

    assert!(dir.path().join("vault/.quire/index.db").exists());
}

#[test]
fn test_logging_split_levels() {
    let dir = tempdir().unwrap();
    let log_file = dir.path().join("split.log");
    let config_path = write_config(
        dir.path(),
        &format!("level = \"error\"\nfile_level = \"debug\"\nfile = \"{}\"\n", log_file.display()),
    );

    quire()
        .arg("--config")
        .arg(&config_path)
        .arg("reindex")
        .assert()
        .success()
        .stderr(predicate::str::contains("DEBUG").not());

    assert!(log_file.exists());
}

#[test]
fn test_missing_config_is_an_error() {
    let dir = tempdir().unwrap();
    quire()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.toml"));
}
