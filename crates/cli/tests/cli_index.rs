//! Reindex, resolve and query commands through the binary.

use assert_cmd::prelude::*;
use insta::assert_snapshot;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::{tempdir, TempDir};

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn setup_vault() -> TempDir {
    let tmp = tempdir().unwrap();
    let vault = tmp.path().join("vault");
    write(&vault, "schema.yaml", "types:\n  person:\n    name_field: name\n");
    write(
        &vault,
        "people/freya.md",
        "---\ntype: person\nname: Freya\nalias: The Queen\ntags: [friend]\n---\n# Freya\n\nMet at [[projects/alpha]]\n",
    );
    write(&vault, "clients/freya.md", "# Freya (client)\n");
    write(&vault, "projects/alpha.md", "---\ndue: 2026-03-01\n---\n# Alpha\n\n- @todo call [[The Queen]]\n");
    tmp
}

fn quire(tmp: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("quire"));
    cmd.env("NO_COLOR", "1");
    cmd.env("XDG_CONFIG_HOME", tmp.path().join("xdg"));
    cmd.env_remove("QUIRE_VAULT");
    cmd.env_remove("RUST_LOG");
    cmd.arg("--vault").arg(tmp.path().join("vault"));
    cmd
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    serde_json::from_slice(&output.stdout).unwrap()
}

fn reindex(tmp: &TempDir) -> Value {
    json_output(quire(tmp).args(["--json", "reindex"]))
}

#[test]
fn reindex_then_incremental_noop() {
    let tmp = setup_vault();

    let first = reindex(&tmp);
    assert_eq!(first["ok"], true);
    assert_eq!(first["data"]["files_indexed"], 3);
    assert_eq!(first["data"]["refs_resolved"], 2);
    assert!(tmp.path().join("vault/.quire/index.db").exists());

    let second = reindex(&tmp);
    assert_eq!(second["data"]["files_indexed"], 0);
    assert_eq!(second["data"]["files_skipped"], 3);
    assert_eq!(second["data"]["incremental"], true);
}

#[test]
fn reindex_text_summary() {
    let tmp = setup_vault();
    quire(&tmp)
        .args(["reindex", "--full"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexing complete (full)"))
        .stdout(predicate::str::contains("Files indexed:  3"));
}

#[test]
fn resolve_reports_strategy() {
    let tmp = setup_vault();
    reindex(&tmp);

    let out = json_output(quire(&tmp).args(["--json", "resolve", "The Queen"]));
    assert_eq!(out["ok"], true);
    assert_eq!(out["data"]["resolved"], true);
    assert_eq!(out["data"]["object_id"], "people/freya");
    assert_eq!(out["data"]["match_source"], "alias");
}

#[test]
fn resolve_ambiguous_fails_with_matches() {
    let tmp = setup_vault();
    reindex(&tmp);

    let output = quire(&tmp).args(["--json", "resolve", "freya"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let out: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(out["ok"], false);
    assert_eq!(out["data"]["ambiguous"], true);
    let matches = out["data"]["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 2);
    assert!(matches.iter().all(|m| m["match_source"] == "short_name"));
}

#[test]
fn resolve_unknown_exits_nonzero() {
    let tmp = setup_vault();
    reindex(&tmp);
    quire(&tmp)
        .args(["resolve", "nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Reference not found: nobody"));
}

#[test]
fn queries_read_the_index() {
    let tmp = setup_vault();
    reindex(&tmp);

    let stats = json_output(quire(&tmp).args(["--json", "stats"]));
    assert_eq!(stats["data"]["file_count"], 3);

    let backlinks = json_output(quire(&tmp).args(["--json", "backlinks", "people/freya"]));
    let refs = backlinks["data"].as_array().unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0]["file_path"], "projects/alpha.md");

    let untyped = json_output(quire(&tmp).args(["--json", "untyped"]));
    assert_eq!(untyped["data"], serde_json::json!(["clients/freya", "projects/alpha"]));

    let tags = json_output(quire(&tmp).args(["--json", "tags", "friend"]));
    assert_eq!(tags["data"][0]["object_id"], "people/freya");

    let traits = json_output(quire(&tmp).args(["--json", "traits", "todo"]));
    assert_eq!(traits["data"][0]["id"], "projects/alpha.md:trait:0");

    let dates = json_output(quire(&tmp).args(["--json", "dates", "2026-03-01"]));
    assert_eq!(dates["data"][0]["source_id"], "projects/alpha");
    assert_eq!(dates["data"][0]["field_name"], "due");
}

#[test]
fn tags_table_text() {
    let tmp = setup_vault();
    reindex(&tmp);
    let output = quire(&tmp).arg("tags").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_snapshot!(stdout.trim_end(), @r"
    ╭────────┬───────╮
    │ TAG    │ COUNT │
    ├────────┼───────┤
    │ friend │ 1     │
    ╰────────┴───────╯

    -- 1 tags --
    ");
}

#[test]
fn stats_on_fresh_vault_is_empty() {
    let tmp = setup_vault();
    quire(&tmp).args(["stats"]).assert().success().stdout(predicate::str::contains("Files:       0"));
}

#[test]
fn missing_vault_is_an_error() {
    let tmp = tempdir().unwrap();
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("quire"));
    cmd.env("XDG_CONFIG_HOME", tmp.path());
    cmd.args(["--json", "--vault"]).arg(tmp.path().join("absent")).arg("stats");
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("\"ok\": false"))
        .stdout(predicate::str::contains("Vault directory not found"));
}
