#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TYPES: &str = r#"
[types.root]
sub_entry_types = ["show"]

[types.show]
sub_entry_types = ["shot"]
properties = [
    { name = "fps", type = "int", value = "24", inherit = true },
    { name = "search", type = "search", value = "waiting|type=shot status=wait" },
]
environs = [{ name = "SHOW", type = "entry_name", value = "." }]

[types.shot]
sub_entries = [{ name = "comp", type = "task" }]
sub_entry_types = ["task"]
properties = [{ name = "status", type = "text", value = "wait" }]

[types.task]
properties = [{ name = "status", type = "text" }]
"#;

fn setup() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("types.toml"), TYPES).unwrap();
    fs::write(temp.path().join("forge.toml"), "schema_file = \"types.toml\"\n").unwrap();
    temp
}

fn forge_cmd(data_dir: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin("forge"));
    for var in [
        "FORGE_DATA_DIR",
        "FORGE_SCHEMA_FILE",
        "FORGE_USER",
        "FORGE_LOG",
        "RUST_LOG",
        "CLICOLOR_FORCE",
    ] {
        cmd.env_remove(var);
    }
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

fn seed(dir: &Path) {
    forge_cmd(dir).args(["user", "add", "ada", "--called", "Ada"]).assert().success();
    forge_cmd(dir).args(["user", "add", "kim"]).assert().success();
    forge_cmd(dir).args(["add", "/", "show"]).assert().success();
    forge_cmd(dir).args(["add", "/show", "s01"]).assert().success();
    forge_cmd(dir).args(["add", "/show", "s02"]).assert().success();
}

#[test]
fn test_add_applies_defaults_and_inherits() {
    let temp = setup();
    let dir = temp.path();
    seed(dir);

    forge_cmd(dir)
        .args(["ls", "/show/s01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/show/s01/comp  task"));

    forge_cmd(dir)
        .args(["get", "/show/s01/comp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fps"))
        .stdout(predicate::str::contains("(from /show)"));

    forge_cmd(dir)
        .args(["env", "list", "/show/s01/comp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SHOW=show"));
}

#[test]
fn test_json_output_parses() {
    let temp = setup();
    let dir = temp.path();
    seed(dir);

    let output = forge_cmd(dir)
        .args(["--json", "ls", "/show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let paths: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["/show/s01", "/show/s02"]);
}

#[test]
fn test_access_hides_and_grants() {
    let temp = setup();
    let dir = temp.path();
    seed(dir);

    forge_cmd(dir)
        .args(["--user", "kim", "get", "/show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: not found"));

    forge_cmd(dir).args(["access", "add", "/show", "kim", "r"]).assert().success();

    forge_cmd(dir)
        .args(["--user", "kim", "ls", "/show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/show/s02"));

    forge_cmd(dir)
        .args(["--user", "kim", "prop", "set", "/show/s01", "status", "wip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission denied"));
}

#[test]
fn test_prop_set_and_history() {
    let temp = setup();
    let dir = temp.path();
    seed(dir);

    forge_cmd(dir)
        .args(["--user", "ada", "prop", "set", "/show/s01", "status", "wip"])
        .assert()
        .success()
        .stdout(predicate::str::contains("= wip"));

    forge_cmd(dir)
        .args(["log", "/show/s01", "--category", "property", "--name", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ada  update property status wip"));
}

#[test]
fn test_search_and_saved_search() {
    let temp = setup();
    let dir = temp.path();
    seed(dir);
    forge_cmd(dir).args(["prop", "set", "/show/s02", "status", "done"]).assert().success();

    forge_cmd(dir)
        .args(["search", "/", "type=shot", "status=done"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/show/s02"))
        .stdout(predicate::str::contains("/show/s01").not());

    forge_cmd(dir)
        .args(["search", "/show", "--saved", "waiting"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/show/s01"))
        .stdout(predicate::str::contains("/show/s02").not());
}

#[test]
fn test_rm_needs_recursive_for_subtrees() {
    let temp = setup();
    let dir = temp.path();
    seed(dir);

    forge_cmd(dir)
        .args(["rm", "/show/s01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conflict"));

    forge_cmd(dir)
        .args(["rm", "-r", "/show/s01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted /show/s01 and 1 sub-entries"));

    forge_cmd(dir)
        .args(["get", "/show/s01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_missing_schema_file_fails() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("forge.toml"), "schema_file = \"nope.toml\"\n").unwrap();

    forge_cmd(temp.path())
        .args(["ls"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
