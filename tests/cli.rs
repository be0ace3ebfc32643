//! Argument parsing and exit codes of the `autoinsert` binary.

use assert_cmd::Command;
use autoinsert::{Cli, config::CONFIG_ENV};
use clap::Parser;
use predicates::prelude::*;
use tempfile::TempDir;

fn autoinsert() -> Command {
    let mut cmd = Command::cargo_bin("autoinsert").expect("binary is built");
    cmd.env_remove(CONFIG_ENV);
    cmd
}

#[test]
fn test_cli_takes_selectors_that_look_like_flags() {
    let cli = Cli::parse_from([
        "autoinsert", "a.xlsx", "-1", "2", "3", "4", "5", "b.xlsx", "1", "2", "3", "4", "5",
    ]);
    assert_eq!(cli.args.len(), 12);
    assert_eq!(cli.args[1], "-1");
}

#[test]
fn test_cli_no_args() {
    let cli = Cli::parse_from(["autoinsert"]);
    assert!(cli.args.is_empty());
}

#[test]
fn test_wrong_arg_count_prints_usage_and_exits_2() {
    autoinsert()
        .args(["a", "b", "c", "d", "e"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("got 5"))
        .stdout(predicate::str::contains("Usage:").and(predicate::str::contains("Notes:")));
}

#[test]
fn test_missing_workbook_exits_2() {
    let dir = TempDir::new().expect("temp dir");
    let a = dir.path().join("a.xlsx");
    let b = dir.path().join("b.xlsx");

    autoinsert()
        .arg(&a)
        .arg(&b)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("File not found"));
    assert!(std::fs::read_dir(dir.path()).expect("list").next().is_none());
}

#[test]
fn test_bad_config_exits_1() {
    let dir = TempDir::new().expect("temp dir");
    let cfg = dir.path().join("autoinsert.json");
    std::fs::write(&cfg, r#"{ "preview_rows": 0 }"#).expect("write config");

    autoinsert()
        .env(CONFIG_ENV, &cfg)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid configuration."));
}

#[test]
fn test_unreadable_workbook_exits_1() {
    let dir = TempDir::new().expect("temp dir");
    let a = dir.path().join("a.xlsx");
    let b = dir.path().join("b.xlsx");
    std::fs::write(&a, b"not a zip").expect("write a");
    std::fs::write(&b, b"not a zip").expect("write b");

    autoinsert()
        .arg(&a)
        .arg(&b)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read Excel."));
}
