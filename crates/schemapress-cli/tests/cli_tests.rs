//! CLI integration tests for schemapress.
//!
//! These tests verify command-line argument parsing, help output,
//! generated files and exit codes for various error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Get a command for the schemapress binary.
fn cmd() -> Command {
    Command::cargo_bin("schemapress").unwrap()
}

const MANIFEST: &str = r#"{
  "database": "shop",
  "generatedAt": "2026-01-01T00:00:00Z",
  "defaultPrefix": "wp_",
  "installerClass": "ShopInstaller",
  "tables": [
    {
      "name": "orders",
      "nameOriginal": "wp_orders",
      "fullName": "shop.wp_orders",
      "columns": [
        { "name": "id", "type": "bigint(20) unsigned", "nullable": false, "autoIncrement": true, "primaryKey": true },
        { "name": "created_at", "type": "datetime", "nullable": false, "default": "CURRENT_TIMESTAMP" }
      ]
    }
  ],
  "views": [
    {
      "name": "orders_v",
      "nameOriginal": "wp_orders_v",
      "fullName": "shop.wp_orders_v",
      "definition": "CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`%` SQL SECURITY DEFINER VIEW `wp_orders_v` AS select `shop`.`wp_orders`.`id` AS `id` from `shop`.`wp_orders`"
    }
  ]
}"#;

fn write_manifest(dir: &Path) -> PathBuf {
    let path = dir.join("manifest.json");
    fs::write(&path, MANIFEST).unwrap();
    path
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("manifest"))
        .stdout(predicate::str::contains("installer"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("request"));
}

#[test]
fn test_manifest_subcommand_help() {
    cmd()
        .args(["manifest", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--prefix"))
        .stdout(predicate::str::contains("--include-seed-data"))
        .stdout(predicate::str::contains("--row-limit"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("schemapress"));
}

// =============================================================================
// Installer Tests
// =============================================================================

#[test]
fn test_installer_writes_three_files() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path());
    let out = dir.path().join("plugin");

    cmd()
        .arg("installer")
        .arg(&manifest)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Installer ShopInstaller generated"));

    let class = fs::read_to_string(out.join("class-shop-installer.php")).unwrap();
    assert!(class.contains("class ShopInstaller"));
    assert!(class.contains("{$this->prefix}orders"));
    assert!(!class.contains("DEFINER"));
    assert!(out.join("shop-installer-installer.php").exists());
    assert!(out.join("shop-installer.php").exists());
}

#[test]
fn test_installer_class_override() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path());
    let out = dir.path().join("plugin");

    cmd()
        .arg("installer")
        .arg(&manifest)
        .args(["--class", "OrdersSetup", "--output-dir"])
        .arg(&out)
        .assert()
        .success();

    assert!(out.join("class-orders-setup.php").exists());
}

#[test]
fn test_installer_bad_class_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path());

    cmd()
        .arg("installer")
        .arg(&manifest)
        .args(["--class", "not a class", "--output-dir"])
        .arg(dir.path().join("plugin"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("not a valid PHP identifier"));
}

#[test]
fn test_installer_missing_manifest_exit_code() {
    cmd()
        .args(["installer", "/nonexistent/manifest.json"])
        .assert()
        .code(7);
}

// =============================================================================
// Validate Tests
// =============================================================================

#[test]
fn test_validate_accepts_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path());

    cmd()
        .arg("validate")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifest is valid"));
}

#[test]
fn test_validate_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path());

    cmd()
        .arg("--output-json")
        .arg("validate")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"errors\": []"));
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_invalid_config_exit_code() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "installer:\n  class_name: \"bad name\"").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path());

    cmd()
        .arg("--config")
        .arg(file.path())
        .arg("validate")
        .arg(&manifest)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_manifest_without_source_fails() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .arg("manifest")
        .arg("--output")
        .arg(dir.path().join("m.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("source section is required"));
}

// =============================================================================
// Request Tests
// =============================================================================

#[test]
fn test_request_compile_over_stdin() {
    let request = format!(
        r#"{{"command": "compile", "details": {{"manifest": {}}}, "requestId": "abc"}}"#,
        MANIFEST
    );

    cmd()
        .arg("request")
        .write_stdin(request)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\":true"))
        .stdout(predicate::str::contains("\"requestId\":\"abc\""))
        .stdout(predicate::str::contains("class-shop-installer.php"));
}

#[test]
fn test_request_unknown_command() {
    cmd()
        .arg("request")
        .write_stdin(r#"{"command": "format", "details": {}, "requestId": "x"}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\":false"))
        .stdout(predicate::str::contains("\"requestId\":\"x\""));
}
