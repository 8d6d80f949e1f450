//! Integration tests for `azp provision` and `azp download`.
//!
//! Every test stops before touching the host: at configuration, at OS
//! detection, at an unreachable mirror, or in a dry run.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const UBUNTU: &str = "NAME=\"Ubuntu\"\nID=ubuntu\nID_LIKE=debian\nVERSION_ID=\"22.04\"\nPRETTY_NAME=\"Ubuntu 22.04.4 LTS\"\n";

fn azp() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("azp"));
    cmd.env_clear().env("NO_COLOR", "1");
    cmd
}

fn os_release(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("os-release");
    std::fs::write(&path, content).unwrap();
    path
}

/// `azp` with registration settings and a local os-release file.
fn registered(dir: &Path, os: &str) -> Command {
    let mut cmd = azp();
    cmd.env("AZP_URL", "https://dev.azure.com/contoso")
        .env("AZP_TOKEN", "pat-very-secret")
        .env("AZP_OS_RELEASE_PATH", os_release(dir, os))
        .env("AZP_AGENT_DIR", dir.join("agent"))
        .env("AZP_AGENT_VERSION", "4.248.0");
    cmd
}

// --- Validation happens before any command runs ---

#[test]
fn test_provision_without_url_names_missing_variable() {
    azp()
        .arg("provision")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("AZP_URL"));
}

#[test]
fn test_provision_without_token_names_missing_variable() {
    azp()
        .arg("provision")
        .env("AZP_URL", "https://dev.azure.com/contoso")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("AZP_TOKEN"));
}

#[test]
fn test_provision_json_error_has_code() {
    let output = azp().args(["--json", "provision"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "config_missing");
    assert!(value["message"].as_str().unwrap().contains("AZP_URL"));
}

#[test]
fn test_provision_rejects_invalid_boolean() {
    azp()
        .arg("provision")
        .env("AZP_INSTALL_DOCKER", "maybe")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("AZP_"));
}

#[test]
fn test_provision_rejects_unknown_tool() {
    let dir = tempfile::tempdir().unwrap();
    registered(dir.path(), UBUNTU)
        .arg("provision")
        .env("AZP_INSTALL_TOOLS", "true")
        .env("AZP_TOOLS", "kubectl,vim")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("vim"));
}

#[test]
fn test_provision_unsupported_os_fails_before_installing() {
    let dir = tempfile::tempdir().unwrap();
    registered(dir.path(), "NAME=\"Arch Linux\"\nID=arch\n")
        .args(["--dry-run", "provision"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unsupported OS 'arch'"))
        .stderr(predicate::str::contains("dry run:").not());
}

#[test]
fn test_provision_unsupported_os_json_code() {
    let dir = tempfile::tempdir().unwrap();
    let output = registered(dir.path(), "ID=alpine\n")
        .args(["--json", "provision"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["code"], "os_unsupported");
}

// --- Dry run ---

#[test]
fn test_provision_dry_run_reports_without_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let output = registered(dir.path(), UBUNTU)
        .args(["--dry-run", "--json", "provision"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["os"], "Ubuntu 22.04.4 LTS");
    assert_eq!(report["agent"]["version"], "4.248.0");
    assert_eq!(report["agent"]["version_source"], "pinned");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config.sh"), "{stderr}");
    assert!(stderr.contains("useradd") || stderr.contains("id -u azpagent"), "{stderr}");
    assert!(!stderr.contains("pat-very-secret"), "{stderr}");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("pat-very-secret"));
    assert!(!dir.path().join("agent").exists());
}

#[test]
fn test_download_dry_run_lists_custom_sources_in_order() {
    let output = azp()
        .args(["--dry-run", "--json", "download"])
        .env("AZP_AGENT_VERSION", "4.248.0")
        .env(
            "AZP_AGENT_MIRRORS",
            "https://one.local/{version}.tgz,https://two.local/{version}.tgz",
        )
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["version"], "4.248.0");
    assert_eq!(
        value["sources"],
        serde_json::json!(["https://one.local/4.248.0.tgz", "https://two.local/4.248.0.tgz"])
    );
}

// --- Download fallback ---

#[test]
fn test_download_all_sources_failing_points_to_manual_download() {
    let dir = tempfile::tempdir().unwrap();
    azp()
        .args(["download", "--dest"])
        .arg(dir.path())
        .env("AZP_AGENT_VERSION", "4.248.0")
        .env(
            "AZP_AGENT_MIRRORS",
            "http://127.0.0.1:9/a.tar.gz,http://127.0.0.1:9/b.tar.gz,http://127.0.0.1:9/c.tar.gz",
        )
        .env("AZP_STEP_TIMEOUT_SECS", "5")
        .timeout(std::time::Duration::from_secs(120))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("all 3 sources"))
        .stderr(predicate::str::contains(
            "github.com/microsoft/azure-pipelines-agent/releases",
        ));

    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().flatten().collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}
