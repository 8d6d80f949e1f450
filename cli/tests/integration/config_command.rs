//! Integration tests for `azp config show`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn azp() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("azp"));
    cmd.env_clear().env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_config_show_masks_token() {
    azp()
        .args(["config", "show"])
        .env("AZP_URL", "https://dev.azure.com/contoso")
        .env("AZP_TOKEN", "pat-very-secret")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://dev.azure.com/contoso"))
        .stdout(predicate::str::contains("***"))
        .stdout(predicate::str::contains("pat-very-secret").not());
}

#[test]
fn test_config_show_json_has_defaults() {
    let output = azp()
        .args(["config", "show", "--json"])
        .env("AZP_TOKEN", "pat-very-secret")
        .env("AKS_CLUSTER_NAME", "aks-build")
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["provision"]["token"], "***");
    assert_eq!(value["provision"]["pool"], "Default");
    assert_eq!(value["provision"]["agent_user"], "azpagent");
    assert_eq!(value["provision"]["agent_dir"], "/opt/azp-agent");
    assert_eq!(value["aks"]["cluster_name"], "aks-build");
}

#[test]
fn test_config_show_reports_unparsable_value() {
    azp()
        .args(["config", "show"])
        .env("AZP_STEP_TIMEOUT_SECS", "soon")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("AZP_"));
}
