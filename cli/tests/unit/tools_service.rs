//! Tool installation: each tool is independent.

use azp_cli::application::services::tools::install_tools;
use azp_cli::domain::os::{OsFamily, OsRelease};
use azp_cli::domain::tools::{Tool, ToolOptions};

use crate::helpers::{CapturingReporter, RecordingRunner};

fn rocky() -> OsRelease {
    OsRelease {
        id: "rocky".to_string(),
        id_like: vec!["rhel".to_string(), "centos".to_string(), "fedora".to_string()],
        version_id: Some("9.3".to_string()),
        ..OsRelease::default()
    }
}

fn options() -> ToolOptions {
    ToolOptions {
        node_major: "20".to_string(),
        dotnet_channel: "8.0".to_string(),
        kube_arch: "amd64",
    }
}

#[tokio::test]
async fn test_failing_tool_does_not_stop_the_next() {
    let runner = RecordingRunner::new().fail_when("get-helm-3");
    let reporter = CapturingReporter::default();

    let outcome = install_tools(
        &runner,
        &reporter,
        &[Tool::Helm, Tool::Kubectl],
        OsFamily::Rhel,
        &rocky(),
        &options(),
    )
    .await;

    assert!(!outcome.all_ok());
    assert_eq!(outcome.installed, vec![Tool::Kubectl]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, Tool::Helm);
    assert!(outcome.failed[0].1.contains("simulated failure"));
    assert!(reporter.warned("helm failed"));
    assert!(runner.called("/bin/linux/amd64/kubectl"));
}

#[tokio::test]
async fn test_all_tools_succeed() {
    let runner = RecordingRunner::new();

    let outcome = install_tools(
        &runner,
        &CapturingReporter::default(),
        &[Tool::Terraform, Tool::Node],
        OsFamily::Rhel,
        &rocky(),
        &options(),
    )
    .await;

    assert!(outcome.all_ok());
    assert_eq!(outcome.installed, vec![Tool::Terraform, Tool::Node]);
    assert!(runner.called("rpm.releases.hashicorp.com/RHEL/hashicorp.repo"));
}

#[tokio::test]
async fn test_failed_step_stops_only_its_own_plan() {
    let runner = RecordingRunner::new().fail_when("hashicorp-archive-keyring.gpg");
    let release = OsRelease {
        id: "ubuntu".to_string(),
        id_like: vec!["debian".to_string()],
        version_id: Some("22.04".to_string()),
        ..OsRelease::default()
    };

    let outcome = install_tools(
        &runner,
        &CapturingReporter::default(),
        &[Tool::Terraform, Tool::Helm],
        OsFamily::Debian,
        &release,
        &options(),
    )
    .await;

    assert_eq!(outcome.installed, vec![Tool::Helm]);
    assert!(!runner.called("install -y --no-install-recommends terraform"));
}
