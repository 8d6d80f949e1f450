//! Host verification scoped by configuration.

use std::path::Path;

use azp_cli::application::services::verify::{VerifyScope, verify_host};
use azp_cli::domain::agent::SERVICE_FILE;
use azp_cli::domain::config::ProvisionConfig;
use azp_cli::domain::tools::Tool;

use crate::helpers::{RecordingRunner, TrackingFs};

const UNIT: &str = "vsts.agent.contoso.Default.build-01.service";

fn config(pairs: &[(&str, &str)]) -> ProvisionConfig {
    ProvisionConfig::from_vars(
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
    )
    .unwrap()
}

fn healthy_host(agent_dir: &Path) -> RecordingRunner {
    std::fs::write(agent_dir.join(SERVICE_FILE), format!("{UNIT}\n")).unwrap();
    RecordingRunner::new()
        .stdout_for("docker --version", "Docker version 27.0.3, build 7d4bcd8\n")
        .stdout_for(&format!("systemctl is-active {UNIT}"), "active\n")
}

#[tokio::test]
async fn test_default_config_host_with_docker_and_service_passes() {
    let dir = tempfile::tempdir().unwrap();
    let runner = healthy_host(dir.path());
    let scope = VerifyScope::from_config(&config(&[])).unwrap();

    let report = verify_host(&runner, &TrackingFs::default(), dir.path(), &scope, None).await;

    assert!(scope.satisfied_by(&report), "missing: {:?}", report.missing());
    assert_eq!(report.components.len(), 1);
    assert_eq!(report.components[0].name, "docker");
    for tool in Tool::ALL {
        assert!(!runner.called(tool.name()), "probed {tool}");
    }
}

#[tokio::test]
async fn test_docker_not_probed_when_not_installed_by_config() {
    let dir = tempfile::tempdir().unwrap();
    let runner = healthy_host(dir.path());
    let scope =
        VerifyScope::from_config(&config(&[("AZP_INSTALL_DOCKER", "false")])).unwrap();

    let report = verify_host(&runner, &TrackingFs::default(), dir.path(), &scope, None).await;

    assert!(scope.satisfied_by(&report));
    assert!(report.components.is_empty());
    assert!(!runner.called("docker"));
}

#[tokio::test]
async fn test_selected_tools_are_probed_when_tools_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let runner = healthy_host(dir.path()).stdout_for("helm version --short", "v3.16.2\n");
    let scope = VerifyScope::from_config(&config(&[
        ("AZP_INSTALL_TOOLS", "true"),
        ("AZP_TOOLS", "helm,kubectl"),
    ]))
    .unwrap();

    let report = verify_host(&runner, &TrackingFs::default(), dir.path(), &scope, None).await;

    assert_eq!(report.missing(), vec!["kubectl"]);
    assert!(!scope.satisfied_by(&report));
    assert!(!runner.called("terraform"));
}

#[tokio::test]
async fn test_inactive_service_fails_only_when_expected() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new()
        .stdout_for("docker --version", "Docker version 27.0.3, build 7d4bcd8\n");

    let expected = VerifyScope::from_config(&config(&[])).unwrap();
    let report = verify_host(&runner, &TrackingFs::default(), dir.path(), &expected, None).await;
    assert!(!report.service.active);
    assert!(!expected.satisfied_by(&report));

    let no_service =
        VerifyScope::from_config(&config(&[("AZP_RUN_AS_SERVICE", "false")])).unwrap();
    assert!(no_service.satisfied_by(&report));
}
