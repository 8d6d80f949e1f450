//! Application service: post-install verification.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;

use crate::application::ports::{CommandRunner, LocalFs};
use crate::application::services::agent::service_status;
use crate::application::services::steps::probe;
use crate::domain::config::ProvisionConfig;
use crate::domain::report::{ComponentStatus, ProvisionReport};
use crate::domain::step::CommandStep;
use crate::domain::tools::Tool;

/// What a provisioned host is expected to have, derived from configuration.
#[derive(Debug, Clone, Default)]
pub struct VerifyScope {
    pub docker: bool,
    pub tools: Vec<Tool>,
    pub service: bool,
}

impl VerifyScope {
    /// Expect Docker, tools and the service only when provisioning would
    /// have installed them.
    ///
    /// # Errors
    ///
    /// Returns an error when `AZP_TOOLS` names an unknown tool.
    pub fn from_config(config: &ProvisionConfig) -> Result<Self> {
        Ok(Self {
            docker: config.install_docker,
            tools: if config.install_tools {
                config.selected_tools()?
            } else {
                Vec::new()
            },
            service: config.run_as_service,
        })
    }

    /// `true` when every expected component is present and, if a service is
    /// expected, it is active.
    #[must_use]
    pub fn satisfied_by(&self, report: &ProvisionReport) -> bool {
        report.missing().is_empty() && (!self.service || report.service.active)
    }
}

/// Probe Docker (when `docker`) and each tool for its version.
pub async fn probe_components(
    runner: &impl CommandRunner,
    docker: bool,
    tools: &[Tool],
) -> Vec<ComponentStatus> {
    let mut components = Vec::with_capacity(tools.len() + 1);
    if docker {
        components.push(ComponentStatus {
            name: "docker".to_string(),
            version: probe(runner, &CommandStep::new("docker").arg("--version")).await,
        });
    }
    for &tool in tools {
        components.push(ComponentStatus {
            name: tool.name().to_string(),
            version: probe(runner, &tool.version_probe()).await,
        });
    }
    components
}

/// Build a report of the host as it is now, probing only what `scope` expects.
pub async fn verify_host(
    runner: &impl CommandRunner,
    fs: &impl LocalFs,
    agent_dir: &Path,
    scope: &VerifyScope,
    os: Option<String>,
) -> ProvisionReport {
    let service = service_status(runner, fs, agent_dir).await;
    let components = probe_components(runner, scope.docker, &scope.tools).await;
    ProvisionReport {
        generated_at: Utc::now(),
        os,
        agent: None,
        service,
        components,
        warnings: Vec::new(),
    }
}
