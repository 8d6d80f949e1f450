//! Application service: host preparation: privileges, base packages, the
//! service account and Docker.

use anyhow::{Context, Result};

use crate::application::ports::CommandRunner;
use crate::application::services::steps::{probe, run_plan, run_step};
use crate::domain::error::ProvisionError;
use crate::domain::os::{OsFamily, PackageManager};
use crate::domain::step::CommandStep;

/// Whether the service account had to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountOutcome {
    Existing,
    Created,
}

/// Fail unless the effective user is root.
///
/// # Errors
///
/// Returns [`ProvisionError::NotRoot`] when `id -u` reports a non-zero uid,
/// or an error if `id` cannot be run.
pub async fn ensure_root(runner: &impl CommandRunner) -> Result<()> {
    let output = run_step(runner, &CommandStep::new("id").arg("-u"))
        .await
        .context("checking effective user")?;
    let uid = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if uid != "0" {
        return Err(ProvisionError::NotRoot { uid }.into());
    }
    Ok(())
}

/// Refresh package metadata and install the base package set.
///
/// # Errors
///
/// Returns the first failing package-manager step.
pub async fn install_base_packages(runner: &impl CommandRunner, pm: PackageManager) -> Result<()> {
    run_plan(runner, &[pm.update(), pm.install(pm.base_packages())]).await
}

/// Create the service account unless it already exists.
///
/// # Errors
///
/// Returns an error if `useradd` fails.
pub async fn ensure_account(runner: &impl CommandRunner, user: &str) -> Result<AccountOutcome> {
    if probe(runner, &CommandStep::new("id").args(["-u", user]))
        .await
        .is_some()
    {
        tracing::debug!(user, "service account exists");
        return Ok(AccountOutcome::Existing);
    }
    run_step(
        runner,
        &CommandStep::new("useradd").args(["--create-home", "--shell", "/bin/bash", user]),
    )
    .await
    .with_context(|| format!("creating service account {user}"))?;
    Ok(AccountOutcome::Created)
}

/// Docker install plan for a distribution family.
#[must_use]
pub fn docker_plan(family: OsFamily, user: &str) -> Vec<CommandStep> {
    let pm = family.package_manager();
    let mut plan = match family {
        OsFamily::Debian => vec![pm.install(&["docker.io"])],
        OsFamily::Rhel => vec![
            pm.install(&["dnf-plugins-core"]),
            CommandStep::new("dnf").args([
                "config-manager",
                "--add-repo",
                "https://download.docker.com/linux/centos/docker-ce.repo",
            ]),
            pm.install(&["docker-ce", "docker-ce-cli", "containerd.io"]),
        ],
    };
    plan.push(CommandStep::new("systemctl").args(["enable", "--now", "docker"]));
    plan.push(CommandStep::new("usermod").args(["-aG", "docker", user]));
    plan
}

/// Install Docker, start it, and let the service account use it.
///
/// # Errors
///
/// Returns the first failing step.
pub async fn install_docker(runner: &impl CommandRunner, family: OsFamily, user: &str) -> Result<()> {
    run_plan(runner, &docker_plan(family, user)).await
}
