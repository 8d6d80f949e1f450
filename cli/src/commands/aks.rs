//! `azp aks`: configure a private AKS cluster for the build host.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::aks::{
    ClusterAccess, configure_certificate, configure_dns, configure_ingress,
};
use crate::domain::aks::{CertSettings, DnsSettings};
use crate::infra::command_runner::DEFAULT_STEP_TIMEOUT;
use crate::infra::fs::HostFs;
use crate::output::json::to_json;
use crate::output::reporter::TerminalReporter;

/// AKS subcommands.
#[derive(Subcommand)]
pub enum AksCommand {
    /// Enable app routing with an internal-only NGINX ingress controller
    Ingress,
    /// Private DNS zone for the ingress and on-premises forwarding
    Dns,
    /// Self-signed ingress certificate stored in Key Vault
    Cert,
}

/// Run an aks subcommand. Every step is fatal.
///
/// # Errors
///
/// Returns an error for missing `AKS_*` settings or the first failing step.
pub async fn run(app: &AppContext, cmd: &AksCommand) -> Result<ExitCode> {
    let config = app.aks_config()?;
    let cluster = config.cluster()?;
    let timeout = app
        .var("AZP_STEP_TIMEOUT_SECS")
        .and_then(|v| v.parse().ok())
        .map_or(DEFAULT_STEP_TIMEOUT, Duration::from_secs);
    let runner = app.runner(timeout, Vec::new());
    let reporter = TerminalReporter::new(&app.output);
    let scratch = tempfile::Builder::new()
        .prefix("azp-aks-")
        .tempdir()
        .context("creating scratch directory")?;
    let access = ClusterAccess {
        cluster: &cluster,
        private: config.private_cluster,
        scratch: scratch.path(),
    };
    let fs = HostFs;

    match cmd {
        AksCommand::Ingress => {
            configure_ingress(&runner, &fs, &reporter, &access, &config.ingress_class).await?;
        }
        AksCommand::Dns => {
            let dns = DnsSettings::from_config(&config)?;
            configure_dns(&runner, &fs, &reporter, &access, &dns).await?;
        }
        AksCommand::Cert => {
            let cert = CertSettings::from_config(&config)?;
            configure_certificate(&runner, &fs, &reporter, &access, &cert).await?;
        }
    }

    if app.is_json() {
        println!(
            "{}",
            to_json(&serde_json::json!({
                "ok": true,
                "resource_group": cluster.resource_group,
                "cluster": cluster.name,
            }))?
        );
    }
    Ok(ExitCode::SUCCESS)
}
