//! `azp config`: show the effective configuration.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::app::AppContext;
use crate::output::human::HumanRenderer;
use crate::output::json::to_json;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show effective AZP_* and AKS_* settings (token masked)
    Show,
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed.
pub fn run(app: &AppContext, cmd: &ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => show_config(app),
    }
}

fn show_config(app: &AppContext) -> Result<ExitCode> {
    let provision = app.provision_config()?.redacted();
    let aks = app.aks_config()?;

    if app.is_json() {
        println!(
            "{}",
            to_json(&serde_json::json!({ "provision": provision, "aks": aks }))?
        );
        return Ok(ExitCode::SUCCESS);
    }

    let renderer = HumanRenderer::new(&app.output);
    renderer.render_config(
        "Provisioning (AZP_*)",
        &serde_yaml::to_string(&provision).context("rendering configuration")?,
    );
    renderer.render_config(
        "Cluster (AKS_*)",
        &serde_yaml::to_string(&aks).context("rendering configuration")?,
    );
    Ok(ExitCode::SUCCESS)
}
