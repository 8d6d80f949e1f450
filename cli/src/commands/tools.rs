//! `azp tools`: install auxiliary developer tools on their own.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::host::ensure_root;
use crate::application::services::tools::install_tools;
use crate::commands::{detect_os, host_arch};
use crate::domain::config::parse_tool_list;
use crate::domain::tools::ToolOptions;
use crate::infra::fs::HostFs;
use crate::output::human::HumanRenderer;
use crate::output::json::to_json;
use crate::output::reporter::TerminalReporter;

/// Arguments for the tools command.
#[derive(Args)]
pub struct ToolsArgs {
    /// Comma-separated subset to install (default: AZP_TOOLS, else all)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

/// Run the tools command.
///
/// Exits 0 when every tool installed and 1 when any failed; a failing tool
/// never stops the others.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unknown tool name, an
/// unsupported OS, or a non-root user.
pub async fn run(app: &AppContext, args: &ToolsArgs) -> Result<ExitCode> {
    let config = app.provision_config()?;
    config.validate()?;
    let tools = if args.only.is_empty() {
        config.selected_tools()?
    } else {
        parse_tool_list(&args.only)?
    };
    let (release, family) = detect_os(&HostFs, &config.os_release_path)?;
    let opts = ToolOptions {
        node_major: config.node_major.clone(),
        dotnet_channel: config.dotnet_channel.clone(),
        kube_arch: host_arch()?.kube_arch(),
    };

    let runner = app.runner(Duration::from_secs(config.step_timeout_secs), config.secrets());
    if !app.dry_run {
        ensure_root(&runner).await?;
    }
    let reporter = TerminalReporter::new(&app.output);
    let outcome = install_tools(&runner, &reporter, &tools, family, &release, &opts).await;

    if app.is_json() {
        let failed: Vec<_> = outcome
            .failed
            .iter()
            .map(|(tool, error)| serde_json::json!({ "tool": tool.name(), "error": error }))
            .collect();
        let installed: Vec<&str> = outcome.installed.iter().map(|t| t.name()).collect();
        println!(
            "{}",
            to_json(&serde_json::json!({ "installed": installed, "failed": failed }))?
        );
    } else {
        HumanRenderer::new(&app.output).render_tools(&outcome);
    }

    Ok(if outcome.all_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
