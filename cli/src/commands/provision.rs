//! `azp provision`: turn this host into a registered build agent.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::provision::{ProvisionOptions, provision_host};
use crate::commands::{detect_os, emit_report, host_arch};
use crate::domain::agent::LATEST_RELEASE_URL;
use crate::infra::archive::TarGzExtractor;
use crate::infra::fs::{HostFs, hostname};
use crate::infra::http::{CurlFetcher, GithubReleaseSource, UreqFetcher};
use crate::output::reporter::TerminalReporter;

/// Arguments for the provision command.
#[derive(Args)]
pub struct ProvisionArgs {
    /// Do not install Docker (overrides AZP_INSTALL_DOCKER)
    #[arg(long)]
    pub skip_docker: bool,

    /// Do not install auxiliary tools (overrides AZP_INSTALL_TOOLS)
    #[arg(long)]
    pub skip_tools: bool,

    /// Do not install the systemd service (overrides AZP_RUN_AS_SERVICE)
    #[arg(long)]
    pub no_service: bool,
}

/// Run the provision command.
///
/// # Errors
///
/// Returns an error for missing or invalid configuration, an unsupported OS,
/// a failed download or a failed extraction. Nothing is executed before the
/// configuration and OS checks pass.
pub async fn run(app: &AppContext, args: &ProvisionArgs) -> Result<ExitCode> {
    let config = app.provision_config()?;
    config.validate()?;
    let registration = config.registration(&hostname())?;

    let fs = HostFs;
    let (release, family) = detect_os(&fs, &config.os_release_path)?;
    let arch = host_arch()?;
    let tools = if config.install_tools && !args.skip_tools {
        config.selected_tools()?
    } else {
        Vec::new()
    };

    if !app.confirm(
        &format!(
            "Register agent '{}' in pool '{}' on this {} host?",
            registration.agent_name,
            registration.pool,
            release.display_name()
        ),
        true,
    )? {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let timeout = Duration::from_secs(config.step_timeout_secs);
    let runner = app.runner(timeout, config.secrets());
    let releases = GithubReleaseSource::new(
        LATEST_RELEASE_URL,
        app.var("GITHUB_TOKEN").map(str::to_string),
    );
    let primary = UreqFetcher::new(timeout);
    let secondary = CurlFetcher::new(&runner);
    let reporter = TerminalReporter::new(&app.output);
    let download_dir = std::env::temp_dir().join("azp");

    let report = provision_host(
        &runner,
        &releases,
        &primary,
        &secondary,
        &fs,
        &TarGzExtractor,
        ProvisionOptions {
            reporter: &reporter,
            config: &config,
            registration: &registration,
            release: &release,
            family,
            arch,
            tools,
            install_docker: config.install_docker && !args.skip_docker,
            run_as_service: config.run_as_service && !args.no_service,
            dry_run: app.dry_run,
            download_dir: &download_dir,
        },
    )
    .await?;

    emit_report(app, &report)?;
    Ok(ExitCode::SUCCESS)
}
