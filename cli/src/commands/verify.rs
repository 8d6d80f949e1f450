//! `azp verify`: report what is installed on this host.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::LocalFs;
use crate::application::services::verify::{VerifyScope, verify_host};
use crate::commands::emit_report;
use crate::domain::os::OsRelease;
use crate::infra::fs::HostFs;
use crate::output::progress::maybe_spinner;

/// Run the verify command. Read-only, so `--dry-run` has no effect.
///
/// # Errors
///
/// Returns an error for invalid configuration.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let config = app.provision_config()?;
    config.validate()?;
    let scope = VerifyScope::from_config(&config)?;
    let fs = HostFs;
    let os = fs
        .read_to_string(&config.os_release_path)
        .ok()
        .and_then(|content| {
            OsRelease::parse(&content, &config.os_release_path.display().to_string()).ok()
        })
        .map(|release| release.display_name());

    let runner = app.probe_runner();
    let spinner = maybe_spinner(app.output.show_progress(), "probing installed components...");
    let report = verify_host(&runner, &fs, &config.agent_dir, &scope, os).await;
    spinner.finish_and_clear();

    emit_report(app, &report)?;
    Ok(if scope.satisfied_by(&report) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
