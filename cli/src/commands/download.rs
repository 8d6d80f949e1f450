//! `azp download`: fetch the agent archive without installing anything.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::agent::{
    FetchRequest, fetch_agent_package, resolve_agent_version, source_urls,
};
use crate::commands::host_arch;
use crate::domain::agent::LATEST_RELEASE_URL;
use crate::infra::fs::HostFs;
use crate::infra::http::{CurlFetcher, GithubReleaseSource, UreqFetcher};
use crate::output::human::HumanRenderer;
use crate::output::json::to_json;
use crate::output::reporter::TerminalReporter;

/// Arguments for the download command.
#[derive(Args)]
pub struct DownloadArgs {
    /// Directory to write the archive into
    #[arg(long, default_value = ".")]
    pub dest: PathBuf,
}

/// Run the download command.
///
/// # Errors
///
/// Returns an error if configuration is invalid or every source fails; the
/// latter names the manual download location.
pub async fn run(app: &AppContext, args: &DownloadArgs) -> Result<ExitCode> {
    let config = app.provision_config()?;
    config.validate()?;
    let arch = host_arch()?;
    let timeout = Duration::from_secs(config.step_timeout_secs);
    let runner = app.runner(timeout, config.secrets());
    let releases = GithubReleaseSource::new(
        LATEST_RELEASE_URL,
        app.var("GITHUB_TOKEN").map(str::to_string),
    );
    let reporter = TerminalReporter::new(&app.output);
    let mirrors = config.agent_mirrors.as_deref();

    if app.dry_run {
        let version = resolve_agent_version(&releases, &reporter, config.agent_version.as_deref()).await;
        let urls = source_urls(mirrors, &version, arch);
        if app.is_json() {
            println!(
                "{}",
                to_json(&serde_json::json!({ "version": version.to_string(), "sources": urls }))?
            );
        } else {
            for (i, url) in urls.iter().enumerate() {
                app.output.kv(&format!("source {}:", i + 1), url);
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let fetched = fetch_agent_package(
        &releases,
        &UreqFetcher::new(timeout),
        &CurlFetcher::new(&runner),
        &HostFs,
        &reporter,
        &FetchRequest {
            pinned_version: config.agent_version.as_deref(),
            mirrors,
            arch,
            dest_dir: &args.dest,
            expected_sha256: config.agent_sha256.as_deref(),
        },
    )
    .await?;

    if app.is_json() {
        println!(
            "{}",
            to_json(&serde_json::json!({
                "version": fetched.version.to_string(),
                "version_source": fetched.version.source,
                "archive": fetched.archive,
                "url": fetched.download.url,
                "source_index": fetched.download.index,
                "method": fetched.download.method,
                "size": fetched.download.size,
                "sha256": fetched.download.sha256,
            }))?
        );
    } else {
        HumanRenderer::new(&app.output).render_download(&fetched);
    }
    Ok(ExitCode::SUCCESS)
}
