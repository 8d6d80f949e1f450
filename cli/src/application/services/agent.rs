//! Application service: agent package lifecycle: version resolution, fetch,
//! extraction, registration and the systemd unit.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::{
    ArchiveExtractor, CommandRunner, FileHasher, LocalFs, PackageFetcher, ProgressReporter,
    ReleaseSource,
};
use crate::application::services::download::{DownloadOutcome, DownloadRequest, download_with_fallback};
use crate::application::services::steps::{probe, run_plan, run_step};
use crate::domain::agent::{
    AgentArch, AgentVersion, DEFAULT_MIRRORS, FALLBACK_AGENT_VERSION, SERVICE_FILE, VersionSource,
    chown_step, configure_step, mirror_urls, package_file_name, resolve_version, service_steps,
};
use crate::domain::config::AgentRegistration;
use crate::domain::report::ServiceStatus;
use crate::domain::step::CommandStep;

/// Inputs for locating and downloading the agent archive.
pub struct FetchRequest<'a> {
    /// Pinned version (`AZP_AGENT_VERSION`); skips the release lookup.
    pub pinned_version: Option<&'a str>,
    /// Mirror templates replacing the built-in list.
    pub mirrors: Option<&'a [String]>,
    pub arch: AgentArch,
    /// Directory the archive is written into.
    pub dest_dir: &'a Path,
    pub expected_sha256: Option<&'a str>,
}

/// A downloaded agent archive.
#[derive(Debug, Clone)]
pub struct FetchedAgent {
    pub version: AgentVersion,
    pub archive: PathBuf,
    pub download: DownloadOutcome,
}

/// Resolve the agent version, consulting the release source only when no
/// version is pinned. Lookup problems are reported and fall back.
pub async fn resolve_agent_version(
    releases: &impl ReleaseSource,
    reporter: &impl ProgressReporter,
    pinned: Option<&str>,
) -> AgentVersion {
    let lookup = if pinned.is_some_and(|p| !p.trim().is_empty()) {
        None
    } else {
        reporter.step("looking up latest agent release...");
        Some(releases.latest_tag().await)
    };
    if let Some(Err(e)) = &lookup {
        tracing::warn!(error = %format!("{e:#}"), "latest release lookup failed");
    }
    let version = resolve_version(pinned, lookup);
    if version.source == VersionSource::Fallback {
        reporter.warn(&format!(
            "could not determine the latest agent release, using known-good {FALLBACK_AGENT_VERSION}"
        ));
    } else {
        reporter.success(&format!("agent version {version}"));
    }
    version
}

/// Source URLs for a version, from the configured templates or the defaults.
#[must_use]
pub fn source_urls(mirrors: Option<&[String]>, version: &AgentVersion, arch: AgentArch) -> Vec<String> {
    match mirrors {
        Some(templates) if templates.iter().any(|t| !t.trim().is_empty()) => {
            mirror_urls(templates, version, arch)
        }
        _ => mirror_urls(DEFAULT_MIRRORS, version, arch),
    }
}

/// Resolve the version and download the archive with source fallback.
///
/// # Errors
///
/// Returns an error if the destination directory cannot be created or every
/// source fails.
pub async fn fetch_agent_package(
    releases: &impl ReleaseSource,
    primary: &impl PackageFetcher,
    secondary: &impl PackageFetcher,
    fs: &(impl LocalFs + FileHasher),
    reporter: &impl ProgressReporter,
    req: &FetchRequest<'_>,
) -> Result<FetchedAgent> {
    let version = resolve_agent_version(releases, reporter, req.pinned_version).await;
    let urls = source_urls(req.mirrors, &version, req.arch);
    fs.create_dir_all(req.dest_dir)?;
    let archive = req.dest_dir.join(package_file_name(&version, req.arch));
    let label = version.to_string();
    let download = download_with_fallback(
        primary,
        secondary,
        fs,
        reporter,
        &DownloadRequest {
            urls: &urls,
            dest: &archive,
            version: &label,
            expected_sha256: req.expected_sha256,
        },
    )
    .await?;
    Ok(FetchedAgent {
        version,
        archive,
        download,
    })
}

/// Unpack the archive into the agent directory.
///
/// # Errors
///
/// Returns the extractor's error; extraction failure is fatal to provisioning.
pub async fn extract_agent(
    extractor: &impl ArchiveExtractor,
    reporter: &impl ProgressReporter,
    archive: &Path,
    agent_dir: &Path,
) -> Result<()> {
    reporter.step(&format!("extracting agent into {}...", agent_dir.display()));
    extractor.extract(archive, agent_dir).await?;
    reporter.success(&format!("agent extracted into {}", agent_dir.display()));
    Ok(())
}

/// Give the service account ownership of the agent directory.
///
/// # Errors
///
/// Returns an error if `chown` fails.
pub async fn hand_over(runner: &impl CommandRunner, agent_dir: &Path, user: &str) -> Result<()> {
    run_step(runner, &chown_step(agent_dir, user)).await.map(|_| ())
}

/// Register the agent with the organization.
///
/// # Errors
///
/// Returns an error if `config.sh` fails. The token never appears in it.
pub async fn register(
    runner: &impl CommandRunner,
    agent_dir: &Path,
    user: &str,
    reg: &AgentRegistration,
) -> Result<()> {
    run_step(runner, &configure_step(agent_dir, user, reg))
        .await
        .with_context(|| format!("registering agent '{}' in pool '{}'", reg.agent_name, reg.pool))?;
    Ok(())
}

/// Install and start the agent's systemd unit.
///
/// # Errors
///
/// Returns the first failing `svc.sh` step.
pub async fn install_service(runner: &impl CommandRunner, agent_dir: &Path, user: &str) -> Result<()> {
    run_plan(runner, &service_steps(agent_dir, user))
        .await
        .context("installing agent service")
}

/// Unit name recorded by `svc.sh install` and whether it is active.
pub async fn service_status(
    runner: &impl CommandRunner,
    fs: &impl LocalFs,
    agent_dir: &Path,
) -> ServiceStatus {
    let unit = fs
        .read_to_string(&agent_dir.join(SERVICE_FILE))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let active = match &unit {
        Some(unit) => probe(
            runner,
            &CommandStep::new("systemctl").args(["is-active", unit.as_str()]),
        )
        .await
        .is_some_and(|state| state == "active"),
        None => false,
    };
    ServiceStatus { unit, active }
}
