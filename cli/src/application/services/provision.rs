//! Application service: the full provisioning run.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Configuration and OS classification happen in the caller, before any
//! command runs; this service starts at the privilege check.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;

use crate::application::ports::{
    ArchiveExtractor, CommandRunner, FileHasher, LocalFs, PackageFetcher, ProgressReporter,
    ReleaseSource,
};
use crate::application::services::agent::{
    FetchRequest, extract_agent, fetch_agent_package, hand_over, install_service, register,
    resolve_agent_version, service_status, source_urls,
};
use crate::application::services::host::{
    AccountOutcome, ensure_account, ensure_root, install_base_packages, install_docker,
};
use crate::application::services::tools::install_tools;
use crate::application::services::verify::probe_components;
use crate::domain::agent::AgentArch;
use crate::domain::config::{AgentRegistration, ProvisionConfig};
use crate::domain::os::{OsFamily, OsRelease};
use crate::domain::report::{AgentSummary, ProvisionReport, ServiceStatus};
use crate::domain::tools::{Tool, ToolOptions};

/// Inputs for [`provision_host`].
pub struct ProvisionOptions<'a, R: ProgressReporter> {
    pub reporter: &'a R,
    pub config: &'a ProvisionConfig,
    pub registration: &'a AgentRegistration,
    pub release: &'a OsRelease,
    pub family: OsFamily,
    pub arch: AgentArch,
    /// Tools to install; empty disables the phase.
    pub tools: Vec<Tool>,
    pub install_docker: bool,
    pub run_as_service: bool,
    /// Skip the root check, the download and the extraction.
    pub dry_run: bool,
    /// Where the archive is downloaded to.
    pub download_dir: &'a Path,
}

/// Collects non-fatal failures while reporting them as they happen.
struct Warnings<'a, R: ProgressReporter> {
    reporter: &'a R,
    list: Vec<String>,
}

impl<R: ProgressReporter> Warnings<'_, R> {
    fn push(&mut self, message: String) {
        self.reporter.warn(&message);
        self.list.push(message);
    }

    /// Record `result` under `what`; returns whether it succeeded.
    fn check(&mut self, what: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.push(format!("{what} failed: {e:#}"));
                false
            }
        }
    }
}

/// Provision the host: packages, account, Docker, agent, service, tools.
///
/// # Errors
///
/// Fails when the process is not root, when every download source fails, or
/// when extraction fails. Every other step degrades to a warning in the
/// returned report.
pub async fn provision_host(
    runner: &impl CommandRunner,
    releases: &impl ReleaseSource,
    primary: &impl PackageFetcher,
    secondary: &impl PackageFetcher,
    fs: &(impl LocalFs + FileHasher),
    extractor: &impl ArchiveExtractor,
    opts: ProvisionOptions<'_, impl ProgressReporter>,
) -> Result<ProvisionReport> {
    let reporter = opts.reporter;
    let config = opts.config;
    let user = config.agent_user.as_str();
    let agent_dir = config.agent_dir.as_path();
    let mut warnings = Warnings {
        reporter,
        list: Vec::new(),
    };

    if opts.dry_run {
        reporter.step("dry run: commands are printed, not executed");
    } else {
        ensure_root(runner).await?;
    }

    // ── Host ────────────────────────────────────────────────────────────────
    let pm = opts.family.package_manager();
    reporter.step(&format!("installing base packages ({})...", opts.release.display_name()));
    if warnings.check("base packages", install_base_packages(runner, pm).await) {
        reporter.success("base packages installed");
    }

    match ensure_account(runner, user).await {
        Ok(AccountOutcome::Created) => reporter.success(&format!("created service account {user}")),
        Ok(AccountOutcome::Existing) => reporter.success(&format!("service account {user} exists")),
        Err(e) => warnings.push(format!("service account failed: {e:#}")),
    }

    if opts.install_docker {
        reporter.step("installing docker...");
        if warnings.check("docker", install_docker(runner, opts.family, user).await) {
            reporter.success("docker installed");
        }
    }

    // ── Agent ───────────────────────────────────────────────────────────────
    let mirrors = config.agent_mirrors.as_deref();
    let mut agent = if opts.dry_run {
        let version = resolve_agent_version(releases, reporter, config.agent_version.as_deref()).await;
        let urls = source_urls(mirrors, &version, opts.arch);
        reporter.step(&format!(
            "dry run: would download {} and extract it into {}",
            urls.first().map_or("(no sources)", String::as_str),
            agent_dir.display()
        ));
        AgentSummary {
            version: version.to_string(),
            version_source: version.source,
            source_url: None,
            sha256: None,
            directory: agent_dir.display().to_string(),
            registered: false,
        }
    } else {
        let fetched = fetch_agent_package(
            releases,
            primary,
            secondary,
            fs,
            reporter,
            &FetchRequest {
                pinned_version: config.agent_version.as_deref(),
                mirrors,
                arch: opts.arch,
                dest_dir: opts.download_dir,
                expected_sha256: config.agent_sha256.as_deref(),
            },
        )
        .await?;
        extract_agent(extractor, reporter, &fetched.archive, agent_dir).await?;
        AgentSummary {
            version: fetched.version.to_string(),
            version_source: fetched.version.source,
            source_url: Some(fetched.download.url),
            sha256: Some(fetched.download.sha256),
            directory: agent_dir.display().to_string(),
            registered: false,
        }
    };

    warnings.check("ownership hand-over", hand_over(runner, agent_dir, user).await);

    reporter.step(&format!(
        "registering agent '{}' with {}...",
        opts.registration.agent_name, opts.registration.url
    ));
    agent.registered = warnings.check(
        "agent registration",
        register(runner, agent_dir, user, opts.registration).await,
    );
    if agent.registered {
        reporter.success("agent registered");
    }

    if opts.run_as_service {
        if agent.registered {
            reporter.step("installing agent service...");
            if warnings.check("agent service", install_service(runner, agent_dir, user).await) {
                reporter.success("agent service started");
            }
        } else {
            warnings.push("agent service skipped: the agent is not registered".to_string());
        }
    }

    // ── Tools ───────────────────────────────────────────────────────────────
    if !opts.tools.is_empty() {
        let tool_opts = ToolOptions {
            node_major: config.node_major.clone(),
            dotnet_channel: config.dotnet_channel.clone(),
            kube_arch: opts.arch.kube_arch(),
        };
        let outcome = install_tools(
            runner,
            reporter,
            &opts.tools,
            opts.family,
            opts.release,
            &tool_opts,
        )
        .await;
        // install_tools already reported each failure as it happened.
        warnings
            .list
            .extend(outcome.failed.into_iter().map(|(tool, e)| format!("{tool} failed: {e}")));
    }

    // ── Report ──────────────────────────────────────────────────────────────
    let (service, components) = if opts.dry_run {
        (
            ServiceStatus {
                unit: None,
                active: false,
            },
            Vec::new(),
        )
    } else {
        let probed = probe_components(runner, opts.install_docker, &opts.tools).await;
        (service_status(runner, fs, agent_dir).await, probed)
    };

    Ok(ProvisionReport {
        generated_at: Utc::now(),
        os: Some(opts.release.display_name()),
        agent: Some(agent),
        service,
        components,
        warnings: warnings.list,
    })
}
