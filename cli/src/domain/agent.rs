//! Azure Pipelines agent package: version resolution, download sources, and
//! the registration/service command plans.

use std::fmt;
use std::path::Path;

use anyhow::Result;

use crate::domain::config::AgentRegistration;
use crate::domain::error::OsError;
use crate::domain::step::CommandStep;

// ── Constants ────────────────────────────────────────────────────────────────

/// Known-good agent release used when the latest-release lookup fails.
pub const FALLBACK_AGENT_VERSION: &str = "4.248.0";

/// GitHub API endpoint describing the newest agent release.
pub const LATEST_RELEASE_URL: &str =
    "https://api.github.com/repos/microsoft/azure-pipelines-agent/releases/latest";

/// Where to fetch the package by hand when every source fails.
pub const MANUAL_DOWNLOAD_URL: &str = "https://github.com/microsoft/azure-pipelines-agent/releases";

/// Default download sources, tried in order. `{version}` and `{arch}` are expanded.
pub const DEFAULT_MIRRORS: &[&str] = &[
    "https://download.agent.dev.azure.com/agent/{version}/vsts-agent-linux-{arch}-{version}.tar.gz",
    "https://vstsagentpackage.azureedge.net/agent/{version}/vsts-agent-linux-{arch}-{version}.tar.gz",
    "https://github.com/microsoft/azure-pipelines-agent/releases/download/v{version}/vsts-agent-linux-{arch}-{version}.tar.gz",
];

/// File written by `svc.sh install` holding the systemd unit name.
pub const SERVICE_FILE: &str = ".service";

// ── Version ──────────────────────────────────────────────────────────────────

/// Where the resolved version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    /// Pinned through configuration.
    Pinned,
    /// Looked up from the latest release.
    Latest,
    /// Lookup failed; the known-good version was used.
    Fallback,
}

/// A resolved agent version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentVersion {
    pub version: semver::Version,
    pub source: VersionSource,
}

impl fmt::Display for AgentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}

/// Parse a release tag (`v4.248.0`, `4.248.0`) into a version.
///
/// Returns `None` for empty values, the literal `null` marker, and anything
/// that is not a semantic version.
#[must_use]
pub fn parse_release_tag(tag: &str) -> Option<semver::Version> {
    let tag = tag.trim().trim_matches('"');
    if tag.is_empty() || tag.eq_ignore_ascii_case("null") {
        return None;
    }
    semver::Version::parse(tag.trim_start_matches('v')).ok()
}

/// The hardcoded known-good version.
#[must_use]
pub fn fallback_version() -> AgentVersion {
    AgentVersion {
        version: semver::Version::new(4, 248, 0),
        source: VersionSource::Fallback,
    }
}

/// Pick the agent version from a pinned value or a lookup result.
///
/// A pinned value wins. Otherwise a successful lookup yielding a parsable tag
/// is used, and everything else (error, no tag, `null`, garbage) falls back to
/// [`FALLBACK_AGENT_VERSION`].
#[must_use]
pub fn resolve_version(pinned: Option<&str>, lookup: Option<Result<Option<String>>>) -> AgentVersion {
    if let Some(version) = pinned.and_then(parse_release_tag) {
        return AgentVersion {
            version,
            source: VersionSource::Pinned,
        };
    }
    match lookup {
        Some(Ok(Some(tag))) => parse_release_tag(&tag).map_or_else(fallback_version, |version| {
            AgentVersion {
                version,
                source: VersionSource::Latest,
            }
        }),
        _ => fallback_version(),
    }
}

// ── Architecture ─────────────────────────────────────────────────────────────

/// Agent package architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentArch {
    X64,
    Arm64,
    Arm,
}

impl AgentArch {
    /// Map a Rust target architecture (`std::env::consts::ARCH`).
    ///
    /// # Errors
    ///
    /// Returns [`OsError::UnsupportedArch`] for architectures the agent is not built for.
    pub fn from_rust_arch(arch: &str) -> Result<Self> {
        match arch {
            "x86_64" => Ok(AgentArch::X64),
            "aarch64" => Ok(AgentArch::Arm64),
            "arm" => Ok(AgentArch::Arm),
            other => Err(OsError::UnsupportedArch(other.to_string()).into()),
        }
    }

    /// Label used in agent package names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AgentArch::X64 => "x64",
            AgentArch::Arm64 => "arm64",
            AgentArch::Arm => "arm",
        }
    }

    /// Label used in Kubernetes release paths.
    #[must_use]
    pub fn kube_arch(self) -> &'static str {
        match self {
            AgentArch::X64 => "amd64",
            AgentArch::Arm64 => "arm64",
            AgentArch::Arm => "arm",
        }
    }
}

// ── Package sources ──────────────────────────────────────────────────────────

/// File name of the agent archive.
#[must_use]
pub fn package_file_name(version: &AgentVersion, arch: AgentArch) -> String {
    format!("vsts-agent-linux-{}-{version}.tar.gz", arch.as_str())
}

/// Expand mirror templates for a version and architecture, preserving order.
#[must_use]
pub fn mirror_urls<S: AsRef<str>>(templates: &[S], version: &AgentVersion, arch: AgentArch) -> Vec<String> {
    let version = version.to_string();
    templates
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.replace("{version}", &version).replace("{arch}", arch.as_str()))
        .collect()
}

// ── Command plans ────────────────────────────────────────────────────────────

/// Register the agent by running `config.sh` as the service account.
#[must_use]
pub fn configure_step(agent_dir: &Path, user: &str, reg: &AgentRegistration) -> CommandStep {
    let step = CommandStep::new("sudo")
        .args(["-u", user])
        .arg(agent_dir.join("config.sh").display().to_string())
        .args(["--unattended", "--url", reg.url.as_str(), "--auth", "pat", "--token"])
        .secret_arg(reg.token.as_str())
        .args([
            "--pool",
            reg.pool.as_str(),
            "--agent",
            reg.agent_name.as_str(),
            "--work",
            reg.work.as_str(),
        ]);
    let step = if reg.replace { step.arg("--replace") } else { step };
    step.arg("--acceptTeeEula").in_dir(agent_dir)
}

/// Install and start the agent's systemd unit.
#[must_use]
pub fn service_steps(agent_dir: &Path, user: &str) -> Vec<CommandStep> {
    vec![
        CommandStep::new("./svc.sh")
            .args(["install", user])
            .in_dir(agent_dir),
        CommandStep::new("./svc.sh").arg("start").in_dir(agent_dir),
    ]
}

/// Hand the agent directory to the service account.
#[must_use]
pub fn chown_step(agent_dir: &Path, user: &str) -> CommandStep {
    CommandStep::new("chown")
        .arg("-R")
        .arg(format!("{user}:{user}"))
        .arg(agent_dir.display().to_string())
}
