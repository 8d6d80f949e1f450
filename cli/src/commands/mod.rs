//! Command implementations

pub mod aks;
pub mod config;
pub mod download;
pub mod provision;
pub mod tools;
pub mod verify;
pub mod version;

use std::path::Path;

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::ports::LocalFs;
use crate::domain::agent::AgentArch;
use crate::domain::os::{OsFamily, OsRelease, classify};
use crate::domain::report::ProvisionReport;
use crate::output::human::HumanRenderer;
use crate::output::json::to_json;

/// Read and classify the host's os-release file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has no `ID`, or names an
/// unsupported distribution.
pub fn detect_os(fs: &impl LocalFs, path: &Path) -> Result<(OsRelease, OsFamily)> {
    let content = fs
        .read_to_string(path)
        .with_context(|| format!("identifying the operating system from {}", path.display()))?;
    let release = OsRelease::parse(&content, &path.display().to_string())?;
    let family = classify(&release)?;
    tracing::debug!(id = %release.id, family = family.as_str(), "os detected");
    Ok((release, family))
}

/// Agent architecture of the running binary.
///
/// # Errors
///
/// Returns an error for architectures the agent is not published for.
pub fn host_arch() -> Result<AgentArch> {
    AgentArch::from_rust_arch(std::env::consts::ARCH)
}

/// Print a report in the active output mode.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn emit_report(app: &AppContext, report: &ProvisionReport) -> Result<()> {
    if app.is_json() {
        println!("{}", to_json(report)?);
    } else {
        HumanRenderer::new(&app.output).render_report(report);
    }
    Ok(())
}
