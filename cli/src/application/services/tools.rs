//! Application service: auxiliary tool installation.
//!
//! Each tool is independent: a failing tool is reported and the next one is
//! still attempted.

use anyhow::Result;

use crate::application::ports::{CommandRunner, ProgressReporter};
use crate::application::services::steps::run_plan;
use crate::domain::os::{OsFamily, OsRelease};
use crate::domain::tools::{Tool, ToolOptions, install_plan};

/// Result of a tools phase.
#[derive(Debug, Default)]
pub struct ToolsOutcome {
    pub installed: Vec<Tool>,
    /// Tools whose plan failed, with the rendered error.
    pub failed: Vec<(Tool, String)>,
}

impl ToolsOutcome {
    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Install `tools` in order. Never fails as a whole.
pub async fn install_tools(
    runner: &impl CommandRunner,
    reporter: &impl ProgressReporter,
    tools: &[Tool],
    family: OsFamily,
    release: &OsRelease,
    opts: &ToolOptions,
) -> ToolsOutcome {
    let mut outcome = ToolsOutcome::default();
    for &tool in tools {
        reporter.step(&format!("installing {tool}..."));
        match install_one(runner, tool, family, release, opts).await {
            Ok(()) => {
                reporter.success(&format!("{tool} installed"));
                outcome.installed.push(tool);
            }
            Err(e) => {
                let message = format!("{e:#}");
                reporter.warn(&format!("{tool} failed: {message}"));
                outcome.failed.push((tool, message));
            }
        }
    }
    outcome
}

async fn install_one(
    runner: &impl CommandRunner,
    tool: Tool,
    family: OsFamily,
    release: &OsRelease,
    opts: &ToolOptions,
) -> Result<()> {
    run_plan(runner, &install_plan(tool, family, release, opts)).await
}
