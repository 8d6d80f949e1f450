//! Application context: unified state passed to every command handler.
//!
//! Constructed once in `Cli::run()`. Adding a cross-cutting concern means one
//! field here, not a change to every command signature.

use std::time::Duration;

use anyhow::Result;

use crate::application::ports::PROBE_TIMEOUT;
use crate::domain::config::{AksConfig, ProvisionConfig};
use crate::infra::command_runner::{HostRunner, TokioCommandRunner};
use crate::output::OutputContext;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub no_color: bool,
    pub quiet: bool,
    pub json: bool,
    /// Log commands instead of running them.
    pub dry_run: bool,
    /// Skip interactive prompts (also set by `CI` / `AZP_YES`).
    pub yes: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context. Quiet in JSON mode so stdout stays parseable.
    pub output: OutputContext,
    pub mode: OutputMode,
    pub dry_run: bool,
    /// When `true`, skip interactive prompts and use defaults.
    pub non_interactive: bool,
    /// Environment snapshot configuration is loaded from.
    env: Vec<(String, String)>,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags and the process
    /// environment.
    #[must_use]
    pub fn new(flags: &AppFlags) -> Self {
        Self::with_env(flags, std::env::vars().collect())
    }

    /// Construct with an explicit environment.
    #[must_use]
    pub fn with_env(flags: &AppFlags, env: Vec<(String, String)>) -> Self {
        let ci_env = env.iter().any(|(k, _)| k == "CI" || k == "AZP_YES");
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        Self {
            output: OutputContext::new(flags.no_color, flags.quiet || flags.json),
            mode,
            dry_run: flags.dry_run,
            non_interactive: flags.yes || ci_env,
            env,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// `AZP_*` provisioning configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed.
    pub fn provision_config(&self) -> Result<ProvisionConfig> {
        ProvisionConfig::from_vars(self.env.iter().cloned())
    }

    /// `AKS_*` cluster configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed.
    pub fn aks_config(&self) -> Result<AksConfig> {
        AksConfig::from_vars(self.env.iter().cloned())
    }

    /// A single environment variable from the snapshot.
    #[must_use]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The process runner for this invocation, masking `secrets` in dry runs.
    #[must_use]
    pub fn runner(&self, timeout: Duration, secrets: Vec<String>) -> HostRunner {
        HostRunner::new(self.dry_run, timeout, secrets)
    }

    /// Runner for read-only probes. Never a dry run: probing changes nothing.
    #[must_use]
    pub fn probe_runner(&self) -> TokioCommandRunner {
        TokioCommandRunner::new(PROBE_TIMEOUT)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` or stdin is not a terminal, returns
    /// `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails.
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive || !console::Term::stdout().is_term() || self.is_json() {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
