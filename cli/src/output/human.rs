//! Human-readable terminal renderer.

use crate::application::services::agent::FetchedAgent;
use crate::application::services::tools::ToolsOutcome;
use crate::domain::agent::VersionSource;
use crate::domain::report::{AgentSummary, ComponentStatus, ProvisionReport, ServiceStatus};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the provisioning / verification summary.
    pub fn render_report(&self, report: &ProvisionReport) {
        self.ctx.header("Summary");
        if let Some(os) = &report.os {
            self.ctx.kv("OS:      ", os);
        }
        if let Some(agent) = &report.agent {
            self.ctx.kv("Agent:   ", &agent_line(agent));
            self.ctx.kv("Path:    ", &agent.directory);
            if let Some(url) = &agent.source_url {
                self.ctx.kv("Source:  ", url);
            }
        }
        self.ctx.kv("Service: ", &service_line(&report.service));

        if !report.components.is_empty() {
            self.ctx.header("Components");
            for component in &report.components {
                self.ctx.check(component.installed(), &component_line(component));
            }
        }

        if !report.warnings.is_empty() {
            self.ctx.header(&format!("Warnings ({})", report.warnings.len()));
            for warning in &report.warnings {
                self.ctx.warn(warning);
            }
        }
    }

    /// Render the outcome of a tools phase.
    pub fn render_tools(&self, outcome: &ToolsOutcome) {
        let installed: Vec<&str> = outcome.installed.iter().map(|t| t.name()).collect();
        if !installed.is_empty() {
            self.ctx.check(true, &format!("installed: {}", installed.join(", ")));
        }
        for (tool, error) in &outcome.failed {
            self.ctx.warn(&format!("{tool}: {error}"));
        }
    }

    /// Render a finished download.
    pub fn render_download(&self, fetched: &FetchedAgent) {
        self.ctx.kv("Version:", &fetched.version.to_string());
        self.ctx.kv("Archive:", &fetched.archive.display().to_string());
        self.ctx.kv(
            "Source: ",
            &format!(
                "{} (source {}, via {})",
                fetched.download.url,
                fetched.download.index + 1,
                fetched.download.method
            ),
        );
        self.ctx.kv("SHA-256:", &fetched.download.sha256);
    }

    /// Render effective configuration (already redacted) as YAML.
    pub fn render_config(&self, title: &str, yaml: &str) {
        self.ctx.header(title);
        for line in yaml.lines() {
            self.ctx.text(line);
        }
    }
}

/// `4.248.0 (latest), registered`
#[must_use]
pub fn agent_line(agent: &AgentSummary) -> String {
    let source = match agent.version_source {
        VersionSource::Pinned => "pinned",
        VersionSource::Latest => "latest",
        VersionSource::Fallback => "fallback",
    };
    let registered = if agent.registered {
        "registered"
    } else {
        "not registered"
    };
    format!("{} ({source}), {registered}", agent.version)
}

/// `vsts.agent.contoso.Default.build-01.service (active)` or `not installed`.
#[must_use]
pub fn service_line(service: &ServiceStatus) -> String {
    match &service.unit {
        Some(unit) if service.active => format!("{unit} (active)"),
        Some(unit) => format!("{unit} (inactive)"),
        None => "not installed".to_string(),
    }
}

/// `helm: v3.14.0` or `helm: not found`.
#[must_use]
pub fn component_line(component: &ComponentStatus) -> String {
    format!(
        "{}: {}",
        component.name,
        component.version.as_deref().unwrap_or("not found")
    )
}
