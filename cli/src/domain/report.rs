//! Run summary shown at the end of `azp provision` and by `azp verify`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::agent::VersionSource;

/// Version probe result for one installed component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
    /// Component name (`docker`, `kubectl`, ...).
    pub name: String,
    /// First line of the version output, `None` when the probe failed.
    pub version: Option<String>,
}

impl ComponentStatus {
    #[must_use]
    pub fn installed(&self) -> bool {
        self.version.is_some()
    }
}

/// Details of the agent package that was installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentSummary {
    pub version: String,
    pub version_source: VersionSource,
    pub source_url: Option<String>,
    pub sha256: Option<String>,
    pub directory: String,
    pub registered: bool,
}

/// State of the agent's systemd unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub unit: Option<String>,
    pub active: bool,
}

/// Summary of a provisioning run or verification.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub generated_at: DateTime<Utc>,
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentSummary>,
    pub service: ServiceStatus,
    pub components: Vec<ComponentStatus>,
    /// Non-fatal problems encountered along the way.
    pub warnings: Vec<String>,
}

impl ProvisionReport {
    /// Names of probed components that are missing.
    #[must_use]
    pub fn missing(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|c| !c.installed())
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// First non-empty line of a version command's output.
#[must_use]
pub fn first_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
