//! Domain types and validators for `azp` configuration.
//!
//! Configuration comes from `AZP_*` (host provisioning) and `AKS_*` (cluster)
//! environment variables. Loading is done with `envy` from any key/value
//! iterator so tests never touch the process environment.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::os::DEFAULT_OS_RELEASE_PATH;
use crate::domain::step::MASK;
use crate::domain::tools::Tool;

// ── Constants ────────────────────────────────────────────────────────────────

pub const AZP_PREFIX: &str = "AZP_";
pub const AKS_PREFIX: &str = "AKS_";

static ACCOUNT_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").ok());

// ── Provisioning config ──────────────────────────────────────────────────────

/// Host provisioning settings, one field per `AZP_<FIELD>` variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Organization URL, e.g. `https://dev.azure.com/contoso`. Required.
    #[serde(default)]
    pub url: Option<String>,

    /// Personal access token used to register the agent. Required.
    #[serde(default)]
    pub token: Option<String>,

    /// Agent pool name.
    #[serde(default = "default_pool")]
    pub pool: String,

    /// Agent name; the host name when unset.
    #[serde(default)]
    pub agent_name: Option<String>,

    /// Agent work directory, relative to the agent directory.
    #[serde(default = "default_work")]
    pub work: String,

    /// Service account that owns and runs the agent.
    #[serde(default = "default_agent_user")]
    pub agent_user: String,

    /// Directory the agent package is extracted into.
    #[serde(default = "default_agent_dir")]
    pub agent_dir: PathBuf,

    /// Pinned agent version; skips the latest-release lookup.
    #[serde(default)]
    pub agent_version: Option<String>,

    /// URL templates replacing the built-in mirror list.
    #[serde(default)]
    pub agent_mirrors: Option<Vec<String>>,

    /// Expected SHA-256 of the agent archive.
    #[serde(default)]
    pub agent_sha256: Option<String>,

    /// Pass `--replace` when registering.
    #[serde(default = "enabled")]
    pub replace: bool,

    /// Install and start the agent as a systemd service.
    #[serde(default = "enabled")]
    pub run_as_service: bool,

    /// Install Docker and add the service account to the `docker` group.
    #[serde(default = "enabled")]
    pub install_docker: bool,

    /// Install auxiliary developer tools.
    #[serde(default)]
    pub install_tools: bool,

    /// Subset of tools to install; all when unset.
    #[serde(default)]
    pub tools: Option<Vec<String>>,

    /// Node.js major release line.
    #[serde(default = "default_node_major")]
    pub node_major: String,

    /// .NET SDK channel.
    #[serde(default = "default_dotnet_channel")]
    pub dotnet_channel: String,

    /// Timeout applied to each install command.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,

    /// Release-info file used for OS detection.
    #[serde(default = "default_os_release_path")]
    pub os_release_path: PathBuf,
}

fn default_pool() -> String {
    "Default".to_string()
}

fn default_work() -> String {
    "_work".to_string()
}

fn default_agent_user() -> String {
    "azpagent".to_string()
}

fn default_agent_dir() -> PathBuf {
    PathBuf::from("/opt/azp-agent")
}

fn default_node_major() -> String {
    "20".to_string()
}

fn default_dotnet_channel() -> String {
    "8.0".to_string()
}

fn default_step_timeout_secs() -> u64 {
    1800
}

fn default_os_release_path() -> PathBuf {
    PathBuf::from(DEFAULT_OS_RELEASE_PATH)
}

fn enabled() -> bool {
    true
}

/// Everything `config.sh` needs to register the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRegistration {
    pub url: String,
    pub token: String,
    pub pool: String,
    pub agent_name: String,
    pub work: String,
    pub replace: bool,
}

impl ProvisionConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Environment`] if a variable cannot be parsed
    /// into its field type (e.g. `AZP_INSTALL_TOOLS=maybe`).
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Load from an arbitrary key/value iterator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Environment`] on unparsable values.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(AZP_PREFIX)
            .from_iter(vars)
            .map_err(|e| {
                ConfigError::Environment {
                    prefix: AZP_PREFIX,
                    message: e.to_string(),
                }
                .into()
            })
    }

    /// Validate every optional setting that has a constrained shape.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first bad value.
    pub fn validate(&self) -> Result<()> {
        validate_account_name(&self.agent_user)?;
        if let Some(version) = non_empty(self.agent_version.as_deref()) {
            semver::Version::parse(version.trim_start_matches('v')).map_err(|e| {
                ConfigError::InvalidValue {
                    var: "AZP_AGENT_VERSION",
                    value: version.to_string(),
                    reason: format!("Expected a version like 4.248.0 ({e})"),
                }
            })?;
        }
        if let Some(sha) = non_empty(self.agent_sha256.as_deref()) {
            if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::InvalidValue {
                    var: "AZP_AGENT_SHA256",
                    value: sha.to_string(),
                    reason: "Expected 64 hex characters".to_string(),
                }
                .into());
            }
        }
        if self.step_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "AZP_STEP_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "Timeout must be at least one second".to_string(),
            }
            .into());
        }
        if !self.agent_dir.is_absolute() {
            return Err(ConfigError::InvalidValue {
                var: "AZP_AGENT_DIR",
                value: self.agent_dir.display().to_string(),
                reason: "Agent directory must be an absolute path".to_string(),
            }
            .into());
        }
        self.selected_tools()?;
        Ok(())
    }

    /// Required registration settings, with the agent name defaulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `AZP_URL` or `AZP_TOKEN` is unset
    /// or empty, and [`ConfigError::InvalidValue`] for a non-HTTP URL.
    pub fn registration(&self, default_agent_name: &str) -> Result<AgentRegistration> {
        let url = non_empty(self.url.as_deref()).ok_or(ConfigError::Missing { var: "AZP_URL" })?;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                var: "AZP_URL",
                value: url.to_string(),
                reason: "Expected an organization URL such as https://dev.azure.com/contoso"
                    .to_string(),
            }
            .into());
        }
        let token =
            non_empty(self.token.as_deref()).ok_or(ConfigError::Missing { var: "AZP_TOKEN" })?;

        Ok(AgentRegistration {
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            pool: self.pool.clone(),
            agent_name: non_empty(self.agent_name.as_deref())
                .unwrap_or(default_agent_name)
                .to_string(),
            work: self.work.clone(),
            replace: self.replace,
        })
    }

    /// Tools selected by `AZP_TOOLS`, or all tools when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unknown tool name.
    pub fn selected_tools(&self) -> Result<Vec<Tool>> {
        match &self.tools {
            Some(names) if !names.iter().all(|n| n.trim().is_empty()) => parse_tool_list(names),
            _ => Ok(Tool::ALL.to_vec()),
        }
    }

    /// Secrets that must never appear in output.
    #[must_use]
    pub fn secrets(&self) -> Vec<String> {
        self.token.iter().filter(|t| !t.is_empty()).cloned().collect()
    }

    /// A copy safe to print: the token is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.token.is_some() {
            copy.token = Some(MASK.to_string());
        }
        copy
    }
}

/// Parse tool names (`kubectl`, `helm`, ...) preserving order, dropping duplicates.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for an unknown name.
pub fn parse_tool_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Tool>> {
    let mut tools = Vec::new();
    for name in names.iter().map(|n| n.as_ref().trim()).filter(|n| !n.is_empty()) {
        let tool = name.parse::<Tool>().map_err(|()| ConfigError::InvalidValue {
            var: "AZP_TOOLS",
            value: name.to_string(),
            reason: format!(
                "Valid tools: {}",
                Tool::ALL.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ")
            ),
        })?;
        if !tools.contains(&tool) {
            tools.push(tool);
        }
    }
    Ok(tools)
}

/// Validates a Linux account name.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if the name would be rejected by `useradd`.
pub fn validate_account_name(name: &str) -> Result<()> {
    let ok = ACCOUNT_NAME.as_ref().is_some_and(|re| re.is_match(name));
    if !ok {
        return Err(ConfigError::InvalidValue {
            var: "AZP_AGENT_USER",
            value: name.to_string(),
            reason: "Must match ^[a-z_][a-z0-9_-]{0,31}$".to_string(),
        }
        .into());
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ── AKS config ───────────────────────────────────────────────────────────────

/// Cluster settings, one field per `AKS_<FIELD>` variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AksConfig {
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default)]
    pub cluster_name: Option<String>,
    /// Apply manifests through `az aks command invoke` instead of kubectl.
    #[serde(default)]
    pub private_cluster: bool,
    #[serde(default = "default_ingress_class")]
    pub ingress_class: String,
    #[serde(default)]
    pub dns_zone: Option<String>,
    #[serde(default)]
    pub vnet_id: Option<String>,
    #[serde(default)]
    pub ingress_ip: Option<String>,
    #[serde(default = "default_dns_record")]
    pub dns_record: String,
    #[serde(default)]
    pub onprem_domain: Option<String>,
    #[serde(default)]
    pub onprem_dns_servers: Option<Vec<String>>,
    #[serde(default)]
    pub keyvault_name: Option<String>,
    #[serde(default = "default_cert_name")]
    pub cert_name: String,
    #[serde(default)]
    pub cert_host: Option<String>,
    #[serde(default = "default_cert_days")]
    pub cert_days: u32,
}

fn default_ingress_class() -> String {
    "nginx-internal".to_string()
}

fn default_dns_record() -> String {
    "*".to_string()
}

fn default_cert_name() -> String {
    "ingress-tls".to_string()
}

fn default_cert_days() -> u32 {
    365
}

/// The resource group / cluster pair every `aks` command targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRef {
    pub resource_group: String,
    pub name: String,
}

impl AksConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Environment`] on unparsable values.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Load from an arbitrary key/value iterator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Environment`] on unparsable values.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(AKS_PREFIX)
            .from_iter(vars)
            .map_err(|e| {
                ConfigError::Environment {
                    prefix: AKS_PREFIX,
                    message: e.to_string(),
                }
                .into()
            })
    }

    /// Resource group and cluster name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if either is unset.
    pub fn cluster(&self) -> Result<ClusterRef> {
        Ok(ClusterRef {
            resource_group: required(self.resource_group.as_deref(), "AKS_RESOURCE_GROUP")?,
            name: required(self.cluster_name.as_deref(), "AKS_CLUSTER_NAME")?,
        })
    }
}

/// Return a trimmed, non-empty value or a [`ConfigError::Missing`] naming `var`.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] when `value` is `None` or blank.
pub fn required(value: Option<&str>, var: &'static str) -> Result<String> {
    non_empty(value)
        .map(str::to_string)
        .ok_or_else(|| ConfigError::Missing { var }.into())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
