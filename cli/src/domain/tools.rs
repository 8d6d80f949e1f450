//! Auxiliary developer tools and their per-family install plans.

use std::fmt;
use std::str::FromStr;

use crate::domain::os::{OsFamily, OsRelease};
use crate::domain::step::CommandStep;

/// A tool the build host can be provisioned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Kubectl,
    Helm,
    Terraform,
    Dotnet,
    Node,
    Pwsh,
    AzureCli,
}

impl Tool {
    /// Every tool, in installation order.
    pub const ALL: [Tool; 7] = [
        Tool::AzureCli,
        Tool::Kubectl,
        Tool::Helm,
        Tool::Terraform,
        Tool::Dotnet,
        Tool::Node,
        Tool::Pwsh,
    ];

    /// Canonical name, also the binary name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Tool::Kubectl => "kubectl",
            Tool::Helm => "helm",
            Tool::Terraform => "terraform",
            Tool::Dotnet => "dotnet",
            Tool::Node => "node",
            Tool::Pwsh => "pwsh",
            Tool::AzureCli => "az",
        }
    }

    /// Command that prints the installed version.
    #[must_use]
    pub fn version_probe(self) -> CommandStep {
        let step = CommandStep::new(self.name());
        match self {
            Tool::Kubectl => step.args(["version", "--client"]),
            Tool::Helm => step.args(["version", "--short"]),
            Tool::Terraform => step.arg("version"),
            Tool::AzureCli => step.args(["version", "--query", "\"azure-cli\"", "-o", "tsv"]),
            Tool::Dotnet | Tool::Node | Tool::Pwsh => step.arg("--version"),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kubectl" => Ok(Tool::Kubectl),
            "helm" => Ok(Tool::Helm),
            "terraform" => Ok(Tool::Terraform),
            "dotnet" | ".net" => Ok(Tool::Dotnet),
            "node" | "nodejs" => Ok(Tool::Node),
            "pwsh" | "powershell" => Ok(Tool::Pwsh),
            "az" | "azure-cli" | "azcli" => Ok(Tool::AzureCli),
            _ => Err(()),
        }
    }
}

/// Version knobs for the tools that have them.
#[derive(Debug, Clone)]
pub struct ToolOptions {
    /// Node.js major line, e.g. `20`.
    pub node_major: String,
    /// .NET channel, e.g. `8.0`.
    pub dotnet_channel: String,
    /// Kubernetes architecture label, e.g. `amd64`.
    pub kube_arch: &'static str,
}

/// Build the install plan for `tool` on the given distribution.
#[must_use]
pub fn install_plan(
    tool: Tool,
    family: OsFamily,
    release: &OsRelease,
    opts: &ToolOptions,
) -> Vec<CommandStep> {
    let pm = family.package_manager();
    match tool {
        Tool::Kubectl => vec![
            CommandStep::shell(format!(
                "curl -fsSL -o /usr/local/bin/kubectl \"https://dl.k8s.io/release/$(curl -fsSL https://dl.k8s.io/release/stable.txt)/bin/linux/{}/kubectl\"",
                opts.kube_arch
            )),
            CommandStep::new("chmod").args(["0755", "/usr/local/bin/kubectl"]),
        ],
        Tool::Helm => vec![CommandStep::shell(
            "curl -fsSL https://raw.githubusercontent.com/helm/helm/main/scripts/get-helm-3 | bash",
        )],
        Tool::Terraform => match family {
            OsFamily::Debian => vec![
                CommandStep::shell(
                    "curl -fsSL https://apt.releases.hashicorp.com/gpg | gpg --batch --yes --dearmor -o /usr/share/keyrings/hashicorp-archive-keyring.gpg",
                ),
                CommandStep::shell(
                    "echo \"deb [signed-by=/usr/share/keyrings/hashicorp-archive-keyring.gpg] https://apt.releases.hashicorp.com $(. /etc/os-release && echo $VERSION_CODENAME) main\" > /etc/apt/sources.list.d/hashicorp.list",
                ),
                pm.update(),
                pm.install(&["terraform"]),
            ],
            OsFamily::Rhel => {
                let repo = if release.id == "fedora" { "fedora" } else { "RHEL" };
                vec![
                    pm.install(&["dnf-plugins-core"]),
                    CommandStep::new("dnf").args([
                        "config-manager".to_string(),
                        "--add-repo".to_string(),
                        format!("https://rpm.releases.hashicorp.com/{repo}/hashicorp.repo"),
                    ]),
                    pm.install(&["terraform"]),
                ]
            }
        },
        Tool::Dotnet => vec![
            CommandStep::new("curl").args([
                "-fsSL",
                "-o",
                "/tmp/dotnet-install.sh",
                "https://dot.net/v1/dotnet-install.sh",
            ]),
            CommandStep::new("bash").args([
                "/tmp/dotnet-install.sh",
                "--channel",
                opts.dotnet_channel.as_str(),
                "--install-dir",
                "/usr/share/dotnet",
            ]),
            CommandStep::new("ln").args(["-sf", "/usr/share/dotnet/dotnet", "/usr/local/bin/dotnet"]),
        ],
        Tool::Node => {
            let host = match family {
                OsFamily::Debian => "deb.nodesource.com",
                OsFamily::Rhel => "rpm.nodesource.com",
            };
            vec![
                CommandStep::shell(format!(
                    "curl -fsSL https://{host}/setup_{}.x | bash -",
                    opts.node_major
                )),
                pm.install(&["nodejs"]),
            ]
        }
        Tool::Pwsh => {
            let mut plan = microsoft_repo(family, release);
            plan.push(pm.install(&["powershell"]));
            plan
        }
        Tool::AzureCli => match family {
            OsFamily::Debian => vec![CommandStep::shell(
                "curl -fsSL https://aka.ms/InstallAzureCLIDeb | bash",
            )],
            OsFamily::Rhel => {
                let mut plan = vec![CommandStep::new("rpm").args([
                    "--import",
                    "https://packages.microsoft.com/keys/microsoft.asc",
                ])];
                plan.extend(microsoft_repo(family, release));
                plan.push(pm.install(&["azure-cli"]));
                plan
            }
        },
    }
}

const UBUNTU_RELEASES: &[(&str, &str)] = &[
    ("bionic", "18.04"),
    ("focal", "20.04"),
    ("jammy", "22.04"),
    ("noble", "24.04"),
];

const DEBIAN_RELEASES: &[(&str, &str)] = &[
    ("buster", "10"),
    ("bullseye", "11"),
    ("bookworm", "12"),
    ("trixie", "13"),
];

fn lookup(table: &[(&str, &'static str)], codename: Option<&str>) -> Option<&'static str> {
    let codename = codename?;
    table.iter().find(|(name, _)| *name == codename).map(|(_, v)| *v)
}

/// Distribution and release directory under packages.microsoft.com/config.
///
/// Ubuntu uses the full release (`22.04`), Debian the major (`12`).
/// Derivatives such as Mint map through `UBUNTU_CODENAME` or
/// `VERSION_CODENAME`; an unknown derivative gets the parent's current LTS.
fn microsoft_repo_release(release: &OsRelease) -> (&'static str, String) {
    match release.id.as_str() {
        "ubuntu" => (
            "ubuntu",
            release.version_id.clone().unwrap_or_else(|| "22.04".to_string()),
        ),
        "debian" => ("debian", release.major_version().unwrap_or("12").to_string()),
        _ => {
            let codename = release.codename.as_deref();
            if let Some(v) = lookup(UBUNTU_RELEASES, release.ubuntu_codename.as_deref())
                .or_else(|| lookup(UBUNTU_RELEASES, codename))
            {
                ("ubuntu", v.to_string())
            } else if let Some(v) = lookup(DEBIAN_RELEASES, codename) {
                ("debian", v.to_string())
            } else if release.id_like.iter().any(|l| l == "ubuntu") {
                ("ubuntu", "22.04".to_string())
            } else {
                ("debian", "12".to_string())
            }
        }
    }
}

/// Steps registering the packages.microsoft.com repository.
fn microsoft_repo(family: OsFamily, release: &OsRelease) -> Vec<CommandStep> {
    match family {
        OsFamily::Debian => {
            let (distro, version) = microsoft_repo_release(release);
            vec![
                CommandStep::new("curl").args([
                    "-fsSL".to_string(),
                    "-o".to_string(),
                    "/tmp/packages-microsoft-prod.deb".to_string(),
                    format!(
                        "https://packages.microsoft.com/config/{distro}/{version}/packages-microsoft-prod.deb"
                    ),
                ]),
                CommandStep::new("dpkg").args(["-i", "/tmp/packages-microsoft-prod.deb"]),
                family.package_manager().update(),
            ]
        }
        OsFamily::Rhel => {
            let major = release.major_version().unwrap_or("9");
            vec![family.package_manager().install(&[format!(
                "https://packages.microsoft.com/config/rhel/{major}/packages-microsoft-prod.rpm"
            )])]
        }
    }
}
