//! Host operating system identification and package-manager dispatch.
//!
//! Pure functions only. The caller reads the `os-release` file and hands the
//! text in.

use std::collections::HashMap;

use anyhow::Result;

use crate::domain::error::OsError;
use crate::domain::step::CommandStep;

// ── Constants ────────────────────────────────────────────────────────────────

/// Default location of the release-info file.
pub const DEFAULT_OS_RELEASE_PATH: &str = "/etc/os-release";

const DEBIAN_IDS: &[&str] = &["ubuntu", "debian"];
const RHEL_IDS: &[&str] = &["rhel", "centos", "rocky", "almalinux", "ol", "fedora"];

// ── os-release ───────────────────────────────────────────────────────────────

/// Fields of interest from an `os-release` file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OsRelease {
    /// Lower-case distribution identifier, e.g. `ubuntu`.
    pub id: String,
    /// Space-separated parent distributions, e.g. `["rhel", "fedora"]`.
    pub id_like: Vec<String>,
    /// Version, e.g. `22.04` or `9.3`.
    pub version_id: Option<String>,
    /// Human-readable name.
    pub pretty_name: Option<String>,
    /// `VERSION_CODENAME`, e.g. `bookworm` or `wilma`.
    pub codename: Option<String>,
    /// `UBUNTU_CODENAME` on Ubuntu derivatives, e.g. `noble`.
    pub ubuntu_codename: Option<String>,
}

impl OsRelease {
    /// Parse the `KEY=value` lines of an `os-release` file.
    ///
    /// Comments, blank lines and malformed lines are skipped. Values may be
    /// single- or double-quoted.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::MissingId`] if the file has no `ID` field.
    pub fn parse(content: &str, path: &str) -> Result<Self> {
        let fields: HashMap<&str, String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .filter_map(|l| l.split_once('='))
            .map(|(k, v)| (k.trim(), unquote(v.trim())))
            .collect();

        let id = fields
            .get("ID")
            .map(|v| v.to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| OsError::MissingId {
                path: path.to_string(),
            })?;

        Ok(Self {
            id,
            id_like: fields
                .get("ID_LIKE")
                .map(|v| v.split_whitespace().map(str::to_ascii_lowercase).collect())
                .unwrap_or_default(),
            version_id: fields.get("VERSION_ID").cloned(),
            pretty_name: fields.get("PRETTY_NAME").cloned(),
            codename: non_empty_field(&fields, "VERSION_CODENAME"),
            ubuntu_codename: non_empty_field(&fields, "UBUNTU_CODENAME"),
        })
    }

    /// Major component of `VERSION_ID` (`9.3` → `9`).
    #[must_use]
    pub fn major_version(&self) -> Option<&str> {
        self.version_id
            .as_deref()
            .and_then(|v| v.split('.').next())
            .filter(|v| !v.is_empty())
    }

    /// Name used in user-facing output.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.pretty_name.clone().unwrap_or_else(|| {
            format!("{} {}", self.id, self.version_id.as_deref().unwrap_or(""))
                .trim_end()
                .to_string()
        })
    }
}

fn non_empty_field(fields: &HashMap<&str, String>, key: &str) -> Option<String> {
    fields
        .get(key)
        .map(|v| v.to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
        .to_string()
}

// ── Classification ───────────────────────────────────────────────────────────

/// Distribution family, which selects the package-installation branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Debian,
    Rhel,
}

impl OsFamily {
    /// Package manager for this family.
    #[must_use]
    pub fn package_manager(self) -> PackageManager {
        match self {
            OsFamily::Debian => PackageManager::Apt,
            OsFamily::Rhel => PackageManager::Dnf,
        }
    }

    /// Short lower-case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OsFamily::Debian => "debian",
            OsFamily::Rhel => "rhel",
        }
    }
}

fn family_of(id: &str) -> Option<OsFamily> {
    if DEBIAN_IDS.contains(&id) {
        Some(OsFamily::Debian)
    } else if RHEL_IDS.contains(&id) {
        Some(OsFamily::Rhel)
    } else {
        None
    }
}

/// Classify a parsed release into a supported family.
///
/// `ID` is matched first; when it is unknown each entry of `ID_LIKE` is tried
/// in order.
///
/// # Errors
///
/// Returns [`OsError::Unsupported`] naming the `ID` when nothing matches.
pub fn classify(release: &OsRelease) -> Result<OsFamily> {
    family_of(&release.id)
        .or_else(|| release.id_like.iter().find_map(|like| family_of(like)))
        .ok_or_else(|| {
            OsError::Unsupported {
                id: release.id.clone(),
            }
            .into()
        })
}

// ── Package manager ──────────────────────────────────────────────────────────

/// Command shapes of the two supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
}

impl PackageManager {
    /// Refresh package metadata.
    #[must_use]
    pub fn update(self) -> CommandStep {
        match self {
            PackageManager::Apt => apt().arg("update"),
            PackageManager::Dnf => CommandStep::new("dnf").args(["makecache", "-y"]),
        }
    }

    /// Install `packages` non-interactively.
    #[must_use]
    pub fn install<S: AsRef<str>>(self, packages: &[S]) -> CommandStep {
        let base = match self {
            PackageManager::Apt => apt().args(["install", "-y", "--no-install-recommends"]),
            PackageManager::Dnf => CommandStep::new("dnf").args(["install", "-y"]),
        };
        base.args(packages.iter().map(AsRef::as_ref))
    }

    /// Packages every agent host needs (the agent links against ICU).
    #[must_use]
    pub fn base_packages(self) -> &'static [&'static str] {
        match self {
            PackageManager::Apt => &[
                "ca-certificates",
                "curl",
                "git",
                "jq",
                "tar",
                "unzip",
                "gnupg",
                "libicu-dev",
            ],
            PackageManager::Dnf => &["ca-certificates", "curl", "git", "jq", "tar", "unzip", "libicu"],
        }
    }
}

fn apt() -> CommandStep {
    CommandStep::new("env").args(["DEBIAN_FRONTEND=noninteractive", "apt-get"])
}
