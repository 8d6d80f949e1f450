//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {var} is not set")]
    Missing { var: &'static str },

    #[error("Invalid value for {var}: {value}\n\n{reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Cannot read {prefix}* environment: {message}")]
    Environment {
        prefix: &'static str,
        message: String,
    },
}

// ── OS errors ─────────────────────────────────────────────────────────────────

/// Errors raised while identifying the host operating system.
#[derive(Debug, Error)]
pub enum OsError {
    #[error("Unsupported OS '{id}'. Supported: Debian family (ubuntu, debian) and RHEL family (rhel, centos, rocky, almalinux, ol, fedora).")]
    Unsupported { id: String },

    #[error("OS release file {path} has no ID field")]
    MissingId { path: String },

    #[error("Unsupported CPU architecture: {0}")]
    UnsupportedArch(String),
}

// ── Download errors ───────────────────────────────────────────────────────────

/// Errors raised by the agent package download chain.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("No download sources configured for agent {version}")]
    NoSources { version: String },

    #[error(
        "Failed to download agent {version} from all {tried} sources.\n\nDownload it manually from {manual_url} and place it at {dest}"
    )]
    AllSourcesFailed {
        version: String,
        tried: usize,
        manual_url: &'static str,
        dest: String,
    },

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Downloaded file {path} is missing or empty")]
    EmptyFile { path: String },
}

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Fatal provisioning failures outside the download chain.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Failed to extract agent package {archive}: {reason}")]
    Extraction { archive: String, reason: String },

    #[error("Provisioning must run as root (current uid {uid}). Re-run with sudo.")]
    NotRoot { uid: String },
}

// ── Step errors ───────────────────────────────────────────────────────────────

/// A single external command failed.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("`{command}` exited with {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: String,
        stderr: String,
    },
}

/// Stable machine-readable code for an error chain, used by `--json` output.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ConfigError>() {
            return match e {
                ConfigError::Missing { .. } => "config_missing",
                ConfigError::InvalidValue { .. } | ConfigError::Environment { .. } => {
                    "config_invalid"
                }
            };
        }
        if let Some(e) = cause.downcast_ref::<OsError>() {
            return match e {
                OsError::UnsupportedArch(_) => "arch_unsupported",
                OsError::Unsupported { .. } | OsError::MissingId { .. } => "os_unsupported",
            };
        }
        if cause.downcast_ref::<DownloadError>().is_some() {
            return "download_failed";
        }
        if let Some(e) = cause.downcast_ref::<ProvisionError>() {
            return match e {
                ProvisionError::Extraction { .. } => "extraction_failed",
                ProvisionError::NotRoot { .. } => "not_root",
            };
        }
        if cause.downcast_ref::<StepError>().is_some() {
            return "step_failed";
        }
    }
    "internal"
}
