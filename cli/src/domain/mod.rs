//! Domain layer: pure types, parsers, validators and command plans.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`
//! sockets. All functions are synchronous and take data in, returning data out.

pub mod agent;
pub mod aks;
pub mod config;
pub mod error;
pub mod os;
pub mod report;
pub mod step;
pub mod tools;

pub use config::{AgentRegistration, AksConfig, ClusterRef, ProvisionConfig};
pub use error::{ConfigError, DownloadError, OsError, ProvisionError, StepError, error_code};
pub use os::{OsFamily, OsRelease, PackageManager};
pub use step::CommandStep;
pub use tools::Tool;
