//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod agent;
pub mod aks;
pub mod download;
pub mod host;
pub mod provision;
pub mod steps;
pub mod tools;
pub mod verify;
