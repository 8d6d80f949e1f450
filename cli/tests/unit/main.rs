//! Unit tests for azp CLI
//!
//! These tests use port doubles and run fast without network or root access.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod aks_service;
mod architecture;
mod download_service;
mod tools_service;
mod verify_service;
