//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, not from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Timeout for quick read-only probes (`id -u`, `<tool> --version`).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
    /// Run a program from `dir` (scripts that resolve paths relative to cwd).
    async fn run_in_dir(&self, dir: &Path, program: &str, args: &[&str]) -> Result<Output>;
}

// ── Download Ports ────────────────────────────────────────────────────────────

/// One way of retrieving a URL into a local file.
#[allow(async_fn_in_trait)]
pub trait PackageFetcher {
    /// Short label used in progress output (`http`, `curl`).
    fn method(&self) -> &'static str;
    /// Retrieve `url` into `dest`, overwriting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails. A returned `Ok` is not proof
    /// of success; callers still check the file.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Looks up the newest published agent release.
#[allow(async_fn_in_trait)]
pub trait ReleaseSource {
    /// Tag of the latest release, `None` if the endpoint returned none.
    async fn latest_tag(&self) -> Result<Option<String>>;
}

/// Unpacks the agent archive.
#[allow(async_fn_in_trait)]
pub trait ArchiveExtractor {
    /// Extract a `.tar.gz` archive into `dest`, creating it if needed.
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Filesystem Ports ──────────────────────────────────────────────────────────

/// Abstracts file hashing operations.
pub trait FileHasher {
    /// Compute the SHA-256 hash of a file.
    fn sha256_file(&self, path: &Path) -> Result<String>;
}

/// Abstracts the handful of filesystem operations the services need.
pub trait LocalFs {
    /// Length of a regular file, `None` if it does not exist.
    fn file_len(&self, path: &Path) -> Option<u64>;
    /// Remove a file; a missing file is not an error.
    fn remove_file(&self, path: &Path) -> Result<()>;
    /// Create a directory and its parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    /// Read a UTF-8 file.
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Write a file, replacing it.
    fn write(&self, path: &Path, content: &[u8]) -> Result<()>;
}
