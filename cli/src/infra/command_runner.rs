//! Infrastructure implementations of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation: tokio processes with
//! a guaranteed kill on timeout. `DryRunRunner` logs each command instead of
//! running it.

use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

use crate::application::ports::CommandRunner;
use crate::domain::step::mask_secrets;

/// Default timeout for a provisioning step (package installs can be slow).
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(1800);

/// Production `CommandRunner`.
///
/// `tokio::time::timeout` around `.output().await` drops the future but leaves
/// the process running, so this uses `tokio::select!` with an explicit
/// `child.kill()`.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn command(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Wait for `child`, reading stdout and stderr concurrently, killing it when
/// `timeout` elapses.
async fn collect(mut child: Child, program: &str, timeout: Duration) -> Result<Output> {
    let mut stdout_handle = child.stdout.take();
    let mut stderr_handle = child.stderr.take();

    tokio::select! {
        result = async {
            let (status, stdout, stderr) = tokio::join!(
                child.wait(),
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stdout_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stderr_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
            );
            Ok(Output {
                status: status.with_context(|| format!("waiting for {program}"))?,
                stdout,
                stderr,
            })
        } => result,
        () = tokio::time::sleep(timeout) => {
            let _ = child.kill().await;
            anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
        }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        let child = command(program, args)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        collect(child, program, timeout).await
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        let mut child = command(program, args)
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        // Written from a separate task so a child that fills its stdout pipe
        // before draining stdin cannot deadlock us.
        let stdin_handle = child.stdin.take();
        let input_owned = input.to_vec();
        let stdin_task = tokio::spawn(async move {
            if let Some(mut stdin) = stdin_handle {
                let _ = stdin.write_all(&input_owned).await;
            }
        });

        let output = collect(child, program, self.timeout).await;
        let _ = stdin_task.await;
        output
    }

    async fn run_in_dir(&self, dir: &Path, program: &str, args: &[&str]) -> Result<Output> {
        let child = command(program, args)
            .current_dir(dir)
            .spawn()
            .with_context(|| format!("failed to spawn {program} in {}", dir.display()))?;
        collect(child, program, self.timeout).await
    }
}

// ── Dry run ──────────────────────────────────────────────────────────────────

/// Placeholder stdout returned for every dry-run command, so lookups that
/// feed later steps still yield a value.
pub const DRY_RUN_STDOUT: &str = "<dry-run>";

/// `CommandRunner` that logs commands with secrets masked and reports success.
pub struct DryRunRunner {
    secrets: Vec<String>,
}

impl DryRunRunner {
    #[must_use]
    pub fn new(secrets: Vec<String>) -> Self {
        Self { secrets }
    }

    fn record(&self, dir: Option<&Path>, program: &str, args: &[&str]) -> Output {
        let mut words = vec![program];
        words.extend_from_slice(args);
        let line = mask_secrets(&words.join(" "), &self.secrets);
        match dir {
            Some(dir) => tracing::info!(cwd = %dir.display(), "dry run: {line}"),
            None => tracing::info!("dry run: {line}"),
        }
        Output {
            status: success(),
            stdout: format!("{DRY_RUN_STDOUT}\n").into_bytes(),
            stderr: Vec::new(),
        }
    }
}

fn success() -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(0)
}

impl CommandRunner for DryRunRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        Ok(self.record(None, program, args))
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> Result<Output> {
        Ok(self.record(None, program, args))
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        tracing::debug!(bytes = input.len(), "dry run: stdin");
        Ok(self.record(None, program, args))
    }

    async fn run_in_dir(&self, dir: &Path, program: &str, args: &[&str]) -> Result<Output> {
        Ok(self.record(Some(dir), program, args))
    }
}

// ── Selection ────────────────────────────────────────────────────────────────

/// The runner a command uses: real processes, or logging only (`--dry-run`).
pub enum HostRunner {
    Real(TokioCommandRunner),
    DryRun(DryRunRunner),
}

impl HostRunner {
    #[must_use]
    pub fn new(dry_run: bool, timeout: Duration, secrets: Vec<String>) -> Self {
        if dry_run {
            HostRunner::DryRun(DryRunRunner::new(secrets))
        } else {
            HostRunner::Real(TokioCommandRunner::new(timeout))
        }
    }
}

impl CommandRunner for HostRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        match self {
            HostRunner::Real(r) => r.run(program, args).await,
            HostRunner::DryRun(r) => r.run(program, args).await,
        }
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        match self {
            HostRunner::Real(r) => r.run_with_timeout(program, args, timeout).await,
            HostRunner::DryRun(r) => r.run_with_timeout(program, args, timeout).await,
        }
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        match self {
            HostRunner::Real(r) => r.run_with_stdin(program, args, input).await,
            HostRunner::DryRun(r) => r.run_with_stdin(program, args, input).await,
        }
    }

    async fn run_in_dir(&self, dir: &Path, program: &str, args: &[&str]) -> Result<Output> {
        match self {
            HostRunner::Real(r) => r.run_in_dir(dir, program, args).await,
            HostRunner::DryRun(r) => r.run_in_dir(dir, program, args).await,
        }
    }
}
