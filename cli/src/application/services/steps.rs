//! Execution of `CommandStep`s through the `CommandRunner` port.
//!
//! Every external command in the application layer goes through here so exit
//! status handling and secret masking live in one place.

use std::process::Output;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, PROBE_TIMEOUT};
use crate::domain::error::StepError;
use crate::domain::report::first_line;
use crate::domain::step::{CommandStep, exit_label, mask_secrets};

/// Maximum stderr characters carried into an error message.
const STDERR_TAIL: usize = 800;

/// Run a step and fail on a non-zero exit status.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned, times out, or exits
/// non-zero ([`StepError::NonZeroExit`]).
pub async fn run_step(runner: &impl CommandRunner, step: &CommandStep) -> Result<Output> {
    tracing::debug!(command = %step, "running step");
    let args = step.arg_refs();
    let output = match &step.cwd {
        Some(dir) => runner.run_in_dir(dir, &step.program, &args).await,
        None => runner.run(&step.program, &args).await,
    }
    .with_context(|| format!("running `{step}`"))?;
    ensure_success(step, output)
}

/// Run a step with `input` on stdin and fail on a non-zero exit status.
///
/// # Errors
///
/// Same as [`run_step`].
pub async fn run_step_with_stdin(
    runner: &impl CommandRunner,
    step: &CommandStep,
    input: &[u8],
) -> Result<Output> {
    tracing::debug!(command = %step, bytes = input.len(), "running step with stdin");
    let output = runner
        .run_with_stdin(&step.program, &step.arg_refs(), input)
        .await
        .with_context(|| format!("running `{step}`"))?;
    ensure_success(step, output)
}

/// Run every step of a plan in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the first step's error.
pub async fn run_plan(runner: &impl CommandRunner, plan: &[CommandStep]) -> Result<()> {
    for step in plan {
        run_step(runner, step).await?;
    }
    Ok(())
}

/// Run a read-only probe and return the first line of its stdout.
///
/// Any failure (spawn error, timeout, non-zero exit) yields `None`.
pub async fn probe(runner: &impl CommandRunner, step: &CommandStep) -> Option<String> {
    let output = runner
        .run_with_timeout(&step.program, &step.arg_refs(), PROBE_TIMEOUT)
        .await
        .ok()?;
    if !output.status.success() {
        tracing::debug!(command = %step, "probe failed");
        return None;
    }
    first_line(&String::from_utf8_lossy(&output.stdout))
}

/// Turn a non-zero exit into a [`StepError`] with masked, truncated stderr.
///
/// # Errors
///
/// Returns [`StepError::NonZeroExit`] when `output.status` is not success.
pub fn ensure_success(step: &CommandStep, output: Output) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }
    let secrets: Vec<String> = step
        .sensitive
        .iter()
        .filter_map(|&i| step.args.get(i).cloned())
        .collect();
    let stderr = mask_secrets(String::from_utf8_lossy(&output.stderr).trim(), &secrets);
    let stderr = tail(&stderr, STDERR_TAIL);
    Err(StepError::NonZeroExit {
        command: step.to_string(),
        code: exit_label(output.status),
        stderr: if stderr.is_empty() {
            "(no output)".to_string()
        } else {
            stderr
        },
    }
    .into())
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let skipped: String = text.chars().skip(count - max_chars).collect();
    format!("...{skipped}")
}
