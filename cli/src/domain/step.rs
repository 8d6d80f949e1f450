//! External command steps.
//!
//! A `CommandStep` is the unit every provisioning plan is built from: one
//! program invocation with its arguments. Plans are pure data so they can be
//! rendered, tested and dry-run without spawning anything.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Placeholder shown instead of a sensitive argument.
pub const MASK: &str = "***";

/// One external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    /// Program to execute (looked up on `PATH`).
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Working directory, if the command must run somewhere specific.
    pub cwd: Option<PathBuf>,
    /// Indices into `args` that must never be printed.
    pub sensitive: Vec<usize>,
}

impl CommandStep {
    /// Create a step for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            sensitive: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append an argument that is masked in every rendering.
    #[must_use]
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.sensitive.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Run the step from `dir`.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Shell snippet executed with `sh -c`.
    #[must_use]
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    /// Arguments as borrowed slices, the shape `CommandRunner` takes.
    #[must_use]
    pub fn arg_refs(&self) -> Vec<&str> {
        self.args.iter().map(String::as_str).collect()
    }
}

impl fmt::Display for CommandStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for (i, arg) in self.args.iter().enumerate() {
            if self.sensitive.contains(&i) {
                write!(f, " {MASK}")?;
            } else if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Replace every occurrence of each secret in `text` with [`MASK`].
///
/// Used on free-form text (stderr, dry-run logs) where argument positions are
/// no longer known.
#[must_use]
pub fn mask_secrets(text: &str, secrets: &[String]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(text.to_string(), |acc, s| acc.replace(s.as_str(), MASK))
}

/// Exit code as text, or `signal` when the process was killed.
#[must_use]
pub fn exit_label(status: ExitStatus) -> String {
    status
        .code()
        .map_or_else(|| "signal".to_string(), |c| c.to_string())
}
