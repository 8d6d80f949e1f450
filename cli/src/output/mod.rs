//! Terminal output: styling, renderers, progress and the `ProgressReporter`
//! implementation.
//!
//! Everything here writes to stdout except warnings, which go to stderr so a
//! redirected report stays clean.

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;
pub use styles::Styles;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output (`--quiet`, `--json`).
    pub quiet: bool,
}

impl OutputContext {
    /// Create an output context. Colors require a TTY and no `--no-color`
    /// (clap maps `NO_COLOR` onto the flag).
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let mut styles = Styles::default();
        if !no_color && is_tty {
            styles.colorize();
        }
        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Whether spinners should be drawn.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// `✓ msg` when `ok`, `✗ msg` otherwise. Suppressed when `quiet`.
    pub fn check(&self, ok: bool, msg: &str) {
        if self.quiet {
            return;
        }
        if ok {
            println!("  {} {msg}", "✓".style(self.styles.success));
        } else {
            println!("  {} {msg}", "✗".style(self.styles.error));
        }
    }

    /// `! msg` on stderr. Never suppressed.
    pub fn warn(&self, msg: &str) {
        eprintln!("  {} {msg}", "!".style(self.styles.warning));
    }

    /// Informational line. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Section header preceded by a blank line. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!();
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }

    /// Unstyled, indented line (YAML dumps). Suppressed when `quiet`.
    pub fn text(&self, line: &str) {
        if !self.quiet {
            println!("    {line}");
        }
    }
}
