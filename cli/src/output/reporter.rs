//! Terminal implementation of the `ProgressReporter` port.

use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::OutputContext;

/// Reports provisioning phases as `→`, `✓` and `!` lines.
///
/// Steps and successes follow `ctx.quiet`; warnings always reach stderr.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
}

impl<'a> TerminalReporter<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if !self.ctx.quiet {
            println!("  {} {message}", "→".style(self.ctx.styles.step));
        }
    }

    fn success(&self, message: &str) {
        self.ctx.check(true, message);
    }

    fn warn(&self, message: &str) {
        self.ctx.warn(message);
    }
}
