//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Provision self-hosted Azure Pipelines build agents
#[derive(Parser)]
#[command(
    name = "azp",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output (any non-empty `NO_COLOR` except `0`/`false`)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Print commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install, register and start the agent on this host
    Provision(commands::provision::ProvisionArgs),

    /// Download the agent archive only
    Download(commands::download::DownloadArgs),

    /// Install auxiliary developer tools
    Tools(commands::tools::ToolsArgs),

    /// Report installed components and the agent service
    Verify,

    /// Configure a private AKS cluster
    #[command(subcommand)]
    Aks(commands::aks::AksCommand),

    /// Inspect configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.dry_run {
            "info"
        } else {
            "warn"
        }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            dry_run,
            yes,
            command,
            ..
        } = self;
        let app = AppContext::new(&AppFlags {
            no_color,
            quiet,
            json,
            dry_run,
            yes,
        });

        match command {
            Command::Provision(args) => commands::provision::run(&app, &args).await,
            Command::Download(args) => commands::download::run(&app, &args).await,
            Command::Tools(args) => commands::tools::run(&app, &args).await,
            Command::Verify => commands::verify::run(&app).await,
            Command::Aks(cmd) => commands::aks::run(&app, &cmd).await,
            Command::Config(cmd) => commands::config::run(&app, &cmd),
            Command::Version => {
                commands::version::run(json);
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
