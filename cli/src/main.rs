//! azp - provision self-hosted Azure Pipelines build agents

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use azp_cli::cli::Cli;
use azp_cli::domain::error_code;
use azp_cli::output::json::format_error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            let rendered = if json {
                format_error(&message, error_code(&e)).ok()
            } else {
                None
            };
            match rendered {
                Some(obj) => println!("{obj}"),
                None => eprintln!("Error: {message}"),
            }
            ExitCode::FAILURE
        }
    }
}
