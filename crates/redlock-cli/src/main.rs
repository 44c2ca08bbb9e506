//! Main entry point for the Redlock command line client.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use redlock_cli::{AppConfig, Cli, Command, build_manager, init_logging, print_nodes, run_acquire};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config, &cli.nodes, cli.log_level.as_deref())?;
    init_logging(&config.log_level)?;

    let manager = build_manager(&config)?;
    let mut stdout = std::io::stdout();

    match cli.command {
        Command::Acquire {
            resource,
            ttl_ms,
            hold_ms,
        } => {
            let obtained = run_acquire(
                &manager,
                &resource,
                Duration::from_millis(ttl_ms),
                Duration::from_millis(hold_ms),
                &mut stdout,
            )
            .await?;
            Ok(if obtained {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Nodes => {
            print_nodes(&manager, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
