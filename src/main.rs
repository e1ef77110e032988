//! churnpipe - Main Entry Point
//!
//! Trains the churn classifier and scores customers from the command line.

use clap::Parser;
use churnpipe::cli::{cmd_inspect, cmd_interactive, cmd_predict, cmd_train, Cli, Commands};
use std::path::Path;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "churnpipe=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Train { data, target, delimiter, config, artifacts }) => {
            cmd_train(&data, target.as_deref(), &delimiter, config.as_deref(), &artifacts)?;
        }
        Some(Commands::Predict { artifacts, record, fallback, threshold }) => {
            cmd_predict(&artifacts, record.as_deref(), fallback, threshold)?;
        }
        Some(Commands::Inspect { artifacts }) => {
            cmd_inspect(&artifacts)?;
        }
        None => {
            cmd_interactive(Path::new("artifacts"))?;
        }
    }

    Ok(())
}
