//! contentflow CLI entry point.
//!
//! Initializes error reporting and logging, then dispatches the subcommand.

mod cli;
mod commands;
mod output;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = cli::Cli::parse();

    // RUST_LOG wins over --log-level. Logs go to stderr so stdout stays
    // clean for command output.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    commands::dispatch(cli).await
}
