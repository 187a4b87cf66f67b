//! envdict - layered environment dictionaries
//!
//! Command-line entry point for inspecting expanded environments.

use clap::Parser;
use envdict::cli::{Cli, LogFormat};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.debug, cli.log_format);

    // Execute the command
    if let Err(e) = run(cli) {
        error!("Error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Starting envdict");
    cli.execute()?;
    Ok(())
}

fn init_logging(debug: bool, format: LogFormat) {
    let default_filter = if debug { "envdict=debug" } else { "envdict=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
