mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let filter = match cli.verbose {
        0 => "annoclip=info,annoclip_core=info,annoclip_decode=info",
        1 => "annoclip=debug,annoclip_core=debug,annoclip_decode=debug",
        2 => "annoclip=trace,annoclip_core=trace,annoclip_decode=trace",
        _ => "trace",
    };

    tracing_subscriber::registry()
        // Shares stderr with the progress bar
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Some(Commands::Run { options }) => {
            commands::run::run(&options, cli.config.as_deref()).await
        }
        Some(Commands::Doctor) => commands::doctor::run(cli.config.as_deref()).await,
        Some(Commands::Config) => commands::config::run(cli.config.as_deref()).await,
        None => commands::run::run(&cli.run, cli.config.as_deref()).await,
    }
}
