use anyhow::Result;
use clap::Parser;

use deskgate::cli::{self, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    match cli.command {
        Commands::Run(args) => cli::run::run(args).await,
        Commands::Check(args) => cli::check::run(args).await,
        Commands::Diagnose(args) => cli::diagnose::run(args).await,
        Commands::Profiles(args) => cli::profiles::run(args).await,
        Commands::Audit(args) => cli::audit::run(args).await,
        Commands::Config(args) => cli::config::run(args).await,
        Commands::Serve => cli::serve::run().await,
        Commands::Paths => cli::paths::run(),
    }
}
