//! Charta CLI - push and pull charts to and from OCI registries.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "charta=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Login(args) => commands::login::execute(&args).await,
        Commands::Logout(args) => commands::logout::execute(&args).await,
        Commands::Push(args) => commands::push::execute(&args).await,
        Commands::Pull(args) => commands::pull::execute(&args).await,
        Commands::Version => {
            println!("charta {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
