//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use charta_registry::LogoutOptions;

use super::{strip_scheme, RegistryArgs};

/// Arguments for the logout command.
#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Registry host (e.g. `localhost:5000`)
    #[arg(required = true)]
    pub host: String,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

/// Runs the logout command.
///
/// # Errors
///
/// Returns an error if there are no stored credentials for the host.
pub async fn execute(args: &LogoutArgs) -> Result<()> {
    let host = strip_scheme(&args.host);
    let client = args.registry.client()?;
    let result = client
        .logout(host, &LogoutOptions::new())
        .await
        .with_context(|| format!("Failed to log out of {host}"))?;

    println!("Removing login credentials for {}", result.host);
    Ok(())
}
