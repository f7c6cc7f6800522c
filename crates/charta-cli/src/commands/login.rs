//! Login command implementation.
//!
//! Verifies credentials against a registry and stores them for later pushes
//! and pulls.

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use clap::Args;

use charta_registry::LoginOptions;

use super::{strip_scheme, RegistryArgs};

/// Arguments for the login command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Registry host (e.g. `localhost:5000`)
    #[arg(required = true)]
    pub host: String,

    /// Username for basic authentication
    #[arg(short, long, env = "CHARTA_REGISTRY_USERNAME")]
    pub username: Option<String>,

    /// Password for basic authentication
    #[arg(short, long, env = "CHARTA_REGISTRY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Read the password from stdin
    #[arg(long, conflicts_with = "password")]
    pub password_stdin: bool,

    /// Skip certificate verification while logging in
    #[arg(long)]
    pub insecure: bool,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

/// Runs the login command.
///
/// # Errors
///
/// Returns an error if credentials are incomplete or the registry rejects
/// them.
pub async fn execute(args: &LoginArgs) -> Result<()> {
    let host = strip_scheme(&args.host);
    let password = if args.password_stdin {
        Some(read_password(io::stdin().lock())?)
    } else {
        args.password.clone()
    };
    let options = login_options(args.username.as_deref(), password)?.insecure(args.insecure);

    let client = args.registry.client()?;
    let result = client
        .login(host, &options)
        .await
        .with_context(|| format!("Failed to log in to {host}"))?;

    println!("Login Succeeded ({})", result.host);
    Ok(())
}

/// Builds login options from the supplied username and password.
fn login_options(username: Option<&str>, password: Option<String>) -> Result<LoginOptions> {
    match (username, password) {
        (Some(username), Some(password)) => Ok(LoginOptions::new().basic_auth(username, password)),
        _ => anyhow::bail!("Both --username and --password are required to log in"),
    }
}

/// Reads one line from `reader`, without its trailing newline.
fn read_password(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Password read from stdin is empty");
    }
    Ok(password)
}
