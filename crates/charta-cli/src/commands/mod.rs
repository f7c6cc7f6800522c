//! CLI commands and argument parsing.

pub mod login;
pub mod logout;
pub mod pull;
pub mod push;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use charta_registry::{ClientConfig, RegistryClient, TlsConfig};

/// Charta - push and pull charts with OCI registries
#[derive(Parser)]
#[command(name = "charta")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Log in to a registry
    Login(login::LoginArgs),

    /// Log out of a registry
    Logout(logout::LogoutArgs),

    /// Push a packaged chart to a registry
    Push(push::PushArgs),

    /// Pull a chart from a registry
    Pull(pull::PullArgs),

    /// Print version information
    Version,
}

/// Registry connection settings shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct RegistryArgs {
    /// Credentials file (defaults to the user cache directory)
    #[arg(long, env = "CHARTA_REGISTRY_CONFIG")]
    pub registry_config: Option<PathBuf>,

    /// Use plain HTTP instead of HTTPS
    #[arg(long, env = "CHARTA_PLAIN_HTTP")]
    pub plain_http: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// CA bundle used to verify the registry certificate
    #[arg(long)]
    pub ca_file: Option<PathBuf>,

    /// Client certificate for mutual TLS
    #[arg(long, requires = "key_file")]
    pub cert_file: Option<PathBuf>,

    /// Client private key for mutual TLS
    #[arg(long, requires = "cert_file")]
    pub key_file: Option<PathBuf>,

    /// Skip registry certificate verification
    #[arg(long)]
    pub insecure_skip_tls_verify: bool,
}

impl RegistryArgs {
    /// Builds the client configuration these flags describe.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new()
            .with_plain_http(self.plain_http)
            .with_timeout(Duration::from_secs(self.timeout));

        if let Some(ref path) = self.registry_config {
            config = config.with_credentials_file(path);
        }

        let mut tls = TlsConfig::new();
        let mut has_tls = false;
        if let Some(ref ca) = self.ca_file {
            tls = tls.with_ca_cert(ca);
            has_tls = true;
        }
        if let (Some(ref cert), Some(ref key)) = (&self.cert_file, &self.key_file) {
            tls = tls.with_client_cert(cert, key);
            has_tls = true;
        }
        if self.insecure_skip_tls_verify {
            tls = tls.insecure();
            has_tls = true;
        }
        if has_tls {
            config = config.with_tls(tls);
        }

        config
    }

    /// Creates an HTTP registry client.
    pub fn client(&self) -> Result<RegistryClient> {
        RegistryClient::new(self.client_config()).context("Failed to create registry client")
    }
}

/// Strips an optional `oci://` scheme from a user-supplied location.
pub fn strip_scheme(location: &str) -> &str {
    location.strip_prefix("oci://").unwrap_or(location)
}
