//! Push command implementation.
//!
//! Pushes a packaged chart (and optionally its provenance file) to an
//! OCI-compatible registry.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use charta_registry::{PushOptions, PushResult};

use super::{strip_scheme, RegistryArgs};

/// Arguments for the push command.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Path to the packaged chart (`.tgz`)
    #[arg(required = true)]
    pub chart: PathBuf,

    /// Destination prefix (e.g. `oci://localhost:5000/charts`)
    #[arg(required = true)]
    pub remote: String,

    /// Provenance file to push alongside the chart
    #[arg(long)]
    pub prov: Option<PathBuf>,

    /// Tag to push to instead of the chart version
    #[arg(long)]
    pub tag: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

/// Runs the push command.
///
/// # Errors
///
/// Returns an error if:
/// - The chart or provenance file cannot be read
/// - The chart archive has no valid metadata
/// - The registry rejects the upload
pub async fn execute(args: &PushArgs) -> Result<()> {
    info!(chart = ?args.chart, remote = %args.remote, "Pushing chart");

    let options = push_options(args)?;
    let chart = std::fs::read(&args.chart)
        .with_context(|| format!("Failed to read chart {}", args.chart.display()))?;

    let client = args.registry.client()?;
    let result = client
        .push(&chart, strip_scheme(&args.remote), &options)
        .await
        .context("Failed to push chart")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn push_options(args: &PushArgs) -> Result<PushOptions> {
    let mut options = PushOptions::new();
    if let Some(ref prov) = args.prov {
        let bytes = std::fs::read(prov)
            .with_context(|| format!("Failed to read provenance file {}", prov.display()))?;
        options = options.with_provenance(bytes);
    }
    if let Some(ref tag) = args.tag {
        options = options.with_tag(tag);
    }
    Ok(options)
}

fn print_summary(result: &PushResult) {
    println!("Pushed: {}", result.reference);
    println!("Digest: {}", result.manifest.digest);
    if let Some(ref prov) = result.provenance {
        println!("Provenance: {}", prov.digest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(prov: Option<PathBuf>, tag: Option<&str>) -> PushArgs {
        PushArgs {
            chart: PathBuf::from("demo-1.0.0.tgz"),
            remote: "oci://localhost:5000/charts".to_string(),
            prov,
            tag: tag.map(ToString::to_string),
            json: false,
            registry: RegistryArgs::default(),
        }
    }

    #[test]
    fn test_push_options_default() {
        let options = push_options(&args(None, None)).unwrap();
        assert!(options.provenance.is_none());
        assert!(options.tag.is_none());
    }

    #[test]
    fn test_push_options_with_provenance_and_tag() {
        let temp = TempDir::new().unwrap();
        let prov = temp.path().join("demo-1.0.0.tgz.prov");
        std::fs::write(&prov, b"signature").unwrap();

        let options = push_options(&args(Some(prov), Some("stable"))).unwrap();
        assert_eq!(options.provenance.as_deref(), Some(&b"signature"[..]));
        assert_eq!(options.tag.as_deref(), Some("stable"));
    }

    #[test]
    fn test_push_options_missing_provenance_file() {
        let result = push_options(&args(Some(PathBuf::from("/nonexistent.prov")), None));
        assert!(result.is_err());
    }
}
