//! Pull command implementation.
//!
//! Fetches a chart and/or its provenance file from a registry and writes them
//! to a local directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use charta_core::ChartMetadata;
use charta_registry::{PullOptions, PullResult, Reference};

use super::{strip_scheme, RegistryArgs};

/// Arguments for the pull command.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Chart reference (e.g. `oci://localhost:5000/charts/demo:1.0.0`)
    #[arg(required = true)]
    pub reference: String,

    /// Also pull the provenance file
    #[arg(long)]
    pub prov: bool,

    /// Do not fail when the provenance file is missing
    #[arg(long, requires = "prov")]
    pub ignore_missing_prov: bool,

    /// Skip the chart archive (only useful with --prov)
    #[arg(long)]
    pub no_chart: bool,

    /// Directory to write pulled files to
    #[arg(short = 'd', long, default_value = ".")]
    pub destination: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

impl PullArgs {
    /// Returns the layer selection these flags describe.
    pub const fn pull_options(&self) -> PullOptions {
        PullOptions::new()
            .with_chart(!self.no_chart)
            .with_provenance(self.prov)
            .ignore_missing_provenance(self.ignore_missing_prov)
    }
}

/// Runs the pull command.
///
/// # Errors
///
/// Returns an error if the pull fails or the files cannot be written.
pub async fn execute(args: &PullArgs) -> Result<()> {
    let raw = strip_scheme(&args.reference);
    let reference = Reference::parse(raw).context("Invalid chart reference")?;
    info!(reference = %reference, destination = ?args.destination, "Pulling chart");

    let client = args.registry.client()?;
    let result = client
        .pull(raw, &args.pull_options())
        .await
        .with_context(|| format!("Failed to pull {raw}"))?;

    let written = write_layers(&args.destination, &reference, &result)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Pulled: {}", result.reference);
        println!("Digest: {}", result.manifest.digest);
        for path in &written {
            println!("Saved:  {}", path.display());
        }
        if result.provenance_missing() {
            println!("Provenance: not found, skipped");
        }
    }
    Ok(())
}

/// Writes every fetched layer into `dir` and returns the paths written.
fn write_layers(dir: &Path, reference: &Reference, result: &PullResult) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let chart_file = chart_file_name(reference, result.chart_data());
    let mut written = Vec::new();

    if let Some(chart) = result.chart_data() {
        let path = dir.join(&chart_file);
        std::fs::write(&path, chart)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    if let Some(prov) = result.provenance_data() {
        let path = dir.join(format!("{chart_file}.prov"));
        std::fs::write(&path, prov)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}

/// Names the chart archive after its metadata, or after the reference when
/// the archive was not pulled.
fn chart_file_name(reference: &Reference, chart: Option<&[u8]>) -> String {
    if let Some(meta) = chart.and_then(|bytes| ChartMetadata::from_archive(bytes).ok()) {
        return meta.file_name();
    }
    match reference.tag {
        Some(ref tag) => format!("{}-{tag}.tgz", reference.name),
        None => format!("{}.tgz", reference.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charta_registry::{DescriptorSummary, PulledBlob, PulledLayer};
    use tempfile::TempDir;

    fn reference(raw: &str) -> Reference {
        Reference::parse(raw).unwrap()
    }

    fn pulled(chart: PulledLayer, provenance: PulledLayer) -> PullResult {
        PullResult {
            manifest: DescriptorSummary {
                digest: "sha256:m".to_string(),
                size: 1,
            },
            chart,
            provenance,
            reference: "localhost:5000/charts/demo:1.0.0".to_string(),
        }
    }

    fn blob(data: &[u8]) -> PulledLayer {
        PulledLayer::Fetched(PulledBlob {
            digest: "sha256:x".to_string(),
            size: data.len() as u64,
            data: data.to_vec(),
        })
    }

    #[test]
    fn test_pull_options_from_flags() {
        let args = PullArgs {
            reference: "localhost:5000/charts/demo:1.0.0".to_string(),
            prov: true,
            ignore_missing_prov: true,
            no_chart: true,
            destination: PathBuf::from("."),
            json: false,
            registry: RegistryArgs::default(),
        };
        let options = args.pull_options();
        assert!(!options.with_chart);
        assert!(options.with_provenance);
        assert!(options.ignore_missing_provenance);
    }

    #[test]
    fn test_chart_file_name_falls_back_to_reference() {
        let by_tag = reference("localhost:5000/charts/demo:1.0.0");
        assert_eq!(chart_file_name(&by_tag, None), "demo-1.0.0.tgz");
        assert_eq!(chart_file_name(&by_tag, Some(b"not a chart")), "demo-1.0.0.tgz");

        let by_digest = reference("localhost:5000/charts/demo@sha256:abc");
        assert_eq!(chart_file_name(&by_digest, None), "demo.tgz");
    }

    #[test]
    fn test_write_layers() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("out");
        let result = pulled(blob(b"chart"), blob(b"prov"));

        let written =
            write_layers(&dir, &reference("localhost:5000/charts/demo:1.0.0"), &result).unwrap();

        assert_eq!(
            written,
            vec![dir.join("demo-1.0.0.tgz"), dir.join("demo-1.0.0.tgz.prov")]
        );
        assert_eq!(std::fs::read(&written[0]).unwrap(), b"chart");
        assert_eq!(std::fs::read(&written[1]).unwrap(), b"prov");
    }

    #[test]
    fn test_write_layers_skips_missing_provenance() {
        let temp = TempDir::new().unwrap();
        let result = pulled(blob(b"chart"), PulledLayer::Missing);

        let written = write_layers(
            temp.path(),
            &reference("localhost:5000/charts/demo:1.0.0"),
            &result,
        )
        .unwrap();
        assert_eq!(written.len(), 1);
    }
}
