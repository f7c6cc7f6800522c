//! Chart metadata model.
//!
//! This module defines [`ChartMetadata`], the contents of a chart's
//! `Chart.yaml`, and the loader that pulls it out of a packaged chart.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::version::ChartVersion;

/// File name of the metadata file at the root of every chart.
pub const CHARTFILE_NAME: &str = "Chart.yaml";

/// Metadata describing a chart.
///
/// The JSON form uses the same camelCase keys as `Chart.yaml` and leaves out
/// empty optional fields, so it can be stored verbatim as an OCI config blob.
///
/// # Examples
///
/// ```rust
/// use charta_core::ChartMetadata;
///
/// let meta = ChartMetadata::new("demo", "1.0.0");
/// assert!(meta.validate().is_ok());
///
/// let json = String::from_utf8(meta.to_config_json().unwrap()).unwrap();
/// assert_eq!(json, r#"{"name":"demo","version":"1.0.0"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Chart API version (`v1` or `v2`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Chart name.
    #[serde(default)]
    pub name: String,

    /// Chart version (semantic version).
    #[serde(default)]
    pub version: String,

    /// Kubernetes version constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_version: Option<String>,

    /// One-line description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Chart type (`application` or `library`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,

    /// Search keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Project home page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    /// Source code locations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Maintainers of the chart.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,

    /// Icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Version of the packaged application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    /// Whether the chart is deprecated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,

    /// Free-form annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A chart maintainer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Maintainer {
    /// Maintainer name.
    pub name: String,

    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Personal or organization URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ChartMetadata {
    /// Creates metadata with just a name and version.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Extracts and validates metadata from packaged chart bytes.
    ///
    /// The bytes are read as a gzip-compressed tar stream entirely in memory.
    /// The first `<chart>/Chart.yaml` entry at the top level of the archive
    /// wins; `Chart.yaml` files of bundled subcharts are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is unreadable, has no `Chart.yaml`,
    /// or the metadata fails [`ChartMetadata::validate`].
    pub fn from_archive(bytes: &[u8]) -> Result<Self> {
        let chartfile = read_chartfile(bytes)?;
        let meta = Self::from_yaml(&chartfile)?;
        meta.validate()?;
        Ok(meta)
    }

    /// Reads a packaged chart from disk and extracts its metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or
    /// [`ChartMetadata::from_archive`] fails.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_archive(&bytes)
    }

    /// Parses `Chart.yaml` contents without validating them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChartfileParse`] if the YAML does not match the model.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|source| Error::ChartfileParse { source })
    }

    /// Checks the rules every pushable chart must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMetadata`] if the name is missing or not a
    /// single path segment, or the version is missing or not a semantic
    /// version.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidMetadata {
                reason: "name is required".to_string(),
            });
        }
        if self.name.contains('/') || self.name.contains("..") {
            return Err(Error::InvalidMetadata {
                reason: format!("name '{}' must be a single path segment", self.name),
            });
        }
        if self.version.trim().is_empty() {
            return Err(Error::InvalidMetadata {
                reason: "version is required".to_string(),
            });
        }
        ChartVersion::parse(&self.version)?;
        Ok(())
    }

    /// Serializes the metadata as the JSON config blob.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_config_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Returns the conventional archive file name.
    ///
    /// Format: `<name>-<version>.tgz`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}-{}.tgz", self.name, self.version)
    }
}

fn read_chartfile(bytes: &[u8]) -> Result<String> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let entries = archive
        .entries()
        .map_err(|source| Error::ArchiveRead { source })?;

    for entry in entries {
        let mut entry = entry.map_err(|source| Error::ArchiveRead { source })?;
        let is_chartfile = {
            let path = entry
                .path()
                .map_err(|source| Error::ArchiveRead { source })?;
            is_top_level_chartfile(&path)
        };
        if is_chartfile {
            let mut contents = String::new();
            entry
                .read_to_string(&mut contents)
                .map_err(|source| Error::ArchiveRead { source })?;
            return Ok(contents);
        }
    }

    Err(Error::ChartfileMissing)
}

/// Matches `<chart>/Chart.yaml`, ignoring `./` prefixes.
fn is_top_level_chartfile(path: &Path) -> bool {
    let normal: Vec<_> = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    normal.len() == 2 && path.file_name().is_some_and(|f| f == CHARTFILE_NAME)
}
