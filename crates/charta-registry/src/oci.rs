//! OCI image manifest and distribution types.
//!
//! This module defines the media types a chart artifact is made of and the
//! descriptor/manifest documents that bind them together.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Media type string of a chart artifact layer or document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType(String);

impl MediaType {
    /// OCI image manifest media type.
    pub const OCI_MANIFEST: &'static str = "application/vnd.oci.image.manifest.v1+json";

    /// Chart config media type (JSON-serialized chart metadata).
    pub const CHART_CONFIG: &'static str = "application/vnd.cncf.helm.config.v1+json";

    /// Chart content layer media type (the packaged chart archive).
    pub const CHART_CONTENT: &'static str = "application/vnd.cncf.helm.chart.content.v1.tar+gzip";

    /// Chart provenance layer media type.
    pub const CHART_PROVENANCE: &'static str =
        "application/vnd.cncf.helm.chart.provenance.v1.prov";

    /// Creates a new media type.
    #[must_use]
    pub fn new(media_type: impl Into<String>) -> Self {
        Self(media_type.into())
    }

    /// Returns the media type string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creates the chart config media type.
    #[must_use]
    pub fn config() -> Self {
        Self::new(Self::CHART_CONFIG)
    }

    /// Creates the chart content media type.
    #[must_use]
    pub fn chart_content() -> Self {
        Self::new(Self::CHART_CONTENT)
    }

    /// Creates the chart provenance media type.
    #[must_use]
    pub fn provenance() -> Self {
        Self::new(Self::CHART_PROVENANCE)
    }

    /// Creates the OCI image manifest media type.
    #[must_use]
    pub fn oci_manifest() -> Self {
        Self::new(Self::OCI_MANIFEST)
    }

    /// Returns the role this media type plays in a chart artifact.
    #[must_use]
    pub fn role(&self) -> LayerRole {
        LayerRole::of(&self.0)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MediaType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for MediaType {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl Serialize for MediaType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

/// Role of a blob within a chart artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerRole {
    /// The JSON config blob.
    Config,
    /// The packaged chart archive.
    Content,
    /// The provenance file.
    Provenance,
    /// Anything else.
    Unknown,
}

impl LayerRole {
    /// Classifies a media type string.
    ///
    /// # Examples
    ///
    /// ```
    /// use charta_registry::{LayerRole, MediaType};
    ///
    /// assert_eq!(LayerRole::of(MediaType::CHART_CONTENT), LayerRole::Content);
    /// assert_eq!(LayerRole::of("application/octet-stream"), LayerRole::Unknown);
    /// ```
    #[must_use]
    pub fn of(media_type: &str) -> Self {
        match media_type {
            MediaType::CHART_CONFIG => Self::Config,
            MediaType::CHART_CONTENT => Self::Content,
            MediaType::CHART_PROVENANCE => Self::Provenance,
            _ => Self::Unknown,
        }
    }
}

/// Returns every media type a chart artifact may contain.
#[must_use]
pub fn known_media_types() -> Vec<MediaType> {
    vec![
        MediaType::config(),
        MediaType::chart_content(),
        MediaType::provenance(),
    ]
}

/// OCI content descriptor.
///
/// A descriptor describes the disposition of targeted content. It includes
/// the type of the content, a content identifier (digest), and the byte-size
/// of the raw content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    pub media_type: MediaType,

    /// Digest of the targeted content.
    pub digest: String,

    /// Size in bytes of the content.
    pub size: u64,

    /// Optional annotations (key-value metadata).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl Descriptor {
    /// Creates a new descriptor.
    ///
    /// # Examples
    ///
    /// ```
    /// use charta_registry::{Descriptor, MediaType};
    ///
    /// let desc = Descriptor::new(
    ///     MediaType::chart_content(),
    ///     "sha256:abc123...",
    ///     1024,
    /// );
    /// ```
    #[must_use]
    pub fn new(media_type: MediaType, digest: impl Into<String>, size: u64) -> Self {
        Self {
            media_type,
            digest: digest.into(),
            size,
            annotations: None,
        }
    }

    /// Adds an annotation to the descriptor.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Returns the digest algorithm (e.g., "sha256").
    #[must_use]
    pub fn digest_algorithm(&self) -> &str {
        self.digest.split(':').next().unwrap_or("sha256")
    }

    /// Returns the digest value (without algorithm prefix).
    #[must_use]
    pub fn digest_value(&self) -> &str {
        self.digest.split(':').nth(1).unwrap_or(&self.digest)
    }
}

/// OCI Image Manifest.
///
/// Binds a config descriptor to an ordered list of layer descriptors. The
/// config is referenced, never listed among the layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Schema version (always 2).
    pub schema_version: u32,

    /// Media type of this manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,

    /// Configuration descriptor.
    pub config: Descriptor,

    /// Layers in push order.
    #[serde(default)]
    pub layers: Vec<Descriptor>,

    /// Optional annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl Manifest {
    /// Annotation key holding the artifact title.
    pub const ANNOTATION_TITLE: &'static str = "org.opencontainers.image.title";

    /// Annotation key holding the artifact version.
    pub const ANNOTATION_VERSION: &'static str = "org.opencontainers.image.version";

    /// Creates a manifest for a config blob and its layers.
    ///
    /// # Examples
    ///
    /// ```
    /// use charta_registry::{Descriptor, Manifest, MediaType};
    ///
    /// let config = Descriptor::new(MediaType::config(), "sha256:cfg", 40);
    /// let chart = Descriptor::new(MediaType::chart_content(), "sha256:abc", 1024);
    ///
    /// let manifest = Manifest::new(config, vec![chart]);
    /// assert_eq!(manifest.layers.len(), 1);
    /// ```
    #[must_use]
    pub fn new(config: Descriptor, layers: Vec<Descriptor>) -> Self {
        Self {
            schema_version: 2,
            media_type: Some(MediaType::oci_manifest()),
            config,
            layers,
            annotations: None,
        }
    }

    /// Adds an annotation to the manifest.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Returns the first layer with the given role, if present.
    #[must_use]
    pub fn layer(&self, role: LayerRole) -> Option<&Descriptor> {
        self.layers.iter().find(|d| d.media_type.role() == role)
    }
}

/// Error response from registry API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// List of errors.
    pub errors: Vec<RegistryApiError>,
}

/// Individual error from registry API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryApiError {
    /// Error code.
    pub code: String,

    /// Human-readable message.
    #[serde(default)]
    pub message: String,

    /// Additional details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Renders a registry error body as a single line.
    ///
    /// Falls back to the raw body when it is not an OCI error document.
    #[must_use]
    pub fn summarize(body: &str) -> String {
        match serde_json::from_str::<Self>(body) {
            Ok(resp) if !resp.errors.is_empty() => resp
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; "),
            _ => body.trim().to_string(),
        }
    }
}
