//! Outcomes of registry operations.
//!
//! Results serialize to camelCase JSON so the CLI can print them directly.

use charta_core::ChartMetadata;
use serde::Serialize;

use crate::oci::Descriptor;

/// Digest and size of a pushed or pulled object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorSummary {
    /// Content digest.
    pub digest: String,
    /// Size in bytes.
    pub size: u64,
}

impl From<&Descriptor> for DescriptorSummary {
    fn from(descriptor: &Descriptor) -> Self {
        Self {
            digest: descriptor.digest.clone(),
            size: descriptor.size,
        }
    }
}

/// The chart layer of a push, with the metadata it was pushed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSummary {
    /// Digest and size of the chart archive.
    #[serde(flatten)]
    pub descriptor: DescriptorSummary,
    /// Metadata read from the archive.
    pub meta: ChartMetadata,
}

/// Result of [`RegistryClient::push`](crate::RegistryClient::push).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResult {
    /// The uploaded manifest.
    pub manifest: DescriptorSummary,
    /// The config blob (chart metadata JSON).
    pub config: DescriptorSummary,
    /// The chart content layer.
    pub chart: ChartSummary,
    /// The provenance layer, if one was pushed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<DescriptorSummary>,
    /// Reference the chart was pushed to.
    #[serde(rename = "ref")]
    pub reference: String,
    /// `reference@manifestDigest`.
    pub ref_with_digest: String,
}

/// Bytes fetched for one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PulledBlob {
    /// Content digest.
    pub digest: String,
    /// Size in bytes.
    pub size: u64,
    /// Layer content.
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Outcome of pulling one layer kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PulledLayer {
    /// The layer was present and fetched.
    Fetched(PulledBlob),
    /// The layer was requested, absent, and its absence tolerated.
    Missing,
    /// The layer was not requested.
    NotRequested,
}

impl PulledLayer {
    /// Returns the fetched bytes, if any.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Fetched(blob) => Some(&blob.data),
            Self::Missing | Self::NotRequested => None,
        }
    }

    /// Takes ownership of the fetched bytes, if any.
    #[must_use]
    pub fn into_data(self) -> Option<Vec<u8>> {
        match self {
            Self::Fetched(blob) => Some(blob.data),
            Self::Missing | Self::NotRequested => None,
        }
    }

    /// Returns true if the layer was fetched.
    #[must_use]
    pub const fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }

    /// Returns true if the layer was requested but absent.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Result of [`RegistryClient::pull`](crate::RegistryClient::pull).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResult {
    /// The resolved manifest.
    pub manifest: DescriptorSummary,
    /// The chart content layer.
    pub chart: PulledLayer,
    /// The provenance layer.
    pub provenance: PulledLayer,
    /// Reference the chart was pulled from.
    #[serde(rename = "ref")]
    pub reference: String,
}

impl PullResult {
    /// Returns the chart archive bytes, if pulled.
    #[must_use]
    pub fn chart_data(&self) -> Option<&[u8]> {
        self.chart.data()
    }

    /// Returns the provenance bytes, if pulled.
    #[must_use]
    pub fn provenance_data(&self) -> Option<&[u8]> {
        self.provenance.data()
    }

    /// Returns true if provenance was requested, tolerated as missing, and
    /// indeed missing.
    #[must_use]
    pub const fn provenance_missing(&self) -> bool {
        self.provenance.is_missing()
    }

    /// Returns `reference@manifestDigest`. A digest already present in the
    /// pulled reference is replaced, not repeated.
    #[must_use]
    pub fn ref_with_digest(&self) -> String {
        let base = self
            .reference
            .split_once('@')
            .map_or(self.reference.as_str(), |(base, _)| base);
        format!("{base}@{}", self.manifest.digest)
    }
}

/// Result of [`RegistryClient::login`](crate::RegistryClient::login).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResult {
    /// Registry host logged in to.
    pub host: String,
}

/// Result of [`RegistryClient::logout`](crate::RegistryClient::logout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutResult {
    /// Registry host logged out of.
    pub host: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(data: &[u8]) -> PulledBlob {
        PulledBlob {
            digest: "sha256:abc".to_string(),
            size: data.len() as u64,
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_pulled_layer_accessors() {
        let fetched = PulledLayer::Fetched(blob(b"chart"));
        assert!(fetched.is_fetched());
        assert_eq!(fetched.data(), Some(&b"chart"[..]));
        assert_eq!(fetched.into_data(), Some(b"chart".to_vec()));

        assert!(PulledLayer::Missing.is_missing());
        assert!(PulledLayer::Missing.data().is_none());
        assert!(!PulledLayer::NotRequested.is_missing());
    }

    #[test]
    fn test_pull_result_json_omits_data() {
        let result = PullResult {
            manifest: DescriptorSummary {
                digest: "sha256:m".to_string(),
                size: 10,
            },
            chart: PulledLayer::Fetched(blob(b"chart")),
            provenance: PulledLayer::Missing,
            reference: "localhost:5000/charts/demo:1.0.0".to_string(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["ref"], "localhost:5000/charts/demo:1.0.0");
        assert_eq!(json["chart"]["status"], "fetched");
        assert_eq!(json["chart"]["size"], 5);
        assert!(json["chart"].get("data").is_none());
        assert_eq!(json["provenance"]["status"], "missing");
        assert!(result.provenance_missing());
        assert_eq!(
            result.ref_with_digest(),
            "localhost:5000/charts/demo:1.0.0@sha256:m"
        );
    }

    #[test]
    fn test_ref_with_digest_from_digest_reference() {
        let result = PullResult {
            manifest: DescriptorSummary {
                digest: "sha256:m".to_string(),
                size: 10,
            },
            chart: PulledLayer::NotRequested,
            provenance: PulledLayer::NotRequested,
            reference: "localhost:5000/charts/demo:1.0.0@sha256:m".to_string(),
        };

        assert_eq!(
            result.ref_with_digest(),
            "localhost:5000/charts/demo:1.0.0@sha256:m"
        );
    }
}
