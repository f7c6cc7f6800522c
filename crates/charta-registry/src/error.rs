//! Error types for registry operations.

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`RegistryError`].
///
/// Callers branch on this instead of matching every variant, e.g. to tell a
/// chart that was pushed without provenance apart from a rejected login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller asked for something impossible; nothing was sent.
    Input,
    /// Local chart bytes could not be read as a chart.
    Metadata,
    /// The registry manifest lacks layers the caller requires.
    ManifestIntegrity,
    /// A blob could not be read back intact.
    StoreFault,
    /// Network, TLS, authentication or registry-side failure.
    Transport,
}

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Pull requested with neither the chart nor the provenance layer.
    #[error("must specify at least one layer to pull (chart/prov)")]
    NoLayersRequested,

    /// Invalid reference format.
    #[error("Invalid reference '{reference}': {reason}")]
    InvalidReference {
        /// Reference string.
        reference: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Login attempted without credentials.
    #[error("No credentials supplied for {host}")]
    MissingCredentials {
        /// Registry host.
        host: String,
    },

    /// Chart bytes could not be turned into metadata.
    #[error("Invalid chart: {source}")]
    InvalidChart {
        /// Underlying metadata error.
        #[source]
        source: charta_core::Error,
    },

    /// Manifest has fewer layers than the pull requires.
    #[error("manifest does not contain minimum number of layers ({required}), layers found: {found}")]
    InsufficientLayers {
        /// Minimum number of layers required.
        required: usize,
        /// Number of accepted layers in the manifest.
        found: usize,
    },

    /// Manifest has no layer of a required media type.
    #[error("manifest does not contain a layer with mediatype {media_type}")]
    MissingLayer {
        /// The media type that was expected.
        media_type: String,
    },

    /// Manifest body is not an OCI image manifest.
    #[error("Invalid manifest for {reference}: {message}")]
    InvalidManifest {
        /// Reference the manifest was fetched for.
        reference: String,
        /// Error message.
        message: String,
    },

    /// A descriptor listed by the manifest is not retrievable from the store.
    #[error("Unable to retrieve blob with digest {digest}")]
    BlobUnavailable {
        /// Digest of the missing blob.
        digest: String,
    },

    /// Content does not hash to the digest it was fetched by.
    #[error("Content digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Expected digest.
        expected: String,
        /// Actual digest.
        actual: String,
    },

    /// Failed to connect to registry.
    #[error("Failed to connect to registry at {url}: {source}")]
    ConnectionFailed {
        /// Registry URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Error message.
        message: String,
    },

    /// No stored credentials for a host.
    #[error("Not logged in to {host}")]
    CredentialsNotFound {
        /// Registry host.
        host: String,
    },

    /// Manifest not found in registry.
    #[error("Not found: {reference}")]
    NotFound {
        /// Reference that was looked up.
        reference: String,
    },

    /// HTTP error from registry.
    #[error("HTTP error from registry: {status} - {message}")]
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Blob upload failed.
    #[error("Failed to upload blob: {message}")]
    UploadFailed {
        /// Error message.
        message: String,
    },

    /// Manifest push failed.
    #[error("Failed to push manifest for {reference}: {message}")]
    ManifestPushFailed {
        /// Target reference.
        reference: String,
        /// Error message.
        message: String,
    },

    /// TLS material could not be loaded.
    #[error("Invalid TLS configuration: {message}")]
    InvalidTlsConfig {
        /// Error message.
        message: String,
    },

    /// File I/O error.
    #[error("File I/O error at {path}: {source}")]
    IoError {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    JsonError {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

impl RegistryError {
    /// Returns the broad category of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use charta_registry::{ErrorKind, RegistryError};
    ///
    /// let err = RegistryError::MissingLayer {
    ///     media_type: "application/vnd.cncf.helm.chart.provenance.v1.prov".to_string(),
    /// };
    /// assert_eq!(err.kind(), ErrorKind::ManifestIntegrity);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoLayersRequested
            | Self::InvalidReference { .. }
            | Self::MissingCredentials { .. } => ErrorKind::Input,
            Self::InvalidChart { .. } => ErrorKind::Metadata,
            Self::InsufficientLayers { .. }
            | Self::MissingLayer { .. }
            | Self::InvalidManifest { .. } => ErrorKind::ManifestIntegrity,
            Self::BlobUnavailable { .. } | Self::DigestMismatch { .. } => ErrorKind::StoreFault,
            Self::ConnectionFailed { .. }
            | Self::AuthenticationFailed { .. }
            | Self::CredentialsNotFound { .. }
            | Self::NotFound { .. }
            | Self::HttpError { .. }
            | Self::UploadFailed { .. }
            | Self::ManifestPushFailed { .. }
            | Self::InvalidTlsConfig { .. }
            | Self::IoError { .. }
            | Self::JsonError { .. } => ErrorKind::Transport,
        }
    }

    /// Returns true if a required layer was absent from the manifest.
    #[must_use]
    pub const fn is_missing_layer(&self) -> bool {
        matches!(
            self,
            Self::MissingLayer { .. } | Self::InsufficientLayers { .. }
        )
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ConnectionFailed {
                url: err
                    .url()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                source: err,
            }
        } else if err.is_status() {
            let status = err.status().map_or(0, |s| s.as_u16());
            Self::HttpError {
                status,
                message: err.to_string(),
            }
        } else {
            Self::HttpError {
                status: 0,
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError { source: err }
    }
}

impl From<charta_core::Error> for RegistryError {
    fn from(err: charta_core::Error) -> Self {
        Self::InvalidChart { source: err }
    }
}
