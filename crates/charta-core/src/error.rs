//! Error types for charta core operations.
//!
//! Every error in this crate describes a chart that could not be turned into
//! usable metadata.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading chart metadata.
#[derive(Error, Debug)]
pub enum Error {
    /// The archive bytes are not a readable gzip-compressed tar stream.
    #[error("Failed to read chart archive: {source}")]
    ArchiveRead {
        /// Underlying I/O error from the decompressor or tar reader.
        #[source]
        source: std::io::Error,
    },

    /// The archive has no top-level `Chart.yaml`.
    #[error("Chart archive does not contain a {}", crate::CHARTFILE_NAME)]
    ChartfileMissing,

    /// `Chart.yaml` is not valid YAML for the metadata model.
    #[error("Failed to parse {}: {source}", crate::CHARTFILE_NAME)]
    ChartfileParse {
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Metadata parsed but violates a chart rule.
    #[error("Invalid chart metadata: {reason}")]
    InvalidMetadata {
        /// Reason the metadata was rejected.
        reason: String,
    },

    /// A chart archive could not be read from disk.
    #[error("Failed to read chart from {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_chartfile_missing() {
        let err = Error::ChartfileMissing;
        assert_eq!(
            err.to_string(),
            "Chart archive does not contain a Chart.yaml"
        );
    }

    #[test]
    fn test_error_display_invalid_metadata() {
        let err = Error::InvalidMetadata {
            reason: "name is required".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid chart metadata: name is required");
    }
}
