//! The boundary between chart orchestration and the registry protocol.
//!
//! A [`Transport`] knows how to authenticate against a registry and how to
//! move one manifest plus its blobs in either direction. Blobs travel through
//! the operation's [`MemoryStore`]: push reads them out of it, pull writes the
//! accepted ones into it.

mod http;
mod memory;

pub use self::http::HttpTransport;
pub use self::memory::MemoryRegistry;

use async_trait::async_trait;

use crate::credentials::Credentials;
use crate::error::RegistryError;
use crate::oci::{Descriptor, Manifest, MediaType};
use crate::reference::Reference;
use crate::store::{compute_digest, MemoryStore};

/// Registry transport used by [`RegistryClient`](crate::RegistryClient).
///
/// Implementations must not retry on their own behalf beyond protocol-level
/// auth negotiation, and must produce digests deterministically from content.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Verifies `credentials` against `host` and remembers them.
    async fn login(
        &self,
        host: &str,
        credentials: &Credentials,
        insecure: bool,
    ) -> Result<(), RegistryError>;

    /// Forgets the credentials for `host`.
    async fn logout(&self, host: &str) -> Result<(), RegistryError>;

    /// Uploads the config and layer blobs of `manifest` from `store`, then the
    /// manifest itself, tagged by `reference`.
    ///
    /// Returns the descriptor of the uploaded manifest.
    async fn push_manifest(
        &self,
        reference: &Reference,
        store: &MemoryStore,
        manifest: &Manifest,
    ) -> Result<Descriptor, RegistryError>;

    /// Resolves `reference`, downloads every layer whose media type is in
    /// `allowed_media_types` into `store`, and returns the manifest descriptor
    /// with the accepted layer descriptors in manifest order.
    async fn pull_manifest(
        &self,
        reference: &Reference,
        store: &mut MemoryStore,
        allowed_media_types: &[MediaType],
    ) -> Result<(Descriptor, Vec<Descriptor>), RegistryError>;
}

/// Serializes `manifest` and returns its bytes with their descriptor.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_manifest(manifest: &Manifest) -> Result<(Vec<u8>, Descriptor), RegistryError> {
    let bytes = serde_json::to_vec(manifest)?;
    let descriptor = Descriptor::new(
        MediaType::oci_manifest(),
        compute_digest(&bytes),
        bytes.len() as u64,
    );
    Ok((bytes, descriptor))
}

/// Parses manifest bytes fetched for `reference` and returns the manifest
/// with its descriptor.
///
/// # Errors
///
/// Returns [`RegistryError::DigestMismatch`] if `reference` pins a digest the
/// bytes do not hash to, or [`RegistryError::InvalidManifest`] if the bytes
/// are not an OCI image manifest.
pub fn decode_manifest(
    reference: &Reference,
    bytes: &[u8],
) -> Result<(Manifest, Descriptor), RegistryError> {
    let digest = compute_digest(bytes);
    if let Some(ref expected) = reference.digest {
        if *expected != digest {
            return Err(RegistryError::DigestMismatch {
                expected: expected.clone(),
                actual: digest,
            });
        }
    }

    let manifest: Manifest =
        serde_json::from_slice(bytes).map_err(|e| RegistryError::InvalidManifest {
            reference: reference.to_string(),
            message: e.to_string(),
        })?;
    let descriptor = Descriptor::new(MediaType::oci_manifest(), digest, bytes.len() as u64);
    Ok((manifest, descriptor))
}

/// Returns the layers of `manifest` whose media types are allowed.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidManifest`] if the manifest's config media
/// type is not allowed, i.e. the artifact is not a chart.
pub fn accepted_layers(
    reference: &Reference,
    manifest: &Manifest,
    allowed_media_types: &[MediaType],
) -> Result<Vec<Descriptor>, RegistryError> {
    if !allowed_media_types.contains(&manifest.config.media_type) {
        return Err(RegistryError::InvalidManifest {
            reference: reference.to_string(),
            message: format!(
                "unexpected config media type {}",
                manifest.config.media_type
            ),
        });
    }

    Ok(manifest
        .layers
        .iter()
        .filter(|layer| allowed_media_types.contains(&layer.media_type))
        .cloned()
        .collect())
}
