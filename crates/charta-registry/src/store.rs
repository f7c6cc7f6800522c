//! Operation-scoped scratch store for in-flight blobs.
//!
//! Every push or pull creates its own [`MemoryStore`]: push fills it before
//! handing it to the transport, pull lets the transport fill it and then
//! reads the accepted layers back out.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::error::RegistryError;
use crate::oci::{Descriptor, MediaType};

/// Computes the `sha256:<hex>` digest of `data`.
///
/// # Examples
///
/// ```
/// use charta_registry::compute_digest;
///
/// assert_eq!(
///     compute_digest(b""),
///     "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn compute_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Content-addressed in-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a blob and returns its descriptor.
    ///
    /// Adding identical bytes twice yields identical descriptors.
    pub fn add(&mut self, media_type: MediaType, data: impl Into<Vec<u8>>) -> Descriptor {
        let data = data.into();
        let digest = compute_digest(&data);
        let descriptor = Descriptor::new(media_type, digest.clone(), data.len() as u64);
        self.blobs.insert(digest, data);
        descriptor
    }

    /// Stores bytes fetched for `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DigestMismatch`] if the bytes do not hash to
    /// the descriptor's digest or their length differs from its size.
    pub fn insert(&mut self, descriptor: &Descriptor, data: Vec<u8>) -> Result<(), RegistryError> {
        verify(descriptor, &data)?;
        self.blobs.insert(descriptor.digest.clone(), data);
        Ok(())
    }

    /// Returns the bytes for `descriptor`.
    ///
    /// Returns `None` if the blob was never stored or no longer matches the
    /// descriptor's digest and size.
    #[must_use]
    pub fn get(&self, descriptor: &Descriptor) -> Option<&[u8]> {
        let data = self.blobs.get(&descriptor.digest)?;
        verify(descriptor, data).ok()?;
        Some(data)
    }

    /// Returns true if a blob with `digest` is stored.
    #[must_use]
    pub fn contains(&self, digest: &str) -> bool {
        self.blobs.contains_key(digest)
    }

    /// Returns the number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns true if the store holds no blobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

/// Checks `data` against the digest and size recorded in `descriptor`.
///
/// # Errors
///
/// Returns [`RegistryError::DigestMismatch`] on any disagreement.
pub fn verify(descriptor: &Descriptor, data: &[u8]) -> Result<(), RegistryError> {
    let actual = compute_digest(data);
    if actual != descriptor.digest {
        return Err(RegistryError::DigestMismatch {
            expected: descriptor.digest.clone(),
            actual,
        });
    }
    if data.len() as u64 != descriptor.size {
        return Err(RegistryError::DigestMismatch {
            expected: format!("{} ({} bytes)", descriptor.digest, descriptor.size),
            actual: format!("{actual} ({} bytes)", data.len()),
        });
    }
    Ok(())
}
