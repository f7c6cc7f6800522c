//! In-process registry.
//!
//! [`MemoryRegistry`] keeps manifests and blobs in memory and speaks the same
//! [`Transport`] contract as [`HttpTransport`](super::HttpTransport). It backs
//! tests and offline tooling, and exposes a few hooks for simulating broken
//! registries.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{accepted_layers, decode_manifest, encode_manifest, Transport};
use crate::credentials::Credentials;
use crate::error::RegistryError;
use crate::oci::{Descriptor, Manifest, MediaType};
use crate::reference::Reference;
use crate::store::{compute_digest, MemoryStore};

#[derive(Debug, Default)]
struct State {
    /// `host/repository` -> tag or digest -> manifest bytes.
    manifests: HashMap<String, HashMap<String, Vec<u8>>>,
    blobs: HashMap<String, Vec<u8>>,
    users: HashMap<String, Credentials>,
    logins: HashSet<String>,
}

/// Registry that lives entirely in memory.
///
/// # Examples
///
/// ```
/// use charta_registry::{MemoryRegistry, RegistryClient};
///
/// let client = RegistryClient::with_transport(MemoryRegistry::new());
/// assert_eq!(client.transport().manifest_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    state: Mutex<State>,
    requests: AtomicUsize,
}

impl MemoryRegistry {
    /// Creates an empty registry that accepts any login.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `credentials` for logins to `host`.
    #[must_use]
    pub fn with_user(self, host: impl Into<String>, credentials: Credentials) -> Self {
        self.state.lock().users.insert(host.into(), credentials);
        self
    }

    /// Stores `manifest` under `reference` as-is, uploading `blobs` alongside.
    ///
    /// Lets tests publish manifests a chart push would never produce.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be serialized.
    pub fn put_manifest(
        &self,
        reference: &Reference,
        manifest: &Manifest,
        blobs: impl IntoIterator<Item = Vec<u8>>,
    ) -> Result<Descriptor, RegistryError> {
        let (bytes, descriptor) = encode_manifest(manifest)?;
        let mut state = self.state.lock();
        for blob in blobs {
            state.blobs.insert(compute_digest(&blob), blob);
        }
        Self::tag_manifest(&mut state, reference, &descriptor, bytes);
        Ok(descriptor)
    }

    /// Replaces the bytes stored for `digest` without updating the digest.
    pub fn corrupt_blob(&self, digest: &str, data: impl Into<Vec<u8>>) {
        self.state.lock().blobs.insert(digest.to_string(), data.into());
    }

    /// Removes the blob stored for `digest`.
    pub fn remove_blob(&self, digest: &str) {
        self.state.lock().blobs.remove(digest);
    }

    /// Returns true if `host` has an active login.
    #[must_use]
    pub fn is_logged_in(&self, host: &str) -> bool {
        self.state.lock().logins.contains(host)
    }

    /// Returns the number of stored blobs.
    #[must_use]
    pub fn blob_count(&self) -> usize {
        self.state.lock().blobs.len()
    }

    /// Returns the number of stored manifests, counted by digest.
    #[must_use]
    pub fn manifest_count(&self) -> usize {
        self.state
            .lock()
            .manifests
            .values()
            .map(|refs| refs.keys().filter(|k| k.starts_with("sha256:")).count())
            .sum()
    }

    /// Returns how many transport calls this registry has served.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    fn repository_key(reference: &Reference) -> String {
        format!("{}/{}", reference.host, reference.repository())
    }

    fn tag_manifest(
        state: &mut State,
        reference: &Reference,
        descriptor: &Descriptor,
        bytes: Vec<u8>,
    ) {
        let refs = state
            .manifests
            .entry(Self::repository_key(reference))
            .or_default();
        if let Some(ref tag) = reference.tag {
            refs.insert(tag.clone(), bytes.clone());
        }
        refs.insert(descriptor.digest.clone(), bytes);
    }
}

#[async_trait]
impl Transport for MemoryRegistry {
    async fn login(
        &self,
        host: &str,
        credentials: &Credentials,
        _insecure: bool,
    ) -> Result<(), RegistryError> {
        self.record_request();
        let mut state = self.state.lock();
        if let Some(expected) = state.users.get(host) {
            if expected != credentials {
                return Err(RegistryError::AuthenticationFailed {
                    message: format!("invalid username or password for {host}"),
                });
            }
        }
        state.logins.insert(host.to_string());
        Ok(())
    }

    async fn logout(&self, host: &str) -> Result<(), RegistryError> {
        self.record_request();
        if self.state.lock().logins.remove(host) {
            Ok(())
        } else {
            Err(RegistryError::CredentialsNotFound {
                host: host.to_string(),
            })
        }
    }

    async fn push_manifest(
        &self,
        reference: &Reference,
        store: &MemoryStore,
        manifest: &Manifest,
    ) -> Result<Descriptor, RegistryError> {
        self.record_request();
        let mut uploads = Vec::with_capacity(manifest.layers.len() + 1);
        for descriptor in std::iter::once(&manifest.config).chain(&manifest.layers) {
            let data = store
                .get(descriptor)
                .ok_or_else(|| RegistryError::BlobUnavailable {
                    digest: descriptor.digest.clone(),
                })?;
            uploads.push((descriptor.digest.clone(), data.to_vec()));
        }

        let (bytes, descriptor) = encode_manifest(manifest)?;
        let mut state = self.state.lock();
        state.blobs.extend(uploads);
        Self::tag_manifest(&mut state, reference, &descriptor, bytes);
        drop(state);

        tracing::debug!(%reference, digest = %descriptor.digest, "Stored manifest in memory");
        Ok(descriptor)
    }

    async fn pull_manifest(
        &self,
        reference: &Reference,
        store: &mut MemoryStore,
        allowed_media_types: &[MediaType],
    ) -> Result<(Descriptor, Vec<Descriptor>), RegistryError> {
        self.record_request();
        let bytes = self
            .state
            .lock()
            .manifests
            .get(&Self::repository_key(reference))
            .and_then(|refs| refs.get(reference.manifest_reference()))
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                reference: reference.to_string(),
            })?;

        let (manifest, descriptor) = decode_manifest(reference, &bytes)?;
        let layers = accepted_layers(reference, &manifest, allowed_media_types)?;

        for layer in &layers {
            let data = self
                .state
                .lock()
                .blobs
                .get(&layer.digest)
                .cloned()
                .ok_or_else(|| RegistryError::BlobUnavailable {
                    digest: layer.digest.clone(),
                })?;
            store.insert(layer, data)?;
        }

        Ok((descriptor, layers))
    }
}
