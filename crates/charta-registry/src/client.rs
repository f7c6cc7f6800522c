//! Chart push/pull orchestration.
//!
//! [`RegistryClient`] turns chart-level requests into manifest-level
//! transport calls: it builds the config blob and layer list on push, and on
//! pull decides which layers are required, which may be missing, and whether
//! the manifest it got back is acceptable.

use charta_core::ChartMetadata;

use crate::config::ClientConfig;
use crate::error::RegistryError;
use crate::oci::{Descriptor, LayerRole, Manifest, MediaType};
use crate::options::{LoginOptions, LogoutOptions, PullOptions, PushOptions};
use crate::reference::{build_ref, Reference};
use crate::result::{
    ChartSummary, DescriptorSummary, LoginResult, LogoutResult, PullResult, PulledBlob,
    PulledLayer, PushResult,
};
use crate::store::MemoryStore;
use crate::transport::{HttpTransport, Transport};

/// Client for pushing and pulling charts.
///
/// Each operation is self-contained: it builds its own blob store, and
/// nothing but the transport is shared between calls, so one client can
/// serve concurrent operations.
#[derive(Debug)]
pub struct RegistryClient<T = HttpTransport> {
    transport: T,
}

impl RegistryClient<HttpTransport> {
    /// Creates a client that talks HTTP(S) to real registries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use charta_registry::{ClientConfig, PullOptions, RegistryClient};
    ///
    /// # async fn example() -> Result<(), charta_registry::RegistryError> {
    /// let client = RegistryClient::new(ClientConfig::new().with_plain_http(true))?;
    /// let pulled = client
    ///     .pull("localhost:5000/charts/demo:1.0.0", &PullOptions::new())
    ///     .await?;
    /// println!("{}", pulled.ref_with_digest());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self, RegistryError> {
        Ok(Self {
            transport: HttpTransport::new(config)?,
        })
    }
}

impl<T: Transport> RegistryClient<T> {
    /// Creates a client over an arbitrary transport.
    #[must_use]
    pub const fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Logs in to `host` and remembers the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MissingCredentials`] if `options` carries no
    /// credentials, or the transport's error if they are rejected.
    pub async fn login(
        &self,
        host: &str,
        options: &LoginOptions,
    ) -> Result<LoginResult, RegistryError> {
        let credentials =
            options
                .credentials
                .as_ref()
                .ok_or_else(|| RegistryError::MissingCredentials {
                    host: host.to_string(),
                })?;

        self.transport
            .login(host, credentials, options.insecure)
            .await?;

        tracing::info!(host, username = %credentials.username, "Login succeeded");
        Ok(LoginResult {
            host: host.to_string(),
        })
    }

    /// Logs out of `host`.
    ///
    /// # Errors
    ///
    /// Returns the transport's error, e.g. when not logged in.
    pub async fn logout(
        &self,
        host: &str,
        _options: &LogoutOptions,
    ) -> Result<LogoutResult, RegistryError> {
        self.transport.logout(host).await?;

        tracing::info!(host, "Removed login credentials");
        Ok(LogoutResult {
            host: host.to_string(),
        })
    }

    /// Pushes a packaged chart under `destination`.
    ///
    /// The chart lands at `destination/<name>:<version>` (or the tag in
    /// `options`), with its metadata as the config blob and the archive as
    /// the first layer. Provenance, if given, becomes the second layer.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidChart`] if the archive carries no
    /// usable metadata, [`RegistryError::InvalidReference`] if the resulting
    /// reference is malformed, or the transport's error.
    pub async fn push(
        &self,
        chart: &[u8],
        destination: &str,
        options: &PushOptions,
    ) -> Result<PushResult, RegistryError> {
        let meta = ChartMetadata::from_archive(chart)?;
        let tag = options.tag.as_deref().unwrap_or(&meta.version);

        let raw_ref = build_ref(destination, &meta.name, tag);
        let reference = Reference::parse(&raw_ref)?;
        if reference.is_digest() {
            return Err(RegistryError::InvalidReference {
                reference: raw_ref,
                reason: "push target must be a tag, not a digest".to_string(),
            });
        }

        let mut store = MemoryStore::new();
        let chart_desc = store.add(MediaType::chart_content(), chart);
        let config_desc = store.add(MediaType::config(), meta.to_config_json()?);

        let mut layers = vec![chart_desc.clone()];
        let provenance_desc = options
            .provenance
            .as_ref()
            .map(|prov| store.add(MediaType::provenance(), prov.clone()));
        if let Some(ref desc) = provenance_desc {
            layers.push(desc.clone());
        }

        let manifest = Manifest::new(config_desc.clone(), layers)
            .with_annotation(Manifest::ANNOTATION_TITLE, &meta.name)
            .with_annotation(Manifest::ANNOTATION_VERSION, &meta.version);

        tracing::debug!(%reference, chart = %chart_desc.digest, "Pushing chart");
        let manifest_desc = self
            .transport
            .push_manifest(&reference, &store, &manifest)
            .await?;

        let reference = reference.to_string();
        tracing::info!(
            reference = %reference,
            digest = %manifest_desc.digest,
            provenance = provenance_desc.is_some(),
            "Pushed chart"
        );

        Ok(PushResult {
            ref_with_digest: format!("{reference}@{}", manifest_desc.digest),
            manifest: DescriptorSummary::from(&manifest_desc),
            config: DescriptorSummary::from(&config_desc),
            chart: ChartSummary {
                descriptor: DescriptorSummary::from(&chart_desc),
                meta,
            },
            provenance: provenance_desc.as_ref().map(DescriptorSummary::from),
            reference,
        })
    }

    /// Pulls the layers selected by `options` from `reference`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NoLayersRequested`] if `options` selects nothing;
    ///   the transport is not contacted.
    /// - [`RegistryError::InsufficientLayers`] or
    ///   [`RegistryError::MissingLayer`] if the manifest lacks a required
    ///   layer.
    /// - [`RegistryError::BlobUnavailable`] if an accepted layer cannot be
    ///   read back from the operation's store.
    /// - The transport's error for anything that fails on the wire.
    pub async fn pull(
        &self,
        reference: &str,
        options: &PullOptions,
    ) -> Result<PullResult, RegistryError> {
        options.validate()?;
        let parsed = Reference::parse(reference)?;

        let mut store = MemoryStore::new();
        let allowed = options.allowed_media_types();
        let (manifest_desc, layers) = self
            .transport
            .pull_manifest(&parsed, &mut store, &allowed)
            .await?;

        let min_layers = options.min_layers();
        if layers.len() < min_layers {
            return Err(RegistryError::InsufficientLayers {
                required: min_layers,
                found: layers.len(),
            });
        }

        let mut chart_layer = None;
        let mut provenance_layer = None;
        for layer in &layers {
            match layer.media_type.role() {
                LayerRole::Content => {
                    chart_layer.get_or_insert(layer);
                }
                LayerRole::Provenance => {
                    provenance_layer.get_or_insert(layer);
                }
                LayerRole::Config | LayerRole::Unknown => {}
            }
        }

        let chart = if options.with_chart {
            let desc = chart_layer.ok_or_else(|| RegistryError::MissingLayer {
                media_type: MediaType::CHART_CONTENT.to_string(),
            })?;
            PulledLayer::Fetched(Self::read_blob(&store, desc)?)
        } else {
            PulledLayer::NotRequested
        };

        let provenance = match (options.with_provenance, provenance_layer) {
            (false, _) => PulledLayer::NotRequested,
            (true, Some(desc)) => PulledLayer::Fetched(Self::read_blob(&store, desc)?),
            (true, None) if options.ignore_missing_provenance => {
                tracing::warn!(
                    reference,
                    "Manifest has no provenance layer, continuing without it"
                );
                PulledLayer::Missing
            }
            (true, None) => {
                return Err(RegistryError::MissingLayer {
                    media_type: MediaType::CHART_PROVENANCE.to_string(),
                })
            }
        };

        let reference = parsed.to_string();
        tracing::info!(
            reference = %reference,
            digest = %manifest_desc.digest,
            chart = chart.is_fetched(),
            provenance = provenance.is_fetched(),
            "Pulled chart"
        );

        Ok(PullResult {
            manifest: DescriptorSummary::from(&manifest_desc),
            chart,
            provenance,
            reference,
        })
    }

    /// Pulls only the chart archive.
    ///
    /// # Errors
    ///
    /// Same as [`pull`](Self::pull).
    pub async fn pull_chart(&self, reference: &str) -> Result<Vec<u8>, RegistryError> {
        let result = self.pull(reference, &PullOptions::new()).await?;
        result
            .chart
            .into_data()
            .ok_or_else(|| RegistryError::MissingLayer {
                media_type: MediaType::CHART_CONTENT.to_string(),
            })
    }

    /// Pulls only the provenance file.
    ///
    /// # Errors
    ///
    /// Same as [`pull`](Self::pull); a missing provenance layer is an error.
    pub async fn pull_provenance(&self, reference: &str) -> Result<Vec<u8>, RegistryError> {
        let options = PullOptions::new().with_chart(false).with_provenance(true);
        let result = self.pull(reference, &options).await?;
        result
            .provenance
            .into_data()
            .ok_or_else(|| RegistryError::MissingLayer {
                media_type: MediaType::CHART_PROVENANCE.to_string(),
            })
    }

    fn read_blob(store: &MemoryStore, descriptor: &Descriptor) -> Result<PulledBlob, RegistryError> {
        let data = store
            .get(descriptor)
            .ok_or_else(|| RegistryError::BlobUnavailable {
                digest: descriptor.digest.clone(),
            })?;
        Ok(PulledBlob {
            digest: descriptor.digest.clone(),
            size: descriptor.size,
            data: data.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use async_trait::async_trait;

    /// Lists layers without ever writing them to the store.
    struct ForgetfulTransport {
        layers: Vec<Descriptor>,
    }

    #[async_trait]
    impl Transport for ForgetfulTransport {
        async fn login(&self, _: &str, _: &Credentials, _: bool) -> Result<(), RegistryError> {
            Ok(())
        }

        async fn logout(&self, _: &str) -> Result<(), RegistryError> {
            Ok(())
        }

        async fn push_manifest(
            &self,
            _: &Reference,
            _: &MemoryStore,
            manifest: &Manifest,
        ) -> Result<Descriptor, RegistryError> {
            Ok(manifest.config.clone())
        }

        async fn pull_manifest(
            &self,
            _: &Reference,
            _: &mut MemoryStore,
            _: &[MediaType],
        ) -> Result<(Descriptor, Vec<Descriptor>), RegistryError> {
            let manifest = Descriptor::new(MediaType::oci_manifest(), "sha256:m", 1);
            Ok((manifest, self.layers.clone()))
        }
    }

    #[tokio::test]
    async fn test_unreadable_layer_is_store_fault() {
        let chart = Descriptor::new(MediaType::chart_content(), "sha256:gone", 3);
        let client = RegistryClient::with_transport(ForgetfulTransport {
            layers: vec![chart],
        });

        let err = client
            .pull("localhost:5000/charts/demo:1.0.0", &PullOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unable to retrieve blob with digest sha256:gone");
        assert_eq!(err.kind(), crate::ErrorKind::StoreFault);
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let client = RegistryClient::with_transport(ForgetfulTransport { layers: vec![] });
        let err = client
            .login("localhost:5000", &LoginOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingCredentials { .. }));
    }

    #[tokio::test]
    async fn test_push_rejects_invalid_archive() {
        let client = RegistryClient::with_transport(ForgetfulTransport { layers: vec![] });
        let err = client
            .push(b"not a tarball", "localhost:5000/charts", &PushOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Metadata);
    }
}
