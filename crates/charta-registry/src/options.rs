//! Per-operation options for push, pull, login and logout.
//!
//! Each operation takes a plain options struct. Defaults match what a caller
//! wants most of the time, so `PullOptions::default()` pulls just the chart.

use crate::credentials::Credentials;
use crate::error::RegistryError;
use crate::oci::{known_media_types, LayerRole, MediaType};

/// Options for [`RegistryClient::push`](crate::RegistryClient::push).
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Provenance file to push as a second layer.
    pub provenance: Option<Vec<u8>>,

    /// Tag to push to instead of the chart version.
    pub tag: Option<String>,
}

impl PushOptions {
    /// Creates options that push the chart alone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches provenance bytes.
    #[must_use]
    pub fn with_provenance(mut self, provenance: impl Into<Vec<u8>>) -> Self {
        self.provenance = Some(provenance.into());
        self
    }

    /// Overrides the tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Options for [`RegistryClient::pull`](crate::RegistryClient::pull).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullOptions {
    /// Pull the chart content layer.
    pub with_chart: bool,

    /// Pull the provenance layer.
    pub with_provenance: bool,

    /// Treat a missing provenance layer as absent instead of an error.
    pub ignore_missing_provenance: bool,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PullOptions {
    /// Creates options that pull the chart only.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            with_chart: true,
            with_provenance: false,
            ignore_missing_provenance: false,
        }
    }

    /// Selects or deselects the chart layer.
    #[must_use]
    pub const fn with_chart(mut self, with_chart: bool) -> Self {
        self.with_chart = with_chart;
        self
    }

    /// Selects or deselects the provenance layer.
    #[must_use]
    pub const fn with_provenance(mut self, with_provenance: bool) -> Self {
        self.with_provenance = with_provenance;
        self
    }

    /// Sets whether a missing provenance layer is tolerated.
    #[must_use]
    pub const fn ignore_missing_provenance(mut self, ignore: bool) -> Self {
        self.ignore_missing_provenance = ignore;
        self
    }

    /// Rejects a selection that names no layer at all.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoLayersRequested`] when neither the chart nor
    /// the provenance layer is selected.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if !self.with_chart && !self.with_provenance {
            return Err(RegistryError::NoLayersRequested);
        }
        Ok(())
    }

    /// Returns the minimum number of accepted layers a manifest must have.
    ///
    /// # Examples
    ///
    /// ```
    /// use charta_registry::PullOptions;
    ///
    /// assert_eq!(PullOptions::new().min_layers(), 1);
    /// assert_eq!(PullOptions::new().with_provenance(true).min_layers(), 2);
    /// assert_eq!(
    ///     PullOptions::new()
    ///         .with_provenance(true)
    ///         .ignore_missing_provenance(true)
    ///         .min_layers(),
    ///     1
    /// );
    /// ```
    #[must_use]
    pub const fn min_layers(&self) -> usize {
        let mut min = 0;
        if self.with_chart {
            min += 1;
        }
        if self.with_provenance && !self.ignore_missing_provenance {
            min += 1;
        }
        min
    }

    /// Returns the media types the transport may accept from the manifest.
    ///
    /// The provenance type is allowed whenever provenance is selected, even
    /// when its absence is tolerated.
    #[must_use]
    pub fn allowed_media_types(&self) -> Vec<MediaType> {
        known_media_types()
            .into_iter()
            .filter(|media_type| match media_type.role() {
                LayerRole::Config => true,
                LayerRole::Content => self.with_chart,
                LayerRole::Provenance => self.with_provenance,
                LayerRole::Unknown => false,
            })
            .collect()
    }
}

/// Options for [`RegistryClient::login`](crate::RegistryClient::login).
#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    /// Basic auth credentials.
    pub credentials: Option<Credentials>,

    /// Skip TLS certificate verification while checking the credentials.
    pub insecure: bool,
}

impl LoginOptions {
    /// Creates empty login options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets basic auth credentials.
    #[must_use]
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Sets insecure mode.
    #[must_use]
    pub const fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}

/// Options for [`RegistryClient::logout`](crate::RegistryClient::logout).
#[derive(Debug, Clone, Copy, Default)]
pub struct LogoutOptions;

impl LogoutOptions {
    /// Creates logout options.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}
