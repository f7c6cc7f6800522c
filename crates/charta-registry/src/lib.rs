//! # Charta Registry
//!
//! Pushes and pulls charts to and from OCI-compatible registries.
//!
//! A chart is stored as a single OCI image manifest:
//!
//! - **config** - the chart's metadata as JSON
//!   (`application/vnd.cncf.helm.config.v1+json`)
//! - **layer 0** - the packaged chart archive
//!   (`application/vnd.cncf.helm.chart.content.v1.tar+gzip`)
//! - **layer 1** - optionally, the provenance file
//!   (`application/vnd.cncf.helm.chart.provenance.v1.prov`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use charta_registry::{ClientConfig, PullOptions, PushOptions, RegistryClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RegistryClient::new(ClientConfig::new().with_plain_http(true))?;
//!
//!     let chart = std::fs::read("demo-1.0.0.tgz")?;
//!     let pushed = client
//!         .push(&chart, "localhost:5000/charts", &PushOptions::new())
//!         .await?;
//!     println!("pushed {}", pushed.ref_with_digest);
//!
//!     let pulled = client
//!         .pull(&pushed.reference, &PullOptions::new().with_provenance(true).ignore_missing_provenance(true))
//!         .await?;
//!     assert_eq!(pulled.chart_data(), Some(chart.as_slice()));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   RegistryClient                     │
//! │   push: metadata -> config blob + layers -> manifest │
//! │   pull: allow-list -> layer checks -> PullResult     │
//! └──────────────────────────────────────────────────────┘
//!            │ MemoryStore (per operation)
//!            ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                      Transport                       │
//! │   HttpTransport (OCI Distribution API)               │
//! │   MemoryRegistry (in-process)                        │
//! └──────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod client;
mod config;
mod credentials;
mod error;
mod oci;
mod options;
mod reference;
mod result;
mod store;
pub mod transport;


pub use client::RegistryClient;
pub use config::{default_credentials_file, ClientConfig, TlsConfig, CREDENTIALS_FILE_BASENAME};
pub use credentials::{CredentialStore, Credentials};
pub use error::{ErrorKind, RegistryError};
pub use oci::{known_media_types, Descriptor, LayerRole, Manifest, MediaType};
pub use options::{LoginOptions, LogoutOptions, PullOptions, PushOptions};
pub use reference::{build_ref, Reference};
pub use result::{
    ChartSummary, DescriptorSummary, LoginResult, LogoutResult, PullResult, PulledBlob,
    PulledLayer, PushResult,
};
pub use store::{compute_digest, MemoryStore};
pub use transport::{HttpTransport, MemoryRegistry, Transport};
