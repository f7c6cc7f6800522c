//! # Charta Core
//!
//! Core types for charta, a client that moves versioned chart packages in and
//! out of OCI registries.
//!
//! This crate owns everything that can be known about a chart without talking
//! to a registry:
//!
//! - [`ChartMetadata`] - the `Chart.yaml` model, which also becomes the OCI
//!   config blob when a chart is pushed
//! - [`ChartMetadata::from_archive`] - metadata extraction straight from the
//!   gzip-compressed tar bytes of a packaged chart
//! - [`version`] - the semantic version rules a chart version must satisfy
//!
//! ## Example
//!
//! ```rust,no_run
//! use charta_core::ChartMetadata;
//!
//! let bytes = std::fs::read("demo-1.0.0.tgz")?;
//! let meta = ChartMetadata::from_archive(&bytes)?;
//! assert_eq!(meta.file_name(), "demo-1.0.0.tgz");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chart;
pub mod error;
pub mod version;


pub use chart::{ChartMetadata, Maintainer, CHARTFILE_NAME};
pub use error::{Error, Result};
