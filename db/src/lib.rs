//! Definition corpus loading, manifests, and configuration for nxvalidate.
//!
//! This crate loads a NeXus definition corpus from disk (a directory of
//! per-class files, or a single bundle), verifies it against a checksum
//! manifest, and reads the validator's YAML configuration.
//!
//! # Quick start
//!
//! ```no_run
//! use nxvalidate_core::SchemaProvider;
//! use nxvalidate_db::{CorpusManifest, DefinitionCorpus};
//!
//! // Load a corpus directory
//! let corpus = DefinitionCorpus::from_dir("definitions/").unwrap();
//! if let Some(entry) = corpus.get("NXentry") {
//!     println!("NXentry declares {} fields", entry.fields.len());
//! }
//!
//! // Use the builder for fallback chains
//! let corpus = DefinitionCorpus::builder()
//!     .from_dir("definitions/")
//!     .from_bundle("definitions.json.gz")
//!     .verify_manifest(true)
//!     .build()
//!     .unwrap();
//! assert!(corpus.is_known_class("NXentry"));
//!
//! // Record checksums for later verification
//! let manifest = CorpusManifest::build("definitions/", corpus.version()).unwrap();
//! manifest.save("definitions/manifest.json").unwrap();
//! ```

mod config;
mod error;
mod loader;
mod manifest;

pub use config::{CorpusConfig, ReportConfig, ReportFormat, ShowPreset, ValidatorConfig};
pub use error::{CorpusError, Result};
pub use loader::{CorpusBuilder, CorpusHeader, CorpusSource, DefinitionCorpus, HEADER_FILE};
pub use manifest::{CorpusManifest, MANIFEST_FILE};
