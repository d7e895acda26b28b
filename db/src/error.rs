//! Error types for definition corpus operations.
//!
//! Covers I/O, serialization, manifest and checksum verification, corpus
//! consistency, and compression.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or verifying a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Manifest is malformed or does not match the corpus layout.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// A corpus file does not match its recorded SHA-256 checksum.
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    /// Two class files define the same class.
    #[error("duplicate class definition: {0}")]
    DuplicateClass(String),

    /// A corpus directory lacks its `corpus.yaml` header.
    #[error("missing corpus header: {}", .0.display())]
    MissingHeader(PathBuf),

    /// All configured loader sources failed.
    #[error("no definition sources available")]
    NoSourcesAvailable,

    /// Gzip compression or decompression failure.
    #[error("compression error: {0}")]
    Compression(String),
}

/// Convenience alias for results with [`CorpusError`].
pub type Result<T> = std::result::Result<T, CorpusError>;
