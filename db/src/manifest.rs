//! Integrity manifest for a definition corpus directory.
//!
//! The manifest records the SHA-256 checksum of every class file and the
//! header of a corpus directory. A corpus should be rejected when:
//!
//! - **Checksum**: a file no longer matches its recorded digest (manual
//!   edit, partial copy, corruption).
//! - **Layout**: a recorded file is missing, or a class file exists that
//!   the manifest does not list.
//!
//! # Examples
//!
//! ```no_run
//! use nxvalidate_db::CorpusManifest;
//!
//! let manifest = CorpusManifest::build("definitions/", "v2024.02").unwrap();
//! manifest.save("definitions/manifest.json").unwrap();
//!
//! let loaded = CorpusManifest::load("definitions/manifest.json").unwrap();
//! loaded.verify("definitions/").unwrap();
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{CorpusError, Result};
use crate::loader::{HEADER_FILE, collect_class_files};

/// File name of the manifest inside a corpus directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Checksums of a corpus directory.
///
/// Persisted as pretty-printed JSON next to the corpus files. Paths are
/// relative to the corpus directory and use `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusManifest {
    /// Bundle contract version (mirrors [`nxvalidate_core::DEFINITION_CONTRACT_VERSION`]).
    pub schema_version: String,
    /// Version of the definitions.
    pub version: String,
    /// RFC 3339 timestamp of when the manifest was built.
    pub generated_at: String,
    /// SHA-256 hex digest per relative file path.
    pub files: BTreeMap<String, String>,
}

impl CorpusManifest {
    /// Creates an empty manifest stamped with the current time.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            schema_version: nxvalidate_core::DEFINITION_CONTRACT_VERSION.to_string(),
            version: version.into(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            files: BTreeMap::new(),
        }
    }

    /// Checksums the header and every class file below `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::Io`] if the directory or a file cannot be read.
    pub fn build(dir: impl AsRef<Path>, version: impl Into<String>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut manifest = Self::new(version);
        for path in corpus_files(dir)? {
            let key = relative_key(dir, &path)?;
            let checksum = Self::calculate_checksum(&path)?;
            debug!(file = %key, checksum = %checksum, "checksummed corpus file");
            manifest.files.insert(key, checksum);
        }
        Ok(manifest)
    }

    /// Checks every corpus file below `dir` against the recorded checksums.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::InvalidManifest`] when a recorded file is
    /// missing or an unrecorded class file is present, and
    /// [`CorpusError::InvalidChecksum`] when a digest differs.
    pub fn verify(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let mut seen = 0;
        for path in corpus_files(dir)? {
            let key = relative_key(dir, &path)?;
            let Some(expected) = self.files.get(&key) else {
                return Err(CorpusError::InvalidManifest(format!(
                    "{key} is not listed in the manifest"
                )));
            };
            let actual = Self::calculate_checksum(&path)?;
            if &actual != expected {
                return Err(CorpusError::InvalidChecksum(format!(
                    "{key}: expected {expected}, found {actual}"
                )));
            }
            seen += 1;
        }
        if seen != self.files.len() {
            let missing: Vec<&str> = self
                .files
                .keys()
                .filter(|key| !dir.join(key.as_str()).is_file())
                .map(String::as_str)
                .collect();
            return Err(CorpusError::InvalidManifest(format!(
                "missing files: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Loads a manifest from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::CorpusError::Io) if the file cannot be read, or
    /// [`Json`](crate::CorpusError::Json) if the content is not manifest
    /// JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let manifest = serde_json::from_reader(reader)?;
        Ok(manifest)
    }

    /// Saves the manifest as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::CorpusError::Io) or
    /// [`Json`](crate::CorpusError::Json) on failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Computes the SHA-256 hex digest of a file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::CorpusError::Io) if the file cannot be read.
    pub fn calculate_checksum(path: impl AsRef<Path>) -> Result<String> {
        let bytes = std::fs::read(path)?;
        let hash = Sha256::digest(&bytes);
        Ok(format!("{:x}", hash))
    }

    /// Returns `true` if the manifest lists `file`.
    pub fn contains(&self, file: &str) -> bool {
        self.files.contains_key(file)
    }
}

fn corpus_files(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut files = Vec::new();
    let header = dir.join(HEADER_FILE);
    if header.is_file() {
        files.push(header);
    }
    collect_class_files(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn relative_key(dir: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(dir)
        .map_err(|_| CorpusError::InvalidManifest(format!("{} is outside the corpus", path.display())))?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
