//! Definition corpus loading with builder pattern and fallback chains.
//!
//! Provides [`DefinitionCorpus`] for indexed class lookup and
//! [`CorpusBuilder`] for loading from several sources with automatic
//! fallback.
//!
//! # Layouts
//!
//! A corpus directory holds a `corpus.yaml` header (version, naming
//! patterns, field attributes, opaque classes) and one YAML or JSON file
//! per class, in any subdirectory layout:
//!
//! ```text
//! definitions/
//!   corpus.yaml
//!   base_classes/NXentry.yaml
//!   base_classes/NXdata.yaml
//!   applications/NXscan.yaml
//! ```
//!
//! A bundle is one serialized [`DefinitionBundle`] as `.json`, `.yaml`, or
//! gzip-compressed `.json.gz`.
//!
//! ```no_run
//! use nxvalidate_db::DefinitionCorpus;
//!
//! let corpus = DefinitionCorpus::builder()
//!     .from_dir("definitions/")
//!     .from_bundle("definitions.json.gz")
//!     .build()
//!     .unwrap();
//! println!("{} classes", corpus.len());
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use nxvalidate_core::{AttributeRule, ClassRule, DefinitionBundle, Pattern, SchemaProvider};

use crate::error::{CorpusError, Result};
use crate::manifest::{CorpusManifest, MANIFEST_FILE};

/// Name of the header file of a corpus directory.
pub const HEADER_FILE: &str = "corpus.yaml";

/// Describes where a [`DefinitionCorpus`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusSource {
    /// A directory of per-class files plus a header.
    Directory(PathBuf),
    /// A single serialized bundle.
    Bundle(PathBuf),
    /// Constructed in memory.
    Memory,
    /// Loaded via a fallback chain of multiple sources.
    Multiple(Vec<CorpusSource>),
}

/// Contents of `corpus.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusHeader {
    pub version: String,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub field_attributes: BTreeMap<String, AttributeRule>,
    #[serde(default)]
    pub opaque_classes: Vec<String>,
}

/// Indexed definition corpus.
///
/// Lookups by class name are O(1). Implements [`SchemaProvider`], so a
/// corpus can be handed straight to a
/// [`Validator`](nxvalidate_core::Validator).
///
/// # Examples
///
/// ```
/// use nxvalidate_core::{ClassRule, DefinitionBundle, SchemaProvider};
/// use nxvalidate_db::DefinitionCorpus;
///
/// let mut bundle = DefinitionBundle::new("v2024.02");
/// bundle.classes.push(ClassRule::new("NXentry"));
///
/// let corpus = DefinitionCorpus::from_package(bundle).unwrap();
/// assert!(corpus.is_known_class("NXentry"));
/// assert_eq!(corpus.version(), "v2024.02");
/// ```
#[derive(Debug)]
pub struct DefinitionCorpus {
    version: String,
    patterns: Vec<Pattern>,
    field_attributes: BTreeMap<String, AttributeRule>,
    opaque_classes: HashSet<String>,
    classes: HashMap<String, ClassRule>,
    source: CorpusSource,
}

impl DefinitionCorpus {
    /// Returns a new [`CorpusBuilder`] for configuring a fallback chain.
    pub fn builder() -> CorpusBuilder {
        CorpusBuilder::new()
    }

    /// Indexes an in-memory bundle.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::DuplicateClass`] if two classes share a name.
    pub fn from_package(bundle: DefinitionBundle) -> Result<Self> {
        let header = CorpusHeader {
            version: bundle.version,
            patterns: bundle.patterns,
            field_attributes: bundle.field_attributes,
            opaque_classes: bundle.opaque_classes,
        };
        Self::assemble(header, bundle.classes, CorpusSource::Memory)
    }

    /// Loads a corpus directory.
    ///
    /// Every `*.yaml`, `*.yml` and `*.json` file below `path` other than the
    /// header and the manifest is parsed as one [`ClassRule`]. Files are read
    /// in path order.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::MissingHeader`] without a `corpus.yaml`,
    /// [`CorpusError::DuplicateClass`] when two files define the same class,
    /// and I/O or parse errors for unreadable files.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let header_path = path.join(HEADER_FILE);
        if !header_path.is_file() {
            return Err(CorpusError::MissingHeader(header_path));
        }
        let header: CorpusHeader = read_yaml(&header_path)?;

        let mut files = Vec::new();
        collect_class_files(path, &mut files)?;
        files.sort();

        let mut classes = Vec::with_capacity(files.len());
        for file in &files {
            let class: ClassRule = if has_extension(file, "json") {
                serde_json::from_reader(BufReader::new(std::fs::File::open(file)?))?
            } else {
                read_yaml(file)?
            };
            debug!(class = %class.name, file = %file.display(), "loaded class");
            classes.push(class);
        }

        let corpus = Self::assemble(header, classes, CorpusSource::Directory(path.to_path_buf()))?;
        info!(
            dir = %path.display(),
            version = %corpus.version,
            classes = corpus.len(),
            "loaded definition corpus"
        );
        Ok(corpus)
    }

    /// Loads a corpus directory after checking it against its manifest.
    ///
    /// # Errors
    ///
    /// Fails as [`CorpusManifest::verify`] does, then as
    /// [`from_dir`](Self::from_dir).
    pub fn from_dir_verified(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let manifest = CorpusManifest::load(path.join(MANIFEST_FILE))?;
        manifest.verify(path)?;
        Self::from_dir(path)
    }

    /// Loads a serialized [`DefinitionBundle`].
    ///
    /// The format follows the file name: `.json.gz` (gzip JSON), `.yaml` /
    /// `.yml`, otherwise JSON.
    ///
    /// # Errors
    ///
    /// Returns I/O, parse, or [`CorpusError::Compression`] errors.
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bundle: DefinitionBundle = if is_gzip(path) {
            let mut raw = String::new();
            GzDecoder::new(std::fs::File::open(path)?)
                .read_to_string(&mut raw)
                .map_err(|e| CorpusError::Compression(e.to_string()))?;
            serde_json::from_str(&raw)?
        } else if has_extension(path, "yaml") || has_extension(path, "yml") {
            read_yaml(path)?
        } else {
            serde_json::from_reader(BufReader::new(std::fs::File::open(path)?))?
        };

        let header = CorpusHeader {
            version: bundle.version,
            patterns: bundle.patterns,
            field_attributes: bundle.field_attributes,
            opaque_classes: bundle.opaque_classes,
        };
        let corpus = Self::assemble(header, bundle.classes, CorpusSource::Bundle(path.to_path_buf()))?;
        info!(bundle = %path.display(), classes = corpus.len(), "loaded definition bundle");
        Ok(corpus)
    }

    fn assemble(header: CorpusHeader, class_list: Vec<ClassRule>, source: CorpusSource) -> Result<Self> {
        let mut classes = HashMap::with_capacity(class_list.len());
        for class in class_list {
            if classes.contains_key(&class.name) {
                return Err(CorpusError::DuplicateClass(class.name));
            }
            classes.insert(class.name.clone(), class);
        }
        Ok(Self {
            version: header.version,
            patterns: header.patterns,
            field_attributes: header.field_attributes,
            opaque_classes: header.opaque_classes.into_iter().collect(),
            classes,
            source,
        })
    }

    /// Converts the corpus back into a bundle with classes sorted by name.
    pub fn to_package(&self) -> DefinitionBundle {
        let mut bundle = DefinitionBundle::new(self.version.clone());
        bundle.patterns = self.patterns.clone();
        bundle.field_attributes = self.field_attributes.clone();
        let mut opaque: Vec<String> = self.opaque_classes.iter().cloned().collect();
        opaque.sort();
        bundle.opaque_classes = opaque;
        let mut classes: Vec<ClassRule> = self.classes.values().cloned().collect();
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        bundle.classes = classes;
        bundle
    }

    /// Writes the corpus as a bundle; `.json.gz` paths are gzip-compressed.
    ///
    /// # Errors
    ///
    /// Returns I/O, serialization, or [`CorpusError::Compression`] errors.
    pub fn write_bundle(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_package())?;
        if is_gzip(path) {
            let mut encoder = GzEncoder::new(std::fs::File::create(path)?, Compression::default());
            encoder
                .write_all(json.as_bytes())
                .map_err(|e| CorpusError::Compression(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CorpusError::Compression(e.to_string()))?;
        } else {
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    pub fn get(&self, class: &str) -> Option<&ClassRule> {
        self.classes.get(class)
    }

    /// Inserts a class, replacing any existing rule with the same name.
    pub fn insert(&mut self, class: ClassRule) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Returns the number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Returns class names in sorted order.
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn source(&self) -> &CorpusSource {
        &self.source
    }
}

impl SchemaProvider for DefinitionCorpus {
    fn class_rules(&self, name: &str) -> Option<&ClassRule> {
        self.classes.get(name)
    }

    fn is_opaque_container(&self, name: &str) -> bool {
        self.opaque_classes.contains(name)
    }

    fn named_patterns(&self, name: &str) -> Vec<&Pattern> {
        self.patterns.iter().filter(|p| p.name == name).collect()
    }

    fn field_attribute(&self, name: &str) -> Option<&AttributeRule> {
        self.field_attributes.get(name)
    }
}

/// Builder for constructing a [`DefinitionCorpus`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first successful load
/// wins; if all fail, [`CorpusError::NoSourcesAvailable`] is returned.
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    sources: Vec<CorpusSource>,
    verify: bool,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a corpus directory as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(CorpusSource::Directory(path.into()));
        self
    }

    /// Adds a bundle file as a source.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(CorpusSource::Bundle(path.into()));
        self
    }

    /// Verifies directory sources against their manifest before loading.
    pub fn verify_manifest(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Attempts to load from configured sources in order.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::NoSourcesAvailable`] if every source fails.
    pub fn build(self) -> Result<DefinitionCorpus> {
        if self.sources.is_empty() {
            return Err(CorpusError::NoSourcesAvailable);
        }

        for source in &self.sources {
            let result = match source {
                CorpusSource::Directory(path) if self.verify => {
                    DefinitionCorpus::from_dir_verified(path)
                }
                CorpusSource::Directory(path) => DefinitionCorpus::from_dir(path),
                CorpusSource::Bundle(path) => DefinitionCorpus::from_bundle(path),
                CorpusSource::Memory | CorpusSource::Multiple(_) => continue,
            };

            match result {
                Ok(mut corpus) => {
                    corpus.source = CorpusSource::Multiple(self.sources.clone());
                    return Ok(corpus);
                }
                Err(err) => warn!(source = ?source, error = %err, "definition source failed"),
            }
        }

        Err(CorpusError::NoSourcesAvailable)
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    Ok(serde_yaml::from_reader(reader)?)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

fn is_gzip(path: &Path) -> bool {
    path.to_str().is_some_and(|p| p.ends_with(".json.gz"))
}

/// Class files below `dir`, excluding the header and the manifest.
pub(crate) fn collect_class_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_class_files(&path, files)?;
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name == HEADER_FILE || name == MANIFEST_FILE {
            continue;
        }
        if has_extension(&path, "yaml") || has_extension(&path, "yml") || has_extension(&path, "json") {
            files.push(path);
        }
    }
    Ok(())
}
