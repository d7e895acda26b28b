//! Validator configuration file.
//!
//! Defines the YAML-serializable configuration that selects the definition
//! corpus and the shape of validation reports. Command-line flags override
//! every value.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! corpus:
//!   dir: definitions
//!   bundle: definitions.json.gz
//!   verify_manifest: true
//! report:
//!   show: not-ok
//!   format: markdown
//!   summary: true
//!   classpath: false
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use nxvalidate_core::{SHOW_ALL, SHOW_ERRORS, SHOW_NOT_OK, StatusKind};

use crate::error::Result;

/// Where to load the definition corpus from.
///
/// When both are set the directory is tried first and the bundle is the
/// fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<PathBuf>,
    /// Check the directory against its `manifest.json` before loading.
    #[serde(default)]
    pub verify_manifest: bool,
}

/// Status filter preset for the findings table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShowPreset {
    All,
    #[default]
    NotOk,
    Errors,
}

impl ShowPreset {
    /// Returns the statuses this preset lets through.
    ///
    /// # Examples
    ///
    /// ```
    /// use nxvalidate_core::StatusKind;
    /// use nxvalidate_db::ShowPreset;
    ///
    /// assert_eq!(ShowPreset::All.statuses().len(), 7);
    /// assert!(ShowPreset::Errors.statuses().contains(&StatusKind::Todo));
    /// assert!(!ShowPreset::NotOk.statuses().contains(&StatusKind::Note));
    /// ```
    pub fn statuses(self) -> &'static [StatusKind] {
        match self {
            Self::All => SHOW_ALL,
            Self::NotOk => SHOW_NOT_OK,
            Self::Errors => SHOW_ERRORS,
        }
    }
}

/// Rendering format of a validation report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Table,
    Markdown,
    Json,
    Yaml,
}

/// Report settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub show: ShowPreset,
    #[serde(default)]
    pub format: ReportFormat,
    /// Append the per-status summary table.
    #[serde(default = "default_true")]
    pub summary: bool,
    /// Append the address to classpath table.
    #[serde(default)]
    pub classpath: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            show: ShowPreset::default(),
            format: ReportFormat::default(),
            summary: true,
            classpath: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Top-level validator configuration.
///
/// Loaded from a YAML file (typically `nxvalidate.yml` next to the data) to
/// fix the corpus and report settings of repeated runs.
///
/// # Examples
///
/// ```
/// use nxvalidate_db::{ReportFormat, ShowPreset, ValidatorConfig};
///
/// let config: ValidatorConfig = serde_yaml::from_str("version: \"1.0\"\n").unwrap();
/// assert_eq!(config.report.show, ShowPreset::NotOk);
/// assert_eq!(config.report.format, ReportFormat::Table);
/// assert!(config.report.summary);
/// assert!(config.corpus.dir.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            corpus: CorpusConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl ValidatorConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::CorpusError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::CorpusError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::CorpusError::Io) if the file cannot be written,
    /// or [`Yaml`](crate::CorpusError::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Resolves relative corpus paths against `base` (the directory holding
    /// the configuration file).
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.corpus.dir, &mut self.corpus.bundle]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
