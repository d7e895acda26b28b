//! Validation session.
//!
//! A [`Validator`] owns one opened data file and the findings ledger for
//! it, and borrows the definition corpus read-only. Running
//! [`Validator::validate`] walks the whole tree first and then resolves the
//! default plot over the same open tree; both phases write into the same
//! ledger.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, ValidatorError};
use crate::ledger::FindingsLedger;
use crate::pattern::PatternMatcher;
use crate::plot::PlotResolution;
use crate::tree::{Attribute, OpenTree, TreeProvider};
use crate::{CLASS_ATTRIBUTE, Finding, ROOT_CLASS, SchemaProvider, StatusKind};

/// Validates one data file against a definition corpus.
///
/// # Examples
///
/// ```
/// use nxvalidate_core::*;
///
/// let mut corpus = DefinitionBundle::new("test");
/// corpus.patterns = vec![
///     Pattern::new("validItemName", "[A-Za-z_][A-Za-z0-9_]*", PatternTier::Relaxed),
///     Pattern::new("validNXClassName", "NX[a-z_]+", PatternTier::Custom),
///     Pattern::new("validTargetName", "(/[A-Za-z_][A-Za-z0-9_]*)+", PatternTier::Custom),
/// ];
/// corpus.classes.push(ClassRule::new("NXentry"));
/// corpus.classes.push(ClassRule::new("NXdata"));
///
/// let tree = MemoryTree::from_json(serde_json::json!({
///     "children": {
///         "entry": {
///             "kind": "group",
///             "attributes": { "NX_class": "NXentry" },
///             "children": {
///                 "data": {
///                     "kind": "group",
///                     "attributes": { "NX_class": "NXdata", "signal": "counts" },
///                     "children": { "counts": { "kind": "dataset", "value": [3, 1, 4] } }
///                 }
///             }
///         }
///     }
/// }))
/// .unwrap();
///
/// let mut validator = Validator::new(tree, &corpus).unwrap();
/// let plot = validator.validate();
///
/// assert_eq!(plot.address(), Some("/entry/data/counts"));
/// assert_eq!(validator.ledger().count(StatusKind::Error), 0);
/// ```
#[derive(Debug)]
pub struct Validator<'s, T: TreeProvider, S: SchemaProvider + ?Sized> {
    pub(crate) tree: T,
    pub(crate) schema: &'s S,
    pub(crate) patterns: PatternMatcher,
    pub(crate) ledger: FindingsLedger,
    path: Option<PathBuf>,
    default_plot: Option<PlotResolution>,
}

impl<'s, T: OpenTree, S: SchemaProvider + ?Sized> Validator<'s, T, S> {
    /// Opens the data file at `path` and prepares a session.
    ///
    /// # Errors
    ///
    /// - [`ValidatorError::FileNotFound`] if `path` does not exist.
    /// - [`ValidatorError::OpenFailure`] if the provider cannot open it.
    /// - Pattern errors from [`PatternMatcher::from_schema`].
    pub fn open(path: impl AsRef<Path>, schema: &'s S) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ValidatorError::FileNotFound(path.to_path_buf()));
        }
        let tree = T::open(path).map_err(|err| ValidatorError::OpenFailure {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let mut validator = Self::new(tree, schema)?;
        validator.path = Some(path.to_path_buf());
        Ok(validator)
    }
}

impl<'s, T: TreeProvider, S: SchemaProvider + ?Sized> Validator<'s, T, S> {
    /// Prepares a session for an already opened tree.
    ///
    /// # Errors
    ///
    /// Fails when the corpus does not provide the required naming patterns.
    pub fn new(tree: T, schema: &'s S) -> Result<Self> {
        let patterns = PatternMatcher::from_schema(schema)?;
        Ok(Self {
            tree,
            schema,
            patterns,
            ledger: FindingsLedger::new(),
            path: None,
            default_plot: None,
        })
    }

    /// Walks the whole file, then resolves its default plot.
    pub fn validate(&mut self) -> PlotResolution {
        info!(file = %self.file_label(), "validating");
        let root = self.tree.root();
        self.validate_group(root);

        let plot = self.validate_default_plot();
        info!(
            file = %self.file_label(),
            findings = self.ledger.len(),
            errors = self.ledger.count(StatusKind::Error),
            "validation finished"
        );
        self.default_plot = Some(plot.clone());
        plot
    }

    pub fn ledger(&self) -> &FindingsLedger {
        &self.ledger
    }

    pub fn findings(&self) -> &[Finding] {
        self.ledger.findings()
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn schema(&self) -> &S {
        self.schema
    }

    /// Path of the data file, when the session opened it.
    pub fn file_name(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Outcome of the last [`validate`](Self::validate) run.
    pub fn default_plot(&self) -> Option<&PlotResolution> {
        self.default_plot.as_ref()
    }

    /// Consumes the session, keeping only its findings.
    pub fn into_ledger(self) -> FindingsLedger {
        self.ledger
    }

    pub(crate) fn record(&mut self, test_name: &str, address: &str, status: StatusKind, comment: &str) {
        if self
            .ledger
            .record(&self.tree, test_name, address, status, comment)
        {
            debug!(%address, test = test_name, %status, "finding");
        }
    }

    /// Reads an attribute. In report mode an unwrapped array value is noted.
    pub(crate) fn read_attribute(&mut self, node: T::Node, name: &str, report: bool) -> Option<Attribute> {
        let attribute = self.tree.attribute(node, name)?;
        if report && attribute.from_array {
            let address = format!("{}@{name}", self.tree.path(node));
            let comment = format!("[variable length string]: {}", attribute.value);
            self.record("attribute data type", &address, StatusKind::Note, &comment);
        }
        Some(attribute)
    }

    /// Class of a group; the root is `NXroot` when it carries none.
    pub(crate) fn group_class(&self, group: T::Node) -> Option<String> {
        match self.tree.attribute(group, CLASS_ATTRIBUTE) {
            Some(attribute) => Some(attribute.value.to_string()),
            None if self.tree.path(group) == "/" => Some(ROOT_CLASS.to_string()),
            None => None,
        }
    }

    fn file_label(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string())
    }
}
