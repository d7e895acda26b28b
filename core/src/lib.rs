//! Validation engine for NeXus hierarchical data files.
//!
//! A data file is a tree of groups, datasets, links and attributes. This
//! crate checks such a tree against a NeXus definition corpus:
//!
//! - [`PatternMatcher`] classifies every item name into a conformance tier
//!   using the corpus's naming patterns.
//! - The tree walker visits every group, dataset and link, recognizes
//!   classes, checks enumerated attribute values, units, and link targets.
//! - The cross-validator checks that fields and groups a class requires are
//!   present.
//! - The default-plot resolver finds the data to plot under the v3
//!   (with niac2014 `@default` chains), v2, and v1 conventions.
//! - [`FindingsLedger`] collects every outcome as a de-duplicated
//!   [`Finding`] with a [`StatusKind`].
//!
//! The corpus is consumed through [`SchemaProvider`] and the data file
//! through [`TreeProvider`]. [`DefinitionBundle`] and [`MemoryTree`] are
//! the in-crate implementations; `nxvalidate-db` adds an indexed corpus
//! loaded from disk.
//!
//! # Example
//!
//! ```
//! use nxvalidate_core::*;
//!
//! let mut corpus = DefinitionBundle::new("example");
//! corpus.patterns = vec![
//!     Pattern::new("validItemName", "[A-Za-z_][A-Za-z0-9_]*", PatternTier::Relaxed),
//!     Pattern::new("validNXClassName", "NX[a-z_]+", PatternTier::Custom),
//!     Pattern::new("validTargetName", "(/[A-Za-z_][A-Za-z0-9_]*)+", PatternTier::Custom),
//! ];
//! corpus.classes.push(
//!     ClassRule::new("NXentry").with_field("title", FieldRule::required(NxType::Char)),
//! );
//!
//! let tree = MemoryTree::from_json(serde_json::json!({
//!     "children": {
//!         "entry": { "kind": "group", "attributes": { "NX_class": "NXentry" } }
//!     }
//! }))
//! .unwrap();
//!
//! let mut validator = Validator::new(tree, &corpus).unwrap();
//! validator.validate();
//!
//! let missing = validator
//!     .findings()
//!     .iter()
//!     .find(|f| f.address == "/entry/title")
//!     .unwrap();
//! assert_eq!(missing.status, StatusKind::Warn);
//! assert_eq!(missing.comment, "title not found");
//! ```

mod crossval;
mod error;
mod finding;
mod ledger;
mod memory;
mod package;
mod pattern;
mod plot;
mod schema;
mod session;
mod tree;
mod types;
mod walker;

pub use error::{Result, ValidatorError};
pub use finding::{AddressRecord, Finding, SHOW_ALL, SHOW_ERRORS, SHOW_NOT_OK, StatusKind};
pub use ledger::{FindingsLedger, Summary};
pub use memory::{AttributeDocument, MemoryTree, NodeDocument, NodeId, TreeDocument, TreeDocumentError};
pub use package::DefinitionBundle;
pub use pattern::{
    CompiledPattern, NameTier, PatternMatcher, REQUIRED_PATTERNS, VALID_ITEM_NAME,
    VALID_ITEM_NAME_STRICT, VALID_NX_CLASS_NAME, VALID_TARGET_NAME,
};
pub use plot::{PlotCandidates, PlotResolution, PlotVersion};
pub use schema::SchemaProvider;
pub use session::Validator;
pub use tree::{
    AttrValue, Attribute, DataType, NodeKind, OpenTree, TreeProvider, join_address, short_name,
};
pub use types::*;
