//! Read-only view of a definition corpus.
//!
//! The validator never loads definitions itself; it consumes any type that
//! implements [`SchemaProvider`]. [`DefinitionBundle`](crate::DefinitionBundle)
//! implements it directly, and the `nxvalidate-db` crate provides an indexed
//! corpus loaded from disk.

use crate::{AttributeRule, ClassRule, Pattern};

/// Lookup surface of a definition corpus.
pub trait SchemaProvider {
    /// Returns the rules of class `name`, if the corpus defines it.
    fn class_rules(&self, name: &str) -> Option<&ClassRule>;

    /// Returns `true` if groups of class `name` are opaque containers whose
    /// content is not validated (e.g. `NXcollection`).
    fn is_opaque_container(&self, name: &str) -> bool;

    /// Returns every pattern definition registered under `name`.
    ///
    /// A well-formed corpus has exactly one definition per pattern name; the
    /// caller decides how to treat zero or several.
    fn named_patterns(&self, name: &str) -> Vec<&Pattern>;

    /// Returns the corpus-wide rule for a field attribute named `name`.
    fn field_attribute(&self, name: &str) -> Option<&AttributeRule>;

    /// Returns `true` if the corpus defines class `name`.
    fn is_known_class(&self, name: &str) -> bool {
        self.class_rules(name).is_some()
    }
}
