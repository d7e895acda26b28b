use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AttributeRule, ClassRule, Pattern, SchemaProvider};

/// Serializable definition corpus used for distribution and testing.
///
/// A bundle groups the naming patterns, the corpus-wide field attribute
/// rules, the opaque container classes, and every [`ClassRule`] into a single
/// document. Lookups are linear, which is fine for corpora of a few hundred
/// classes; the `nxvalidate-db` crate indexes them for repeated use.
///
/// # Examples
///
/// ```
/// use nxvalidate_core::*;
///
/// let mut bundle = DefinitionBundle::new("v2016.1");
/// bundle.classes.push(ClassRule::new("NXentry"));
/// bundle.opaque_classes.push("NXcollection".into());
///
/// assert_eq!(bundle.class_count(), 1);
/// assert!(bundle.is_known_class("NXentry"));
/// assert!(bundle.is_opaque_container("NXcollection"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionBundle {
    /// Bundle contract version (populated from
    /// [`DEFINITION_CONTRACT_VERSION`](crate::DEFINITION_CONTRACT_VERSION)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Version of the definitions themselves (e.g. a release tag).
    pub version: String,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub field_attributes: BTreeMap<String, AttributeRule>,
    #[serde(default)]
    pub opaque_classes: Vec<String>,
    #[serde(default)]
    pub classes: Vec<ClassRule>,
}

impl DefinitionBundle {
    /// Creates an empty bundle.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            schema_version: Some(crate::DEFINITION_CONTRACT_VERSION.to_string()),
            version: version.into(),
            patterns: Vec::new(),
            field_attributes: BTreeMap::new(),
            opaque_classes: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Returns the number of classes in this bundle.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

impl SchemaProvider for DefinitionBundle {
    fn class_rules(&self, name: &str) -> Option<&ClassRule> {
        self.classes.iter().find(|c| c.name == name)
    }

    fn is_opaque_container(&self, name: &str) -> bool {
        self.opaque_classes.iter().any(|c| c == name)
    }

    fn named_patterns(&self, name: &str) -> Vec<&Pattern> {
        self.patterns.iter().filter(|p| p.name == name).collect()
    }

    fn field_attribute(&self, name: &str) -> Option<&AttributeRule> {
        self.field_attributes.get(name)
    }
}
