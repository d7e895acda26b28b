//! Rule type definitions for NeXus definition classes.
//!
//! These types are the in-memory form of a definition corpus (the NXDL base
//! classes and application definitions). They are produced by a loader and
//! consumed read-only by the validator. Field names follow the corpus
//! spelling (`minOccurs`, `NX_class`, `ignoreExtraFields`, ...) so a corpus
//! file can be deserialized directly with [`serde`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Version of the definition-bundle contract (semver).
///
/// Embedded in every [`DefinitionBundle`](crate::DefinitionBundle) to track
/// compatibility of corpus files.
pub const DEFINITION_CONTRACT_VERSION: &str = "1.0.0";

/// Attribute that marks an HDF5 group as a member of the NeXus class system.
pub const CLASS_ATTRIBUTE: &str = "NX_class";

/// Class assumed for a file root that carries no [`CLASS_ATTRIBUTE`].
pub const ROOT_CLASS: &str = "NXroot";

/// Classes whose groups may carry an application `definition` field.
pub const ENTRY_CLASSES: [&str; 2] = ["NXentry", "NXsubentry"];

/// Class of the group holding plottable data.
pub const DATA_CLASS: &str = "NXdata";

/// Kind of definition a class file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassCategory {
    /// Base class (the default).
    #[default]
    BaseClass,
    /// Application definition layered over `NXentry`/`NXsubentry`.
    Application,
    /// Contributed definition, not yet ratified.
    Contributed,
}

/// NeXus data type tag for fields and attributes.
///
/// # Examples
///
/// ```
/// use nxvalidate_core::NxType;
///
/// assert!(NxType::Float.is_numeric());
/// assert!(!NxType::Char.is_numeric());
/// assert_eq!(NxType::default(), NxType::Char);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NxType {
    #[default]
    #[serde(rename = "NX_CHAR")]
    Char,
    #[serde(rename = "NX_INT")]
    Int,
    #[serde(rename = "NX_UINT")]
    UInt,
    #[serde(rename = "NX_POSINT")]
    PosInt,
    #[serde(rename = "NX_FLOAT")]
    Float,
    #[serde(rename = "NX_NUMBER")]
    Number,
    #[serde(rename = "NX_BINARY")]
    Binary,
    #[serde(rename = "NX_BOOLEAN")]
    Boolean,
    #[serde(rename = "NX_DATE_TIME")]
    DateTime,
    #[serde(rename = "ISO8601")]
    Iso8601,
}

impl NxType {
    /// Returns `true` for the integer, float, and number family.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Int | Self::UInt | Self::PosInt | Self::Float | Self::Number
        )
    }
}

/// Whether the name of a schema item is fixed or free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NameType {
    /// The item must use exactly the declared name (the default).
    #[default]
    Specified,
    /// Any valid item name may be used.
    Any,
}

/// Upper occurrence bound of a field or group.
///
/// Serialized as an integer, or as the keyword `"unbounded"`.
///
/// # Examples
///
/// ```
/// use nxvalidate_core::MaxOccurs;
///
/// let bound: MaxOccurs = serde_json::from_str("\"unbounded\"").unwrap();
/// assert_eq!(bound, MaxOccurs::Unbounded);
/// let bound: MaxOccurs = serde_json::from_str("3").unwrap();
/// assert!(bound.allows(3));
/// assert!(!bound.allows(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MaxOccursRepr", into = "MaxOccursRepr")]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl Default for MaxOccurs {
    fn default() -> Self {
        Self::Bounded(1)
    }
}

impl MaxOccurs {
    /// Returns `true` if `count` occurrences are within this bound.
    pub fn allows(self, count: u32) -> bool {
        match self {
            Self::Bounded(max) => count <= max,
            Self::Unbounded => true,
        }
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(max) => write!(f, "{max}"),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum MaxOccursRepr {
    Count(u32),
    Keyword(String),
}

impl TryFrom<MaxOccursRepr> for MaxOccurs {
    type Error = String;

    fn try_from(repr: MaxOccursRepr) -> Result<Self, Self::Error> {
        match repr {
            MaxOccursRepr::Count(n) => Ok(Self::Bounded(n)),
            MaxOccursRepr::Keyword(word) if word == "unbounded" => Ok(Self::Unbounded),
            MaxOccursRepr::Keyword(word) => word
                .parse::<u32>()
                .map(Self::Bounded)
                .map_err(|_| format!("invalid maxOccurs: {word}")),
        }
    }
}

impl From<MaxOccurs> for MaxOccursRepr {
    fn from(bound: MaxOccurs) -> Self {
        match bound {
            MaxOccurs::Bounded(n) => Self::Count(n),
            MaxOccurs::Unbounded => Self::Keyword("unbounded".to_string()),
        }
    }
}

/// Rule for an attribute that may appear on a field.
///
/// A non-empty `enum` restricts the attribute to the listed values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRule {
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enumeration: Vec<String>,
    #[serde(default, rename = "type")]
    pub nx_type: NxType,
}

impl AttributeRule {
    /// Creates a rule restricted to the given values.
    pub fn enumerated<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enumeration: values.into_iter().map(Into::into).collect(),
            nx_type: NxType::Char,
        }
    }

    /// Returns `true` if `value` is allowed by this rule.
    ///
    /// A rule without an enumeration allows every value.
    pub fn allows(&self, value: &str) -> bool {
        self.enumeration.is_empty() || self.enumeration.iter().any(|v| v == value)
    }
}

/// Rule for a field (HDF5 dataset) declared by a class.
///
/// # Examples
///
/// ```
/// use nxvalidate_core::{FieldRule, NxType};
///
/// let rule = FieldRule::required(NxType::Float).with_enum(["a", "b"]);
/// assert_eq!(rule.min_occurs, 1);
/// assert!(rule.is_required_by_name());
/// assert_eq!(rule.enumeration, vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    #[serde(default)]
    pub min_occurs: u32,
    #[serde(default)]
    pub max_occurs: MaxOccurs,
    #[serde(default)]
    pub name_type: NameType,
    #[serde(default, rename = "type")]
    pub nx_type: NxType,
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enumeration: Vec<String>,
    /// Attribute rules specific to this field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeRule>,
}

impl FieldRule {
    /// Creates an optional field rule of the given type.
    pub fn optional(nx_type: NxType) -> Self {
        Self {
            nx_type,
            ..Default::default()
        }
    }

    /// Creates a field rule with `minOccurs = 1`.
    pub fn required(nx_type: NxType) -> Self {
        Self {
            min_occurs: 1,
            nx_type,
            ..Default::default()
        }
    }

    /// Restricts the field value to an enumeration.
    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enumeration = values.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an attribute rule specific to this field.
    pub fn with_attribute(mut self, name: &str, rule: AttributeRule) -> Self {
        self.attributes.insert(name.to_string(), rule);
        self
    }

    /// Returns `true` if a field with exactly this name must be present.
    pub fn is_required_by_name(&self) -> bool {
        self.min_occurs > 0 && self.name_type == NameType::Specified
    }
}

/// Rule for a subgroup declared by a class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRule {
    #[serde(rename = "NX_class")]
    pub nx_class: String,
    /// Exact child name, when the rule names the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub min_occurs: u32,
    #[serde(default)]
    pub max_occurs: MaxOccurs,
    #[serde(default)]
    pub name_type: NameType,
}

impl GroupRule {
    /// Creates a rule for anonymously named groups of `nx_class`.
    pub fn of_class(nx_class: &str) -> Self {
        Self {
            nx_class: nx_class.to_string(),
            max_occurs: MaxOccurs::Unbounded,
            name_type: NameType::Any,
            ..Default::default()
        }
    }

    /// Requires a specific child name.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self.name_type = NameType::Specified;
        self
    }

    /// Sets the minimum number of occurrences.
    pub fn with_min_occurs(mut self, min_occurs: u32) -> Self {
        self.min_occurs = min_occurs;
        self
    }
}

/// Class-level flags controlling tolerance of undeclared content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDefaults {
    #[serde(default)]
    pub ignore_extra_attributes: bool,
    #[serde(default)]
    pub ignore_extra_fields: bool,
    #[serde(default)]
    pub ignore_extra_groups: bool,
}

impl ClassDefaults {
    /// Returns the names of the flags that are set, in corpus spelling.
    pub fn enabled_flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.ignore_extra_attributes {
            flags.push("ignoreExtraAttributes");
        }
        if self.ignore_extra_fields {
            flags.push("ignoreExtraFields");
        }
        if self.ignore_extra_groups {
            flags.push("ignoreExtraGroups");
        }
        flags
    }
}

/// Rules declared by one NeXus class (base class or application definition).
///
/// # Examples
///
/// ```
/// use nxvalidate_core::*;
///
/// let entry = ClassRule::new("NXentry")
///     .with_field("title", FieldRule::optional(NxType::Char))
///     .with_group("data", GroupRule::of_class("NXdata").with_min_occurs(1));
///
/// assert_eq!(entry.name, "NXentry");
/// assert!(entry.fields.contains_key("title"));
/// assert_eq!(entry.groups["data"].nx_class, "NXdata");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRule {
    pub name: String,
    #[serde(default)]
    pub category: ClassCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default)]
    pub defaults: ClassDefaults,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldRule>,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupRule>,
}

impl ClassRule {
    /// Creates an empty base-class rule.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Adds a field rule.
    pub fn with_field(mut self, name: &str, rule: FieldRule) -> Self {
        self.fields.insert(name.to_string(), rule);
        self
    }

    /// Adds a group rule keyed by `key`.
    pub fn with_group(mut self, key: &str, rule: GroupRule) -> Self {
        self.groups.insert(key.to_string(), rule);
        self
    }

    /// Replaces the class defaults.
    pub fn with_defaults(mut self, defaults: ClassDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Tier of a naming pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PatternTier {
    Strict,
    Relaxed,
    #[default]
    Custom,
}

/// Named regular expression supplied by the definition corpus.
///
/// The expression is matched against the full string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub regex: String,
    #[serde(default)]
    pub tier: PatternTier,
}

impl Pattern {
    pub fn new(name: &str, regex: &str, tier: PatternTier) -> Self {
        Self {
            name: name.to_string(),
            regex: regex.to_string(),
            tier,
        }
    }
}
