//! Capability interface over a hierarchical data file.
//!
//! The validator walks a file only through [`TreeProvider`]. A provider
//! classifies every node as a group, a dataset, or a link, and hands out
//! attribute values already normalized to scalars: a value stored as a
//! single-element array is unwrapped and flagged with
//! [`Attribute::from_array`] so the validator can report it.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Kind of a node in the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Group,
    Dataset,
    Link,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => write!(f, "group"),
            Self::Dataset => write!(f, "dataset"),
            Self::Link => write!(f, "link"),
        }
    }
}

/// Storage type of a dataset value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Char,
    Int,
    Uint,
    Float,
    Bool,
    Binary,
}

impl DataType {
    /// Returns `true` for integer and floating-point storage.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Uint | Self::Float)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Char => "char",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Binary => "binary",
        };
        f.write_str(name)
    }
}

/// Scalar attribute value.
///
/// # Examples
///
/// ```
/// use nxvalidate_core::AttrValue;
///
/// assert!(AttrValue::Integer(1).is_signal_one());
/// assert!(AttrValue::Text("1".into()).is_signal_one());
/// assert!(!AttrValue::Text("2".into()).is_signal_one());
/// assert!(AttrValue::Float(1.0).is_signal_one());
/// assert!(!AttrValue::Bool(true).is_signal_one());
/// assert_eq!(AttrValue::Float(0.5).to_string(), "0.5");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    /// Returns the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns `true` for the v1/v2 plot marker: numeric `1` or text `"1"`.
    pub fn is_signal_one(&self) -> bool {
        match self {
            Self::Integer(n) => *n == 1,
            Self::Float(x) => *x == 1.0,
            Self::Text(text) => text == "1",
            Self::Bool(_) => false,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// An attribute as returned by a [`TreeProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub value: AttrValue,
    /// The stored value was a single-element array unwrapped by the provider.
    pub from_array: bool,
}

impl Attribute {
    pub fn scalar(value: AttrValue) -> Self {
        Self {
            value,
            from_array: false,
        }
    }
}

/// Read access to an opened data file.
///
/// Addresses are absolute, `/`-separated paths; the root is `/`.
pub trait TreeProvider {
    /// Cheap handle to one node of the file.
    type Node: Copy + fmt::Debug;

    /// Returns the file root group.
    fn root(&self) -> Self::Node;

    /// Returns the absolute address of `node`.
    fn path(&self, node: Self::Node) -> String;

    /// Classifies `node`.
    fn node_kind(&self, node: Self::Node) -> NodeKind;

    /// Returns the children of a group in the storage library's native order.
    fn children(&self, node: Self::Node) -> Vec<(String, Self::Node)>;

    /// Returns the names of the attributes stored on `node`.
    fn attribute_names(&self, node: Self::Node) -> Vec<String>;

    /// Reads one attribute.
    fn attribute(&self, node: Self::Node, name: &str) -> Option<Attribute>;

    /// Resolves an absolute address to a node.
    fn resolve(&self, address: &str) -> Option<Self::Node>;

    /// Returns the storage type of a dataset.
    fn data_type(&self, node: Self::Node) -> Option<DataType>;

    /// Returns the value of a dataset rendered as text (first element for arrays).
    fn text_value(&self, node: Self::Node) -> Option<String>;

    /// Returns the child of `node` named `name`.
    fn child(&self, node: Self::Node, name: &str) -> Option<Self::Node> {
        self.children(node)
            .into_iter()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, child)| child)
    }
}

/// A [`TreeProvider`] that can open a file by path.
pub trait OpenTree: TreeProvider + Sized {
    type Error: std::error::Error;

    fn open(path: &Path) -> Result<Self, Self::Error>;
}

/// Joins a child name onto a group address.
///
/// # Examples
///
/// ```
/// use nxvalidate_core::join_address;
///
/// assert_eq!(join_address("/", "entry"), "/entry");
/// assert_eq!(join_address("/entry", "data"), "/entry/data");
/// ```
pub fn join_address(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Returns the last segment of an address, with any `@attribute` suffix
/// taking precedence.
///
/// # Examples
///
/// ```
/// use nxvalidate_core::short_name;
///
/// assert_eq!(short_name("/entry/user"), "user");
/// assert_eq!(short_name("/entry/data01/data@signal"), "signal");
/// assert_eq!(short_name("/"), "");
/// ```
pub fn short_name(address: &str) -> &str {
    let last = address.rsplit('/').next().unwrap_or(address);
    last.rsplit('@').next().unwrap_or(last)
}
