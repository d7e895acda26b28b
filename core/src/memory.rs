//! In-memory [`TreeProvider`] built from a tree document.
//!
//! A tree document describes a data file as nested JSON or YAML:
//!
//! ```yaml
//! attributes:
//!   default: entry
//! children:
//!   entry:
//!     kind: group
//!     attributes: { NX_class: NXentry, default: data }
//!     children:
//!       data:
//!         kind: group
//!         attributes: { NX_class: NXdata, signal: counts }
//!         children:
//!           counts: { kind: dataset, type: int, value: [1, 5, 3], attributes: { units: counts } }
//!       counts_link:
//!         kind: link
//!         attributes: { target: /entry/data/counts }
//! ```
//!
//! Children are kept in name order. Attribute values may be scalars or
//! arrays; arrays are unwrapped to their first element and flagged.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::tree::{
    AttrValue, Attribute, DataType, NodeKind, OpenTree, TreeProvider, join_address,
};

/// Errors raised while reading a tree document.
#[derive(Debug, Error)]
pub enum TreeDocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Attribute value as written in a document.
///
/// A `null` value is read as an absent attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeDocument {
    Null,
    Scalar(AttrValue),
    Array(Vec<AttrValue>),
}

impl AttributeDocument {
    fn normalize(self) -> Option<Attribute> {
        match self {
            Self::Null => None,
            Self::Scalar(value) => Some(Attribute::scalar(value)),
            Self::Array(values) => values.into_iter().next().map(|value| Attribute {
                value,
                from_array: true,
            }),
        }
    }
}

/// Root of a tree document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeDocument {
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDocument>,
    #[serde(default)]
    pub children: BTreeMap<String, NodeDocument>,
}

/// One non-root node of a tree document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeDocument {
    Group {
        #[serde(default)]
        attributes: BTreeMap<String, AttributeDocument>,
        #[serde(default)]
        children: BTreeMap<String, NodeDocument>,
    },
    Dataset {
        #[serde(default, rename = "type")]
        data_type: Option<DataType>,
        #[serde(default)]
        value: Option<Value>,
        #[serde(default)]
        attributes: BTreeMap<String, AttributeDocument>,
    },
    Link {
        #[serde(default)]
        attributes: BTreeMap<String, AttributeDocument>,
    },
}

/// Handle to a node of a [`MemoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct MemoryNode {
    path: String,
    kind: NodeKind,
    attributes: BTreeMap<String, Attribute>,
    children: Vec<(String, NodeId)>,
    data_type: Option<DataType>,
    value: Option<Value>,
}

/// Arena-backed data file held entirely in memory.
///
/// # Examples
///
/// ```
/// use nxvalidate_core::{MemoryTree, NodeKind, TreeProvider};
///
/// let tree = MemoryTree::from_json(serde_json::json!({
///     "children": {
///         "entry": { "kind": "group", "attributes": { "NX_class": "NXentry" } }
///     }
/// }))
/// .unwrap();
///
/// let entry = tree.resolve("/entry").unwrap();
/// assert_eq!(tree.node_kind(entry), NodeKind::Group);
/// assert_eq!(tree.path(entry), "/entry");
/// ```
#[derive(Debug)]
pub struct MemoryTree {
    nodes: Vec<MemoryNode>,
    index: HashMap<String, NodeId>,
}

impl MemoryTree {
    /// Builds a tree from a parsed document.
    pub fn from_document(document: TreeDocument) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        };
        let root = tree.push(MemoryNode {
            path: "/".to_string(),
            kind: NodeKind::Group,
            attributes: normalize_attributes(document.attributes),
            children: Vec::new(),
            data_type: None,
            value: None,
        });
        tree.insert_children(root, document.children);
        tree
    }

    /// Builds a tree from a JSON value shaped like a [`TreeDocument`].
    pub fn from_json(value: Value) -> Result<Self, TreeDocumentError> {
        let document: TreeDocument = serde_json::from_value(value)?;
        Ok(Self::from_document(document))
    }

    /// Parses a YAML tree document.
    pub fn from_yaml_str(raw: &str) -> Result<Self, TreeDocumentError> {
        let document: TreeDocument = serde_yaml::from_str(raw)?;
        Ok(Self::from_document(document))
    }

    /// Returns the number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds its root, so it is never empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: MemoryNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.index.insert(node.path.clone(), id);
        self.nodes.push(node);
        id
    }

    fn insert_children(&mut self, parent: NodeId, children: BTreeMap<String, NodeDocument>) {
        for (name, child) in children {
            let path = join_address(&self.nodes[parent.0].path, &name);
            let id = match child {
                NodeDocument::Group {
                    attributes,
                    children,
                } => {
                    let id = self.push(MemoryNode {
                        path,
                        kind: NodeKind::Group,
                        attributes: normalize_attributes(attributes),
                        children: Vec::new(),
                        data_type: None,
                        value: None,
                    });
                    self.insert_children(id, children);
                    id
                }
                NodeDocument::Dataset {
                    data_type,
                    value,
                    attributes,
                } => {
                    let data_type = data_type
                        .or_else(|| value.as_ref().and_then(infer_data_type))
                        .unwrap_or_default();
                    self.push(MemoryNode {
                        path,
                        kind: NodeKind::Dataset,
                        attributes: normalize_attributes(attributes),
                        children: Vec::new(),
                        data_type: Some(data_type),
                        value,
                    })
                }
                NodeDocument::Link { attributes } => self.push(MemoryNode {
                    path,
                    kind: NodeKind::Link,
                    attributes: normalize_attributes(attributes),
                    children: Vec::new(),
                    data_type: None,
                    value: None,
                }),
            };
            self.nodes[parent.0].children.push((name, id));
        }
    }

    fn node(&self, id: NodeId) -> &MemoryNode {
        &self.nodes[id.0]
    }
}

fn normalize_attributes(
    attributes: BTreeMap<String, AttributeDocument>,
) -> BTreeMap<String, Attribute> {
    attributes
        .into_iter()
        .filter_map(|(name, doc)| doc.normalize().map(|attr| (name, attr)))
        .collect()
}

fn infer_data_type(value: &Value) -> Option<DataType> {
    match value {
        Value::String(_) => Some(DataType::Char),
        Value::Bool(_) => Some(DataType::Bool),
        Value::Number(n) if n.is_u64() => Some(DataType::Uint),
        Value::Number(n) if n.is_i64() => Some(DataType::Int),
        Value::Number(_) => Some(DataType::Float),
        Value::Array(items) => items.first().and_then(infer_data_type),
        _ => None,
    }
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => items.first().and_then(first_text),
        _ => None,
    }
}

impl TreeProvider for MemoryTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn path(&self, node: NodeId) -> String {
        self.node(node).path.clone()
    }

    fn node_kind(&self, node: NodeId) -> NodeKind {
        self.node(node).kind
    }

    fn children(&self, node: NodeId) -> Vec<(String, NodeId)> {
        self.node(node).children.clone()
    }

    fn attribute_names(&self, node: NodeId) -> Vec<String> {
        self.node(node).attributes.keys().cloned().collect()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<Attribute> {
        self.node(node).attributes.get(name).cloned()
    }

    fn resolve(&self, address: &str) -> Option<NodeId> {
        if address.is_empty() {
            return None;
        }
        let trimmed = address.trim_end_matches('/');
        let key = if trimmed.is_empty() { "/" } else { trimmed };
        self.index.get(key).copied()
    }

    fn data_type(&self, node: NodeId) -> Option<DataType> {
        self.node(node).data_type
    }

    fn text_value(&self, node: NodeId) -> Option<String> {
        self.node(node).value.as_ref().and_then(first_text)
    }

    fn child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.node(node)
            .children
            .iter()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, id)| *id)
    }
}

impl OpenTree for MemoryTree {
    type Error = TreeDocumentError;

    /// Reads a tree document; `.yaml`/`.yml` files are parsed as YAML,
    /// anything else as JSON.
    fn open(path: &Path) -> Result<Self, TreeDocumentError> {
        let raw = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let document: TreeDocument = if is_yaml {
            serde_yaml::from_str(&raw)?
        } else {
            serde_json::from_str(&raw)?
        };
        Ok(Self::from_document(document))
    }
}
