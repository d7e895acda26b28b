//! Findings ledger.
//!
//! The ledger is the single sink for validation outcomes. It records each
//! `(address, test_name)` pair at most once, keeps findings in run order,
//! and groups them per address together with the address's classpath: the
//! path expressed as NeXus classes (`/NXentry/NXdata/field@signal`) instead
//! of node names.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::tree::{NodeKind, TreeProvider};
use crate::{AddressRecord, CLASS_ATTRIBUTE, Finding, StatusKind};

/// Placeholder classpath segment for a group without a class.
const UNCLASSED_SEGMENT: &str = "-";

/// Count of findings per status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// One entry per status, in status order, zeros included.
    pub counts: Vec<(StatusKind, usize)>,
    pub total: usize,
}

impl Summary {
    /// Returns the count for one status.
    pub fn count(&self, status: StatusKind) -> usize {
        self.counts
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Append-only, de-duplicating store of findings.
///
/// # Examples
///
/// ```
/// use nxvalidate_core::{FindingsLedger, MemoryTree, StatusKind};
///
/// let tree = MemoryTree::from_json(serde_json::json!({})).unwrap();
/// let mut ledger = FindingsLedger::new();
///
/// assert!(ledger.record(&tree, "check", "/", StatusKind::Ok, "first"));
/// assert!(!ledger.record(&tree, "check", "/", StatusKind::Error, "second"));
/// assert_eq!(ledger.findings().len(), 1);
/// assert_eq!(ledger.findings()[0].comment, "first");
/// ```
#[derive(Debug, Default)]
pub struct FindingsLedger {
    findings: Vec<Finding>,
    seen: HashSet<String>,
    records: Vec<AddressRecord>,
    record_index: HashMap<String, usize>,
}

impl FindingsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finding unless the same `(address, test_name)` pair was
    /// already recorded. Returns `true` when the finding was added.
    ///
    /// The first finding at a new address also derives that address's
    /// classpath from the live tree.
    pub fn record<T: TreeProvider>(
        &mut self,
        tree: &T,
        test_name: &str,
        address: &str,
        status: StatusKind,
        comment: &str,
    ) -> bool {
        let unique_key = format!("{address}:{test_name}");
        if !self.seen.insert(unique_key) {
            return false;
        }

        let finding = Finding::new(test_name, address, status, comment);
        self.findings.push(finding.clone());

        let slot = match self.record_index.get(address) {
            Some(slot) => *slot,
            None => {
                let slot = self.records.len();
                self.records.push(AddressRecord {
                    address: address.to_string(),
                    classpath: reconstruct_classpath(tree, address),
                    findings: Vec::new(),
                });
                self.record_index.insert(address.to_string(), slot);
                slot
            }
        };
        self.records[slot].findings.push(finding);
        true
    }

    /// All findings in the order they were recorded.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Per-address records in order of first appearance.
    pub fn addresses(&self) -> &[AddressRecord] {
        &self.records
    }

    /// Looks up the record of one address.
    pub fn address(&self, address: &str) -> Option<&AddressRecord> {
        self.record_index
            .get(address)
            .map(|slot| &self.records[*slot])
    }

    /// Findings whose status is in `statuses`, in run order.
    pub fn filtered<'a>(&'a self, statuses: &'a [StatusKind]) -> impl Iterator<Item = &'a Finding> {
        self.findings
            .iter()
            .filter(move |f| statuses.contains(&f.status))
    }

    /// Number of findings with `status`.
    pub fn count(&self, status: StatusKind) -> usize {
        self.findings.iter().filter(|f| f.status == status).count()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Counts findings per status.
    pub fn summary(&self) -> Summary {
        let counts = StatusKind::ALL
            .into_iter()
            .map(|status| (status, self.count(status)))
            .collect();
        Summary {
            counts,
            total: self.findings.len(),
        }
    }

    /// `(address, classpath)` pairs in order of first appearance.
    pub fn classpaths(&self) -> Vec<(&str, Option<&str>)> {
        self.records
            .iter()
            .map(|r| (r.address.as_str(), r.classpath.as_deref()))
            .collect()
    }
}

/// Derives the classpath of `address` by resolving each path prefix.
///
/// Datasets contribute `/field`, groups their class (or `-` when they carry
/// none), and links are classified by their target. Prefixes that do not
/// resolve contribute nothing. An `@attribute` suffix is appended verbatim.
fn reconstruct_classpath<T: TreeProvider>(tree: &T, address: &str) -> Option<String> {
    let (path, attribute) = match address.split_once('@') {
        Some((path, attribute)) => (path, Some(attribute)),
        None => (address, None),
    };
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return None;
    }

    let mut classpath = String::new();
    let mut node_path = String::new();
    for segment in path.split('/') {
        node_path.push('/');
        node_path.push_str(segment);
        let Some(node) = tree.resolve(&node_path) else {
            continue;
        };
        let node = match tree.node_kind(node) {
            NodeKind::Link => match link_target(tree, node) {
                Some(target) => target,
                None => continue,
            },
            _ => node,
        };
        match tree.node_kind(node) {
            NodeKind::Group => {
                let class = tree
                    .attribute(node, CLASS_ATTRIBUTE)
                    .map(|a| a.value.to_string())
                    .unwrap_or_else(|| UNCLASSED_SEGMENT.to_string());
                classpath.push('/');
                classpath.push_str(&class);
            }
            NodeKind::Dataset | NodeKind::Link => classpath.push_str("/field"),
        }
    }
    if let Some(attribute) = attribute {
        classpath.push('@');
        classpath.push_str(attribute);
    }
    Some(classpath)
}

fn link_target<T: TreeProvider>(tree: &T, link: T::Node) -> Option<T::Node> {
    let target = tree.attribute(link, "target")?;
    let target = target.value.as_text()?.to_string();
    tree.resolve(&target)
}
