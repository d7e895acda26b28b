//! Default-plot resolution.
//!
//! NeXus has marked the data to plot by default in several incompatible
//! ways over the years. Candidates for every convention are harvested from
//! the tree in one pass and then resolved newest first:
//!
//! | version       | classpath signature                          |
//! |---------------|----------------------------------------------|
//! | v3            | `/NXentry/NXdata@signal`                     |
//! | v3+niac2014   | `/@default/NXentry@default/NXdata@signal`    |
//! | v2            | `/NXentry/NXdata/field@signal`               |
//! | v1            | `/NXentry/NXdata/field@signal`               |
//!
//! The first convention that yields exactly one address wins. v1 and v2
//! differ only in auxiliary attributes (`axes` versus `axis`/`primary`),
//! which are not checked here.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::Validator;
use crate::tree::{NodeKind, TreeProvider, join_address};
use crate::{CLASS_ATTRIBUTE, DATA_CLASS, SchemaProvider, StatusKind};

const ENTRY_CLASS: &str = "NXentry";
const SIGNAL_ATTRIBUTE: &str = "signal";
const DEFAULT_ATTRIBUTE: &str = "default";
const FILE_ADDRESS: &str = "/";

const V3_CLASSPATH: &str = "/NXentry/NXdata@signal";
const FIELD_CLASSPATH: &str = "/NXentry/NXdata/field@signal";

/// Default-plot convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotVersion {
    V1,
    V2,
    V3,
    #[serde(rename = "v3+niac2014")]
    V3Niac2014,
}

impl fmt::Display for PlotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V3 => "v3",
            Self::V3Niac2014 => "v3+niac2014",
        };
        f.write_str(name)
    }
}

/// Outcome of default-plot resolution.
///
/// Several qualifying addresses are kept apart from a single one: an
/// ambiguous file has plottable data but no default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum PlotResolution {
    None,
    Unique {
        version: PlotVersion,
        address: String,
    },
    Ambiguous {
        version: PlotVersion,
        addresses: Vec<String>,
    },
}

impl PlotResolution {
    /// The resolved address, only for a unique outcome.
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Unique { address, .. } => Some(address),
            _ => None,
        }
    }

    pub fn version(&self) -> Option<PlotVersion> {
        match self {
            Self::None => None,
            Self::Unique { version, .. } | Self::Ambiguous { version, .. } => Some(*version),
        }
    }

    pub fn is_unique(&self) -> bool {
        matches!(self, Self::Unique { .. })
    }
}

impl fmt::Display for PlotResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("no default plot"),
            Self::Unique { version, address } => write!(f, "{address} ({version})"),
            Self::Ambiguous { version, addresses } => {
                write!(f, "ambiguous ({version}): {}", addresses.join(", "))
            }
        }
    }
}

/// Signal-bearing addresses per convention, mapped to their classpath.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlotCandidates {
    /// `<field>@signal` addresses.
    pub v1: BTreeMap<String, String>,
    /// `<field>@signal` addresses.
    pub v2: BTreeMap<String, String>,
    /// `<NXdata group>@signal` addresses.
    pub v3: BTreeMap<String, String>,
}

impl PlotCandidates {
    pub fn is_empty(&self) -> bool {
        self.v1.is_empty() && self.v2.is_empty() && self.v3.is_empty()
    }
}

impl<T: TreeProvider, S: SchemaProvider + ?Sized> Validator<'_, T, S> {
    /// Resolves the default plot, newest convention first.
    pub fn validate_default_plot(&mut self) -> PlotResolution {
        let candidates = self.harvest_candidates();
        debug!(
            v1 = candidates.v1.len(),
            v2 = candidates.v2.len(),
            v3 = candidates.v3.len(),
            "default plot candidates"
        );

        let v3 = self.resolve_v3(&candidates.v3);
        if v3.is_unique() {
            return v3;
        }
        let v2 = self.resolve_v2(&candidates.v2);
        if v2.is_unique() {
            return v2;
        }
        let v1 = self.resolve_v1(&candidates.v1);
        if v1.is_unique() {
            return v1;
        }

        self.record(
            "NeXus default plot",
            FILE_ADDRESS,
            StatusKind::Error,
            "no default plot: not a NeXus file",
        );
        [v3, v2, v1]
            .into_iter()
            .find(|resolution| matches!(resolution, PlotResolution::Ambiguous { .. }))
            .unwrap_or(PlotResolution::None)
    }

    /// Collects the candidates of every convention from the top-level
    /// `NXentry` groups and their `NXdata` children.
    pub fn harvest_candidates(&self) -> PlotCandidates {
        let mut candidates = PlotCandidates::default();
        let root = self.tree.root();
        for (_, entry) in self.tree.children(root) {
            if !self.is_group_of_class(entry, ENTRY_CLASS) {
                continue;
            }
            for (_, data) in self.tree.children(entry) {
                if !self.is_group_of_class(data, DATA_CLASS) {
                    continue;
                }
                let data_address = self.tree.path(data);
                if self.tree.attribute(data, SIGNAL_ATTRIBUTE).is_some() {
                    candidates.v3.insert(
                        format!("{data_address}@{SIGNAL_ATTRIBUTE}"),
                        V3_CLASSPATH.to_string(),
                    );
                }
                for (_, field) in self.tree.children(data) {
                    if !self.is_dataset(field) || self.tree.attribute(field, SIGNAL_ATTRIBUTE).is_none() {
                        continue;
                    }
                    let key = format!("{}@{SIGNAL_ATTRIBUTE}", self.tree.path(field));
                    candidates.v2.insert(key.clone(), FIELD_CLASSPATH.to_string());
                    candidates.v1.insert(key, FIELD_CLASSPATH.to_string());
                }
            }
        }
        candidates
    }

    /// v3: `NXdata@signal` names the plottable field.
    pub fn resolve_v3(&mut self, candidates: &BTreeMap<String, String>) -> PlotResolution {
        const GROUP_TEST: &str = "NXdata group default plot v3";
        const FILE_TEST: &str = "NeXus default plot v3";

        let mut addresses = Vec::new();
        for signal_address in candidates.keys() {
            let Some(group) = self.tree.resolve(strip_attribute(signal_address)) else {
                continue;
            };
            let Some(signal) = self.read_attribute(group, SIGNAL_ATTRIBUTE, true) else {
                continue;
            };
            let signal = signal.value.to_string();
            if self.tree.child(group, &signal).is_none() {
                self.record(
                    GROUP_TEST,
                    signal_address,
                    StatusKind::Error,
                    &format!("signal field not found: {signal}"),
                );
                continue;
            }
            let address = join_address(&self.tree.path(group), &signal);
            self.record(
                GROUP_TEST,
                &address,
                StatusKind::Ok,
                &format!("NXdata@signal = {signal}"),
            );
            addresses.push(address);
        }

        match addresses.len() {
            0 => PlotResolution::None,
            1 => {
                self.record(
                    FILE_TEST,
                    FILE_ADDRESS,
                    StatusKind::Ok,
                    &format!("NeXus data file default plot: {V3_CLASSPATH}"),
                );
                PlotResolution::Unique {
                    version: PlotVersion::V3,
                    address: addresses.remove(0),
                }
            }
            _ => {
                let mut chosen = self.niac2014(&addresses);
                if chosen.len() == 1 {
                    self.record(
                        FILE_TEST,
                        FILE_ADDRESS,
                        StatusKind::Ok,
                        "NeXus data file default plot defined using v3+niac2014",
                    );
                    PlotResolution::Unique {
                        version: PlotVersion::V3Niac2014,
                        address: chosen.remove(0),
                    }
                } else {
                    self.record(
                        FILE_TEST,
                        FILE_ADDRESS,
                        StatusKind::Note,
                        "NeXus data file defines more than one default plot",
                    );
                    PlotResolution::Ambiguous {
                        version: PlotVersion::V3,
                        addresses,
                    }
                }
            }
        }
    }

    /// Keeps the v3 addresses selected by the `@default` chain from the
    /// file root through the entry to the data group.
    fn niac2014(&self, addresses: &[String]) -> Vec<String> {
        let root = self.tree.root();
        let root_default = self.text_attribute(root, DEFAULT_ATTRIBUTE);
        addresses
            .iter()
            .filter(|address| {
                let mut segments = address.trim_start_matches('/').split('/');
                let (Some(entry_name), Some(data_name)) = (segments.next(), segments.next()) else {
                    return false;
                };
                if root_default.as_deref() != Some(entry_name) {
                    return false;
                }
                let Some(entry) = self.tree.child(root, entry_name) else {
                    return false;
                };
                self.text_attribute(entry, DEFAULT_ATTRIBUTE).as_deref() == Some(data_name)
            })
            .cloned()
            .collect()
    }

    /// v2: exactly one field in the file carries `@signal=1`.
    pub fn resolve_v2(&mut self, candidates: &BTreeMap<String, String>) -> PlotResolution {
        const TEST: &str = "NeXus default plot v2";

        let mut addresses = Vec::new();
        for (signal_address, classpath) in candidates {
            let field_address = strip_attribute(signal_address);
            let Some(field) = self.tree.resolve(field_address) else {
                continue;
            };
            let Some(signal) = self.read_attribute(field, SIGNAL_ATTRIBUTE, true) else {
                continue;
            };
            if signal.value.is_signal_one() {
                self.record(TEST, field_address, StatusKind::Ok, &format!("{classpath} = 1"));
                addresses.push(field_address.to_string());
            } else {
                self.record(
                    TEST,
                    signal_address,
                    StatusKind::Error,
                    &format!("expected @signal=1, found: {}", signal.value),
                );
            }
        }

        self.aggregate_fields(
            PlotVersion::V2,
            TEST,
            addresses,
            "NeXus data file default plot defined using v2",
            "NeXus data file defines more than one default plot using v2",
        )
    }

    /// v1: each `NXdata` group has exactly one field with `@signal=1`.
    pub fn resolve_v1(&mut self, candidates: &BTreeMap<String, String>) -> PlotResolution {
        const GROUP_TEST: &str = "NXdata group default plot v1";

        let mut groups: Vec<String> = Vec::new();
        for signal_address in candidates.keys() {
            let field_address = strip_attribute(signal_address);
            let group_address = match field_address.rsplit_once('/') {
                Some(("", _)) | None => FILE_ADDRESS.to_string(),
                Some((parent, _)) => parent.to_string(),
            };
            if !groups.contains(&group_address) {
                groups.push(group_address);
            }
        }

        let mut addresses = Vec::new();
        for group_address in groups {
            let Some(group) = self.tree.resolve(&group_address) else {
                continue;
            };
            let mut members = Vec::new();
            for (_, field) in self.tree.children(group) {
                if !self.is_dataset(field) {
                    continue;
                }
                let Some(signal) = self.read_attribute(field, SIGNAL_ATTRIBUTE, true) else {
                    continue;
                };
                let field_address = self.tree.path(field);
                if signal.value.is_signal_one() {
                    members.push(field_address);
                } else {
                    self.record(
                        GROUP_TEST,
                        &format!("{field_address}@{SIGNAL_ATTRIBUTE}"),
                        StatusKind::Error,
                        &format!("expected @signal=1, found: {}", signal.value),
                    );
                }
            }

            match members.len() {
                1 => {
                    self.record(
                        GROUP_TEST,
                        &group_address,
                        StatusKind::Ok,
                        "NXdata group default plot using v1",
                    );
                    addresses.append(&mut members);
                }
                0 => self.record(
                    GROUP_TEST,
                    &group_address,
                    StatusKind::Warn,
                    "NXdata group does not define a default plot using v1",
                ),
                _ => self.record(
                    GROUP_TEST,
                    &group_address,
                    StatusKind::Note,
                    "NXdata group defines more than one default plot using v1",
                ),
            }
        }

        self.aggregate_fields(
            PlotVersion::V1,
            "NeXus default plot v1",
            addresses,
            "NeXus data file default plot defined",
            "NeXus data file defines more than one default plot using v1",
        )
    }

    /// Shared zero / one / many outcome of the field-based conventions.
    fn aggregate_fields(
        &mut self,
        version: PlotVersion,
        test_name: &str,
        mut addresses: Vec<String>,
        unique: &str,
        ambiguous: &str,
    ) -> PlotResolution {
        match addresses.len() {
            0 => PlotResolution::None,
            1 => {
                self.record(test_name, FILE_ADDRESS, StatusKind::Ok, unique);
                PlotResolution::Unique {
                    version,
                    address: addresses.remove(0),
                }
            }
            _ => {
                self.record(test_name, FILE_ADDRESS, StatusKind::Warn, ambiguous);
                PlotResolution::Ambiguous { version, addresses }
            }
        }
    }

    fn is_group_of_class(&self, node: T::Node, class: &str) -> bool {
        self.tree.node_kind(node) == NodeKind::Group
            && self
                .tree
                .attribute(node, CLASS_ATTRIBUTE)
                .is_some_and(|a| a.value.to_string() == class)
    }

    /// Datasets, and links that resolve to one.
    fn is_dataset(&self, node: T::Node) -> bool {
        match self.tree.node_kind(node) {
            NodeKind::Dataset => true,
            NodeKind::Group => false,
            NodeKind::Link => self
                .text_attribute(node, "target")
                .and_then(|target| self.tree.resolve(&target))
                .is_some_and(|target| self.tree.node_kind(target) == NodeKind::Dataset),
        }
    }

    fn text_attribute(&self, node: T::Node, name: &str) -> Option<String> {
        self.tree.attribute(node, name).map(|a| a.value.to_string())
    }
}

fn strip_attribute(address: &str) -> &str {
    address
        .split_once('@')
        .map(|(path, _)| path)
        .unwrap_or(address)
}
