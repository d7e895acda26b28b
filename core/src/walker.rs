//! Structural walk over groups, datasets and links.

use tracing::{debug, trace};

use crate::pattern::NameTier;
use crate::session::Validator;
use crate::tree::{NodeKind, TreeProvider, short_name};
use crate::{CLASS_ATTRIBUTE, ENTRY_CLASSES, ROOT_CLASS, SchemaProvider, StatusKind};

/// Child field of an entry group naming its application definition.
const DEFINITION_FIELD: &str = "definition";
/// Attribute used by link machinery; never reported as undeclared.
const TARGET_ATTRIBUTE: &str = "target";
const UNITS_ATTRIBUTE: &str = "units";

impl<T: TreeProvider, S: SchemaProvider + ?Sized> Validator<'_, T, S> {
    /// Dispatches one child of `parent` by kind.
    fn visit(&mut self, node: T::Node, parent: T::Node) {
        match self.tree.node_kind(node) {
            NodeKind::Group => self.validate_group(node),
            NodeKind::Dataset => self.validate_dataset(node, parent),
            NodeKind::Link => self.validate_link(node),
        }
    }

    pub(crate) fn validate_group(&mut self, group: T::Node) {
        let address = self.tree.path(group);
        let schema = self.schema;
        debug!(%address, "group");

        let class = match self.read_attribute(group, CLASS_ATTRIBUTE, true) {
            Some(attribute) => {
                let class = attribute.value.to_string();
                self.validate_item_name(&address);
                let known = schema.is_known_class(&class);
                let comment = if known {
                    format!("{class} is known")
                } else {
                    format!("{class} is not known")
                };
                self.record(
                    "@NX_class known",
                    &format!("{address}@{CLASS_ATTRIBUTE}"),
                    StatusKind::pass_or(known, StatusKind::Warn),
                    &comment,
                );
                class
            }
            None if address == "/" => {
                self.record(
                    "@NX_class assumed",
                    &address,
                    StatusKind::Ok,
                    &format!("file root: {ROOT_CLASS}"),
                );
                ROOT_CLASS.to_string()
            }
            None => {
                self.validate_item_name(&address);
                self.record(
                    "@NX_class exists",
                    &address,
                    StatusKind::Note,
                    "no @NX_class attribute, not a NeXus group",
                );
                return;
            }
        };

        if let Some(rules) = schema.class_rules(&class) {
            for flag in rules.defaults.enabled_flags() {
                self.record(&format!("{class}@{flag}"), &address, StatusKind::Todo, "True");
            }
        }

        if schema.is_opaque_container(&class) {
            self.record(
                &format!("{class} group"),
                &address,
                StatusKind::Ok,
                &format!("{class} content will not be validated"),
            );
            return;
        }

        for name in self.tree.attribute_names(group) {
            if name != CLASS_ATTRIBUTE {
                self.validate_item_name(&format!("{address}@{name}"));
            }
        }

        for (_, child) in self.tree.children(group) {
            self.visit(child, group);
        }

        self.cross_validate(group, &class);
        if ENTRY_CLASSES.contains(&class.as_str()) {
            if let Some(definition) = self.application_definition(group) {
                debug!(%address, %definition, "application definition");
                self.cross_validate(group, &definition);
            }
        }
    }

    pub(crate) fn validate_dataset(&mut self, dataset: T::Node, parent: T::Node) {
        let address = self.tree.path(dataset);
        trace!(%address, "dataset");
        self.validate_item_name(&address);

        let class = self.group_class(parent);
        let schema = self.schema;
        let class_rules = class.as_deref().and_then(|c| schema.class_rules(c));
        let field_rule = class_rules.and_then(|rules| rules.fields.get(short_name(&address)));

        for name in self.tree.attribute_names(dataset) {
            let attribute_address = format!("{address}@{name}");
            self.validate_item_name(&attribute_address);
            let value = self
                .read_attribute(dataset, &name, true)
                .map(|a| a.value.to_string())
                .unwrap_or_default();

            let rule = field_rule
                .and_then(|field| field.attributes.get(&name))
                .or_else(|| schema.field_attribute(&name));
            match (rule, class_rules) {
                (Some(rule), _) if !rule.enumeration.is_empty() => {
                    let recognized = rule.allows(&value);
                    let comment = if recognized {
                        format!("value={value} :recognized")
                    } else {
                        format!(
                            "value={value} : expected one of these: {}",
                            rule.enumeration.join("|")
                        )
                    };
                    self.record(
                        &format!("enumeration: @{name}"),
                        &attribute_address,
                        StatusKind::pass_or(recognized, StatusKind::Warn),
                        &comment,
                    );
                }
                (Some(_), _) => {}
                (None, Some(rules))
                    if !rules.defaults.ignore_extra_attributes && name != TARGET_ATTRIBUTE =>
                {
                    self.record(
                        &format!("{}@{name}", rules.name),
                        &attribute_address,
                        StatusKind::Note,
                        "attribute not defined in NXDL",
                    );
                }
                (None, _) => {}
            }
        }

        if self.tree.data_type(dataset).is_some_and(|t| t.is_numeric()) {
            let (status, comment) = match self.read_attribute(dataset, UNITS_ATTRIBUTE, true) {
                None => (StatusKind::Note, "does not exist".to_string()),
                Some(units) if units.value.to_string().is_empty() => {
                    (StatusKind::Note, "has no value".to_string())
                }
                Some(units) => (StatusKind::Ok, format!("value: {}", units.value)),
            };
            self.record(
                "field@units",
                &format!("{address}@{UNITS_ATTRIBUTE}"),
                status,
                &comment,
            );
        }
    }

    pub(crate) fn validate_link(&mut self, link: T::Node) {
        let address = self.tree.path(link);
        trace!(%address, "link");
        self.validate_item_name(&address);

        let Some(target) = self.read_attribute(link, TARGET_ATTRIBUTE, true) else {
            self.record("link", &address, StatusKind::Error, "no target");
            return;
        };
        let target = target.value.to_string();
        let target_address = format!("{address}@{TARGET_ATTRIBUTE}");
        if !target.starts_with('/') {
            self.record(
                "link target exists",
                &target_address,
                StatusKind::Error,
                &format!("{target} is not an absolute address"),
            );
            return;
        }
        let exists = self.tree.resolve(&target).is_some();
        let comment = if exists {
            target.clone()
        } else {
            format!("{target} does not exist")
        };
        self.record(
            "link target exists",
            &target_address,
            StatusKind::pass_or(exists, StatusKind::Error),
            &comment,
        );
    }

    /// Checks the last segment of `address` against the naming tiers.
    pub(crate) fn validate_item_name(&mut self, address: &str) {
        let name = short_name(address);
        if name.is_empty() {
            return;
        }
        if name == CLASS_ATTRIBUTE {
            self.record(
                "NeXus internal attribute",
                address,
                StatusKind::Ok,
                "marks this HDF5 group as NeXus group",
            );
            return;
        }
        let tier = self.patterns.classify(name);
        if tier == NameTier::DecodeError {
            debug!(%address, "undecodable item name");
        }
        let (test_name, comment) = self.patterns.describe(tier);
        self.record(test_name, address, tier.status(), &comment);
    }

    fn application_definition(&self, group: T::Node) -> Option<String> {
        let field = self.tree.child(group, DEFINITION_FIELD)?;
        if self.tree.node_kind(field) != NodeKind::Dataset {
            return None;
        }
        self.tree
            .text_value(field)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        AttributeRule, ClassDefaults, ClassRule, DefinitionBundle, FieldRule, MemoryTree, NxType,
        Pattern, PatternTier,
    };

    fn corpus() -> DefinitionBundle {
        let mut corpus = DefinitionBundle::new("test");
        corpus.patterns = vec![
            Pattern::new(
                "validItemName",
                "[a-zA-Z0-9_]([a-zA-Z0-9_.]*[a-zA-Z0-9_])?",
                PatternTier::Relaxed,
            ),
            Pattern::new("validNXClassName", "NX[a-z_]+", PatternTier::Custom),
            Pattern::new("validTargetName", "(/[a-zA-Z_][a-zA-Z0-9_]*)+", PatternTier::Custom),
        ];
        corpus
            .field_attributes
            .insert("units".into(), AttributeRule::default());
        corpus.field_attributes.insert(
            "interpretation".into(),
            AttributeRule::enumerated(["scalar", "spectrum", "image"]),
        );
        corpus.opaque_classes.push("NXcollection".into());
        corpus.classes.push(ClassRule::new("NXroot"));
        corpus.classes.push(ClassRule::new("NXentry"));
        corpus.classes.push(
            ClassRule::new("NXsample").with_field("temperature", FieldRule::optional(NxType::Float)),
        );
        corpus.classes.push(ClassRule::new("NXcollection").with_defaults(ClassDefaults {
            ignore_extra_attributes: true,
            ignore_extra_fields: true,
            ignore_extra_groups: true,
        }));
        corpus
    }

    fn run(document: serde_json::Value) -> Vec<crate::Finding> {
        run_with(&corpus(), document)
    }

    fn run_with(corpus: &DefinitionBundle, document: serde_json::Value) -> Vec<crate::Finding> {
        let tree = MemoryTree::from_json(document).unwrap();
        let mut validator = Validator::new(tree, corpus).unwrap();
        let root = validator.tree.root();
        validator.validate_group(root);
        validator.findings().to_vec()
    }

    fn find<'a>(findings: &'a [crate::Finding], test: &str, address: &str) -> Option<&'a crate::Finding> {
        findings
            .iter()
            .find(|f| f.test_name == test && f.address == address)
    }

    #[test]
    fn test_root_class_is_assumed() {
        let findings = run(json!({}));
        let assumed = find(&findings, "@NX_class assumed", "/").unwrap();
        assert_eq!(assumed.status, StatusKind::Ok);
        assert_eq!(assumed.comment, "file root: NXroot");
    }

    #[test]
    fn test_unclassed_group_is_not_descended() {
        let findings = run(json!({
            "children": {
                "scratch": {
                    "kind": "group",
                    "children": { "Bad Name": { "kind": "dataset", "value": 1 } }
                }
            }
        }));
        let note = find(&findings, "@NX_class exists", "/scratch").unwrap();
        assert_eq!(note.status, StatusKind::Note);
        assert!(findings.iter().all(|f| !f.address.starts_with("/scratch/")));
        assert!(findings.iter().all(|f| !f.test_name.starts_with("NXDL review")
            || f.address == "/"));
    }

    #[test]
    fn test_unknown_class_warns() {
        let findings = run(json!({
            "children": {
                "thing": { "kind": "group", "attributes": { "NX_class": "NXwidget" } }
            }
        }));
        let known = find(&findings, "@NX_class known", "/thing@NX_class").unwrap();
        assert_eq!(known.status, StatusKind::Warn);
        assert_eq!(known.comment, "NXwidget is not known");
    }

    #[test]
    fn test_opaque_container_stops_walk() {
        let findings = run(json!({
            "children": {
                "misc": {
                    "kind": "group",
                    "attributes": { "NX_class": "NXcollection" },
                    "children": { "Not Valid!": { "kind": "dataset", "value": 1.5 } }
                }
            }
        }));
        let opaque = find(&findings, "NXcollection group", "/misc").unwrap();
        assert_eq!(opaque.comment, "NXcollection content will not be validated");
        let todos: Vec<_> = findings
            .iter()
            .filter(|f| f.status == StatusKind::Todo && f.address == "/misc")
            .map(|f| f.test_name.as_str())
            .collect();
        assert_eq!(
            todos,
            vec![
                "NXcollection@ignoreExtraAttributes",
                "NXcollection@ignoreExtraFields",
                "NXcollection@ignoreExtraGroups"
            ]
        );
        assert!(findings.iter().all(|f| !f.address.starts_with("/misc/")));
    }

    #[test]
    fn test_dataset_attribute_checks() {
        let findings = run(json!({
            "children": {
                "sample": {
                    "kind": "group",
                    "attributes": { "NX_class": "NXsample" },
                    "children": {
                        "temperature": {
                            "kind": "dataset",
                            "value": 300.5,
                            "attributes": {
                                "interpretation": "movie",
                                "calibrated_by": "me",
                                "target": "/sample/temperature"
                            }
                        },
                        "count": { "kind": "dataset", "value": 4, "attributes": { "units": "" } },
                        "label": { "kind": "dataset", "value": "hot" }
                    }
                }
            }
        }));

        let enumeration = find(
            &findings,
            "enumeration: @interpretation",
            "/sample/temperature@interpretation",
        )
        .unwrap();
        assert_eq!(enumeration.status, StatusKind::Warn);
        assert_eq!(
            enumeration.comment,
            "value=movie : expected one of these: scalar|spectrum|image"
        );

        let extra = find(&findings, "NXsample@calibrated_by", "/sample/temperature@calibrated_by").unwrap();
        assert_eq!(extra.status, StatusKind::Note);
        assert!(find(&findings, "NXsample@target", "/sample/temperature@target").is_none());

        let units = find(&findings, "field@units", "/sample/temperature@units").unwrap();
        assert_eq!((units.status, units.comment.as_str()), (StatusKind::Note, "does not exist"));
        let empty = find(&findings, "field@units", "/sample/count@units").unwrap();
        assert_eq!(empty.comment, "has no value");
        assert!(find(&findings, "field@units", "/sample/label@units").is_none());
    }

    #[test]
    fn test_ignore_extra_attributes_suppresses_note() {
        let document = json!({
            "children": {
                "sample": {
                    "kind": "group",
                    "attributes": { "NX_class": "NXsample" },
                    "children": {
                        "temperature": {
                            "kind": "dataset",
                            "value": 300.5,
                            "attributes": { "units": "K", "calibrated_by": "me" }
                        }
                    }
                }
            }
        });

        let mut corpus = corpus();
        let findings = run_with(&corpus, document.clone());
        assert!(find(&findings, "NXsample@calibrated_by", "/sample/temperature@calibrated_by").is_some());

        let sample = corpus
            .classes
            .iter_mut()
            .find(|class| class.name == "NXsample")
            .unwrap();
        sample.defaults.ignore_extra_attributes = true;
        let findings = run_with(&corpus, document);
        assert!(find(&findings, "NXsample@calibrated_by", "/sample/temperature@calibrated_by").is_none());
        assert!(find(&findings, "field@units", "/sample/temperature@units").is_some());
    }

    #[test]
    fn test_blank_units_count_as_a_value() {
        let findings = run(json!({
            "children": {
                "sample": {
                    "kind": "group",
                    "attributes": { "NX_class": "NXsample" },
                    "children": {
                        "temperature": { "kind": "dataset", "value": 4.2, "attributes": { "units": "  " } }
                    }
                }
            }
        }));
        let units = find(&findings, "field@units", "/sample/temperature@units").unwrap();
        assert_eq!((units.status, units.comment.as_str()), (StatusKind::Ok, "value:   "));
    }

    #[test]
    fn test_units_with_value() {
        let findings = run(json!({
            "children": {
                "sample": {
                    "kind": "group",
                    "attributes": { "NX_class": "NXsample" },
                    "children": {
                        "temperature": { "kind": "dataset", "value": 4.2, "attributes": { "units": "K" } }
                    }
                }
            }
        }));
        let units = find(&findings, "field@units", "/sample/temperature@units").unwrap();
        assert_eq!((units.status, units.comment.as_str()), (StatusKind::Ok, "value: K"));
    }

    #[test]
    fn test_links() {
        let findings = run(json!({
            "children": {
                "entry": {
                    "kind": "group",
                    "attributes": { "NX_class": "NXentry" },
                    "children": {
                        "data": { "kind": "dataset", "value": [1, 2] },
                        "good": { "kind": "link", "attributes": { "target": "/entry/data" } },
                        "dangling": { "kind": "link", "attributes": { "target": "/missing/path" } },
                        "relative": { "kind": "link", "attributes": { "target": "entry/data" } },
                        "orphan": { "kind": "link" }
                    }
                }
            }
        }));

        let good = find(&findings, "link target exists", "/entry/good@target").unwrap();
        assert_eq!((good.status, good.comment.as_str()), (StatusKind::Ok, "/entry/data"));

        let dangling: Vec<_> = findings
            .iter()
            .filter(|f| f.test_name == "link target exists" && f.status == StatusKind::Error)
            .filter(|f| f.comment.contains("/missing/path"))
            .collect();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].address, "/entry/dangling@target");

        let relative = find(&findings, "link target exists", "/entry/relative@target").unwrap();
        assert_eq!(relative.comment, "entry/data is not an absolute address");

        let orphan = find(&findings, "link", "/entry/orphan").unwrap();
        assert_eq!((orphan.status, orphan.comment.as_str()), (StatusKind::Error, "no target"));
    }

    #[test]
    fn test_item_names() {
        let findings = run(json!({
            "children": {
                "entry": { "kind": "group", "attributes": { "NX_class": "NXentry" } },
                "Entry.2": { "kind": "group", "attributes": { "NX_class": "NXentry" } },
                "bad name": { "kind": "group", "attributes": { "NX_class": "NXentry" } }
            }
        }));
        assert_eq!(
            find(&findings, "validItemName-strict", "/entry").unwrap().status,
            StatusKind::Ok
        );
        assert!(find(&findings, "validItemName", "/entry").is_none());
        assert_eq!(
            find(&findings, "validItemName", "/Entry.2").unwrap().status,
            StatusKind::Note
        );
        let hdf5 = find(&findings, "validItemName", "/bad name").unwrap();
        assert_eq!(hdf5.status, StatusKind::Warn);
        assert_eq!(hdf5.comment, "valid HDF5 item name, not valid with NeXus");
    }

    #[test]
    fn test_class_attribute_on_dataset_is_internal() {
        let findings = run(json!({
            "children": {
                "value": { "kind": "dataset", "value": "x", "attributes": { "NX_class": "NXnote" } }
            }
        }));
        let internal = find(&findings, "NeXus internal attribute", "/value@NX_class").unwrap();
        assert_eq!(internal.status, StatusKind::Ok);
    }
}
