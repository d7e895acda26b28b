//! Presence checks of class-declared fields and groups.

use tracing::debug;

use crate::session::Validator;
use crate::tree::{NodeKind, TreeProvider, join_address};
use crate::{CLASS_ATTRIBUTE, SchemaProvider, StatusKind};

impl<T: TreeProvider, S: SchemaProvider + ?Sized> Validator<'_, T, S> {
    /// Checks `group` against the rules of `class_name`.
    ///
    /// Unknown classes are skipped silently; the walker has already
    /// reported them.
    pub(crate) fn cross_validate(&mut self, group: T::Node, class_name: &str) {
        let schema = self.schema;
        let Some(rules) = schema.class_rules(class_name) else {
            return;
        };
        let address = self.tree.path(group);
        debug!(%address, class = class_name, "cross-validating");

        self.record(
            &format!("NXDL review: {class_name}"),
            &address,
            StatusKind::Todo,
            &format!("validate with {class_name} specification (incomplete)"),
        );

        let field_test = format!("{class_name} required field");
        for (field_name, rule) in &rules.fields {
            if !rule.is_required_by_name() {
                continue;
            }
            let found = self.tree.child(group, field_name).is_some();
            let comment = if found {
                format!("{field_name} found")
            } else {
                format!("{field_name} not found")
            };
            self.record(
                &field_test,
                &join_address(&address, field_name),
                StatusKind::pass_or(found, StatusKind::Warn),
                &comment,
            );
        }

        let group_test = format!("{class_name} required group");
        for (key, rule) in &rules.groups {
            if rule.min_occurs == 0 {
                continue;
            }
            match &rule.name {
                Some(name) => {
                    let found = self.tree.child(group, name).is_some();
                    let comment = if found {
                        format!("{} found", rule.nx_class)
                    } else {
                        format!("{} not found", rule.nx_class)
                    };
                    self.record(
                        &group_test,
                        &join_address(&address, name),
                        StatusKind::pass_or(found, StatusKind::Warn),
                        &comment,
                    );
                }
                None => {
                    let count = self.count_children_of_class(group, &rule.nx_class);
                    debug!(%address, rule = %key, count, "anonymous group rule");
                    if count < rule.min_occurs as usize {
                        self.record(
                            &group_test,
                            &address,
                            StatusKind::Warn,
                            &format!(
                                "must have at least {} group: {}",
                                rule.min_occurs, rule.nx_class
                            ),
                        );
                    }
                }
            }
        }
    }

    fn count_children_of_class(&self, group: T::Node, nx_class: &str) -> usize {
        self.tree
            .children(group)
            .into_iter()
            .filter(|(_, child)| self.tree.node_kind(*child) == NodeKind::Group)
            .filter(|(_, child)| {
                self.tree
                    .attribute(*child, CLASS_ATTRIBUTE)
                    .is_some_and(|a| a.value.to_string() == nx_class)
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        ClassRule, DefinitionBundle, FieldRule, Finding, GroupRule, MemoryTree, NxType, Pattern,
        PatternTier,
    };

    fn corpus() -> DefinitionBundle {
        let mut corpus = DefinitionBundle::new("test");
        corpus.patterns = vec![
            Pattern::new("validItemName", "[A-Za-z_][A-Za-z0-9_]*", PatternTier::Relaxed),
            Pattern::new("validNXClassName", "NX[a-z_]+", PatternTier::Custom),
            Pattern::new("validTargetName", "(/[A-Za-z_][A-Za-z0-9_]*)+", PatternTier::Custom),
        ];
        corpus.classes.push(
            ClassRule::new("NXentry")
                .with_field("title", FieldRule::required(NxType::Char))
                .with_field("start_time", FieldRule::required(NxType::DateTime))
                .with_field("notes", FieldRule::optional(NxType::Char))
                .with_group("data", GroupRule::of_class("NXdata").with_min_occurs(1))
                .with_group(
                    "sample",
                    GroupRule::of_class("NXsample").named("sample").with_min_occurs(1),
                ),
        );
        corpus
    }

    fn cross_validate(document: serde_json::Value, class: &str) -> Vec<Finding> {
        let corpus = corpus();
        let tree = MemoryTree::from_json(document).unwrap();
        let mut validator = Validator::new(tree, &corpus).unwrap();
        let entry = validator.tree.resolve("/entry").unwrap();
        validator.cross_validate(entry, class);
        validator.findings().to_vec()
    }

    #[test]
    fn test_unknown_class_is_silent() {
        let findings = cross_validate(
            json!({ "children": { "entry": { "kind": "group" } } }),
            "NXmystery",
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_required_fields_and_groups() {
        let findings = cross_validate(
            json!({
                "children": {
                    "entry": {
                        "kind": "group",
                        "children": {
                            "title": { "kind": "dataset", "value": "run 7" },
                            "sample": { "kind": "group", "attributes": { "NX_class": "NXsample" } }
                        }
                    }
                }
            }),
            "NXentry",
        );

        let by_address = |address: &str, test: &str| {
            findings
                .iter()
                .find(|f| f.address == address && f.test_name == test)
                .cloned()
                .unwrap()
        };

        let review = by_address("/entry", "NXDL review: NXentry");
        assert_eq!(review.status, StatusKind::Todo);
        assert_eq!(review.comment, "validate with NXentry specification (incomplete)");

        let title = by_address("/entry/title", "NXentry required field");
        assert_eq!((title.status, title.comment.as_str()), (StatusKind::Ok, "title found"));
        let start = by_address("/entry/start_time", "NXentry required field");
        assert_eq!(
            (start.status, start.comment.as_str()),
            (StatusKind::Warn, "start_time not found")
        );
        assert!(findings.iter().all(|f| f.address != "/entry/notes"));

        let sample = by_address("/entry/sample", "NXentry required group");
        assert_eq!((sample.status, sample.comment.as_str()), (StatusKind::Ok, "NXsample found"));

        let data = by_address("/entry", "NXentry required group");
        assert_eq!(data.status, StatusKind::Warn);
        assert_eq!(data.comment, "must have at least 1 group: NXdata");
    }

    #[test]
    fn test_anonymous_group_rule_satisfied() {
        let findings = cross_validate(
            json!({
                "children": {
                    "entry": {
                        "kind": "group",
                        "children": {
                            "plot": { "kind": "group", "attributes": { "NX_class": "NXdata" } }
                        }
                    }
                }
            }),
            "NXentry",
        );
        assert!(
            !findings
                .iter()
                .any(|f| f.address == "/entry" && f.test_name == "NXentry required group")
        );
    }
}
