//! Indented listing of a data file's node tree.

use nxvalidate_core::{CLASS_ATTRIBUTE, NodeKind, TreeProvider};

const INDENT: &str = "  ";

/// Renders every node below the root, one per line.
///
/// Groups print as `name:NXclass`, datasets as `name:type = value`, links
/// as `name -> target`. Attributes follow their node as `@name = value`.
pub fn render_structure<T: TreeProvider>(tree: &T, attributes: bool) -> String {
    let mut out = String::from("/\n");
    let root = tree.root();
    if attributes {
        push_attributes(tree, root, 1, &mut out);
    }
    push_children(tree, root, 1, attributes, &mut out);
    out
}

fn push_children<T: TreeProvider>(
    tree: &T,
    group: T::Node,
    depth: usize,
    attributes: bool,
    out: &mut String,
) {
    for (name, child) in tree.children(group) {
        let indent = INDENT.repeat(depth);
        match tree.node_kind(child) {
            NodeKind::Group => {
                match tree.attribute(child, CLASS_ATTRIBUTE) {
                    Some(class) => out.push_str(&format!("{indent}{name}:{}\n", class.value)),
                    None => out.push_str(&format!("{indent}{name}\n")),
                }
                if attributes {
                    push_attributes(tree, child, depth + 1, out);
                }
                push_children(tree, child, depth + 1, attributes, out);
            }
            NodeKind::Dataset => {
                let data_type = tree
                    .data_type(child)
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "?".to_string());
                match tree.text_value(child) {
                    Some(value) => {
                        out.push_str(&format!("{indent}{name}:{data_type} = {value}\n"))
                    }
                    None => out.push_str(&format!("{indent}{name}:{data_type}\n")),
                }
                if attributes {
                    push_attributes(tree, child, depth + 1, out);
                }
            }
            NodeKind::Link => {
                let target = tree
                    .attribute(child, "target")
                    .map(|t| t.value.to_string())
                    .unwrap_or_else(|| "?".to_string());
                out.push_str(&format!("{indent}{name} -> {target}\n"));
            }
        }
    }
}

fn push_attributes<T: TreeProvider>(tree: &T, node: T::Node, depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);
    for name in tree.attribute_names(node) {
        if let Some(attribute) = tree.attribute(node, &name) {
            out.push_str(&format!("{indent}@{name} = {}\n", attribute.value));
        }
    }
}
