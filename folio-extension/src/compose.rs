//! Schema composition.
//!
//! Node extensions and their children share one flat node namespace; mark
//! extensions fill the mark namespace. The resulting [`Schema`] is built in
//! one go and is never partially constructed.

use crate::error::{ExtensionError, ExtensionResult, Namespace};
use crate::extension::{Extension, MarkExtension, NodeExtension};
use folio_model::{Schema, SchemaSpec};
use std::collections::HashSet;
use tracing::debug;

/// Node extensions in composition order: top-level nodes in list order,
/// then every child, depth-first, in declaration order.
pub(crate) fn flatten_nodes(extensions: &[Extension]) -> Vec<&NodeExtension> {
    let top: Vec<&NodeExtension> = extensions
        .iter()
        .filter_map(|ext| match ext {
            Extension::Node(node) => Some(node),
            _ => None,
        })
        .collect();
    let mut all = top.clone();
    for node in top {
        push_children(node, &mut all);
    }
    all
}

/// Child node extensions only, in composition order.
pub(crate) fn child_nodes(extensions: &[Extension]) -> Vec<&NodeExtension> {
    let mut children = Vec::new();
    for ext in extensions {
        if let Extension::Node(node) = ext {
            push_children(node, &mut children);
        }
    }
    children
}

fn push_children<'a>(node: &'a NodeExtension, out: &mut Vec<&'a NodeExtension>) {
    for child in node.children() {
        out.push(child);
        push_children(child, out);
    }
}

pub(crate) fn marks(extensions: &[Extension]) -> impl Iterator<Item = &MarkExtension> {
    extensions.iter().filter_map(|ext| match ext {
        Extension::Mark(mark) => Some(mark),
        _ => None,
    })
}

/// Composes the schema contributed by `extensions`.
///
/// Fails on the first name declared twice within a namespace, and on any
/// content or mark reference the schema cannot resolve.
pub fn compose(extensions: &[Extension]) -> ExtensionResult<Schema> {
    let nodes = flatten_nodes(extensions);
    check_unique(Namespace::Node, nodes.iter().map(|n| n.name()))?;
    check_unique(Namespace::Mark, marks(extensions).map(MarkExtension::name))?;
    check_unique(
        Namespace::Plain,
        extensions.iter().filter_map(|ext| match ext {
            Extension::Plain(plain) => Some(plain.name()),
            _ => None,
        }),
    )?;

    let mut spec = SchemaSpec::new();
    for node in &nodes {
        spec = spec.node(node.name(), node.spec().clone());
    }
    for mark in marks(extensions) {
        spec = spec.mark(mark.name(), mark.spec().clone());
    }
    let schema = Schema::new(spec)?;

    debug!(
        extensions = extensions.len(),
        nodes = nodes.len(),
        marks = schema.mark_names().len(),
        "schema composed"
    );
    Ok(schema)
}

fn check_unique<'a>(namespace: Namespace, names: impl Iterator<Item = &'a str>) -> ExtensionResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ExtensionError::DuplicateName {
                namespace,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
