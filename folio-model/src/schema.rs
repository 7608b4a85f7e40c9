//! Document schema: the node and mark type tables a document is checked against.
//!
//! A [`Schema`] is built once from a [`SchemaSpec`] and never mutated. Node and
//! mark types are shared through `Arc`, so every node in a document carries a
//! cheap handle to its type.

use crate::attrs::{compute_attrs, default_attrs, AttrSpec, Attrs};
use crate::content::{ContentExpr, ContentParseError};
use crate::error::{ModelError, ModelResult, SchemaError};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::node::Node;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Declarative description of one node type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeSpec {
    /// Content expression; `None` makes the type a leaf.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Allowed marks: `"_"` for all, `""` for none, or space-separated names/groups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks: Option<String>,
    /// Space-separated groups this type belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub inline: bool,
    pub atom: bool,
    pub code: bool,
    pub defining: bool,
    pub isolating: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttrSpec>,
}

impl NodeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn content(mut self, expr: impl Into<String>) -> Self {
        self.content = Some(expr.into());
        self
    }

    #[must_use]
    pub fn marks(mut self, marks: impl Into<String>) -> Self {
        self.marks = Some(marks.into());
        self
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    #[must_use]
    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    #[must_use]
    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    #[must_use]
    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    #[must_use]
    pub fn isolating(mut self) -> Self {
        self.isolating = true;
        self
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }
}

/// Declarative description of one mark type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkSpec {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttrSpec>,
    /// Whether typing at the mark's end extends it. Defaults to true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inclusive: Option<bool>,
    /// Marks that cannot coexist with this one. Defaults to the mark itself;
    /// `""` allows any combination and `"_"` excludes every mark.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excludes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spanning: Option<bool>,
}

impl MarkSpec {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }

    #[must_use]
    pub fn inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = Some(inclusive);
        self
    }

    #[must_use]
    pub fn excludes(mut self, excludes: impl Into<String>) -> Self {
        self.excludes = Some(excludes.into());
        self
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn spanning(mut self, spanning: bool) -> Self {
        self.spanning = Some(spanning);
        self
    }
}

/// Ordered node and mark specs. Order determines type rank, group expansion
/// order, and mark ordering within a mark set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaSpec {
    pub nodes: Vec<(String, NodeSpec)>,
    pub marks: Vec<(String, MarkSpec)>,
    /// Name of the document's root type. Defaults to `doc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_node: Option<String>,
}

impl SchemaSpec {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn node(mut self, name: impl Into<String>, spec: NodeSpec) -> Self {
        self.nodes.push((name.into(), spec));
        self
    }

    #[must_use]
    pub fn mark(mut self, name: impl Into<String>, spec: MarkSpec) -> Self {
        self.marks.push((name.into(), spec));
        self
    }

    #[must_use]
    pub fn top_node(mut self, name: impl Into<String>) -> Self {
        self.top_node = Some(name.into());
        self
    }
}

// ── Node types ──────────────────────────────────────────────────

/// A node type resolved against its schema.
pub struct NodeType {
    name: String,
    rank: usize,
    groups: Vec<String>,
    spec: NodeSpec,
    content: ContentExpr,
    inline_content: bool,
    /// `None` allows every mark.
    mark_set: Option<Vec<String>>,
    default_attrs: Option<Attrs>,
}

impl NodeType {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the type in schema order.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn content_expr(&self) -> &ContentExpr {
        &self.content
    }

    pub fn is_text(&self) -> bool {
        self.name == "text"
    }

    pub fn is_inline(&self) -> bool {
        !self.is_block()
    }

    pub fn is_block(&self) -> bool {
        !(self.spec.inline || self.is_text())
    }

    /// True for block types whose content is inline.
    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content
    }

    pub fn inline_content(&self) -> bool {
        self.inline_content
    }

    pub fn is_leaf(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.spec.atom
    }

    /// Whether every attribute has a default.
    pub fn has_required_attrs(&self) -> bool {
        self.default_attrs.is_none()
    }

    /// Fills in defaults and validates `attrs`.
    pub fn compute_attrs(&self, attrs: Option<&Attrs>) -> ModelResult<Attrs> {
        if attrs.is_none() {
            if let Some(defaults) = &self.default_attrs {
                return Ok(defaults.clone());
            }
        }
        compute_attrs(&self.name, &self.spec.attrs, attrs)
    }

    pub fn allows_mark(&self, mark: &str) -> bool {
        self.mark_set
            .as_ref()
            .is_none_or(|set| set.iter().any(|m| m == mark))
    }

    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        marks.iter().all(|m| self.allows_mark(m.ty().name()))
    }

    /// Whether `content` satisfies this type's content expression and mark rules.
    pub fn valid_content(&self, content: &Fragment) -> bool {
        let names: Vec<&str> = content.iter().map(|child| child.ty().name()).collect();
        self.content.matches(&names) && content.iter().all(|child| self.allows_marks(child.marks()))
    }

    pub fn check_content(&self, content: &Fragment) -> ModelResult<()> {
        if self.valid_content(content) {
            Ok(())
        } else {
            Err(ModelError::InvalidContent(self.name.clone()))
        }
    }

    /// Whether content of `other` can be joined into a node of this type.
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        if self.name == other.name {
            return true;
        }
        let theirs = other.content.first_names();
        self.content.first_names().iter().any(|n| theirs.contains(n))
    }

    /// Creates a node without checking its content.
    pub fn create(
        self: &Arc<Self>,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> ModelResult<Node> {
        if self.is_text() {
            return Err(ModelError::InvalidContent(
                "text nodes are created with Schema::text".into(),
            ));
        }
        let attrs = self.compute_attrs(attrs)?;
        Ok(Node::new(Arc::clone(self), attrs, content, Mark::set_from(marks)))
    }

    /// Creates a node, failing when `content` or `marks` are not allowed.
    pub fn create_checked(
        self: &Arc<Self>,
        attrs: Option<&Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> ModelResult<Node> {
        self.check_content(&content)?;
        let node = self.create(attrs, content, marks)?;
        Ok(node)
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.rank == other.rank
    }
}

impl Eq for NodeType {}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name)
    }
}

// ── Mark types ──────────────────────────────────────────────────

/// A mark type resolved against its schema.
pub struct MarkType {
    name: String,
    rank: usize,
    spec: MarkSpec,
    groups: Vec<String>,
    excluded: Vec<String>,
    default_attrs: Option<Attrs>,
}

impl MarkType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn spec(&self) -> &MarkSpec {
        &self.spec
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn is_inclusive(&self) -> bool {
        self.spec.inclusive.unwrap_or(true)
    }

    /// Whether a mark of this type removes marks of `other` when added.
    pub fn excludes(&self, other: &MarkType) -> bool {
        self.excluded.iter().any(|n| *n == other.name)
    }

    pub fn create(self: &Arc<Self>, attrs: Option<&Attrs>) -> ModelResult<Mark> {
        let attrs = match (attrs, &self.default_attrs) {
            (None, Some(defaults)) => defaults.clone(),
            _ => compute_attrs(&self.name, &self.spec.attrs, attrs)?,
        };
        Ok(Mark::new(Arc::clone(self), attrs))
    }

    /// The mark of this type in `set`, if any.
    pub fn is_in_set<'a>(&self, set: &'a [Mark]) -> Option<&'a Mark> {
        set.iter().find(|m| m.ty().name() == self.name)
    }

    /// `set` without any mark of this type.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| m.ty().name() != self.name).cloned().collect()
    }
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.rank == other.rank
    }
}

impl Eq for MarkType {}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.name)
    }
}

// ── Schema ──────────────────────────────────────────────────────

/// The compiled schema.
pub struct Schema {
    spec: SchemaSpec,
    nodes: Vec<Arc<NodeType>>,
    node_index: HashMap<String, usize>,
    marks: Vec<Arc<MarkType>>,
    mark_index: HashMap<String, usize>,
    top: usize,
    text: usize,
}

fn split_names(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

/// Resolves mark names and groups (`_` meaning all) to mark names.
fn gather_marks(marks: &[(String, MarkSpec)], names: &[String]) -> Result<Vec<String>, String> {
    let mut found = Vec::new();
    for name in names {
        let before = found.len();
        if marks.iter().any(|(n, _)| n == name) {
            found.push(name.clone());
        } else {
            for (mark_name, spec) in marks {
                let in_group = spec
                    .group
                    .as_deref()
                    .is_some_and(|g| g.split_whitespace().any(|g| g == name));
                if name == "_" || in_group {
                    found.push(mark_name.clone());
                }
            }
        }
        if found.len() == before {
            return Err(name.clone());
        }
    }
    Ok(found)
}

impl Schema {
    /// Compiles a spec, validating every cross reference.
    pub fn new(spec: SchemaSpec) -> Result<Self, SchemaError> {
        let top_name = spec.top_node.clone().unwrap_or_else(|| "doc".to_string());

        let mut node_index = HashMap::new();
        for (i, (name, _)) in spec.nodes.iter().enumerate() {
            if node_index.insert(name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateNodeType(name.clone()));
            }
        }
        let mut mark_index = HashMap::new();
        for (i, (name, _)) in spec.marks.iter().enumerate() {
            if mark_index.insert(name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateMarkType(name.clone()));
            }
        }

        let top = *node_index
            .get(&top_name)
            .ok_or_else(|| SchemaError::MissingTopNode(top_name.clone()))?;
        let text = *node_index.get("text").ok_or(SchemaError::MissingTextType)?;
        if !spec.nodes[text].1.attrs.is_empty() {
            return Err(SchemaError::TextTypeWithAttributes);
        }

        let groups_of = |s: &NodeSpec| s.group.as_deref().map(split_names).unwrap_or_default();
        let resolve = |name: &str| -> Option<Vec<Arc<str>>> {
            if node_index.contains_key(name) {
                return Some(vec![Arc::from(name)]);
            }
            let members: Vec<Arc<str>> = spec
                .nodes
                .iter()
                .filter(|(_, s)| groups_of(s).iter().any(|g| g == name))
                .map(|(n, _)| Arc::from(n.as_str()))
                .collect();
            (!members.is_empty()).then_some(members)
        };
        let is_inline = |name: &str| {
            node_index
                .get(name)
                .is_some_and(|&i| spec.nodes[i].1.inline || name == "text")
        };

        let mut nodes = Vec::with_capacity(spec.nodes.len());
        for (rank, (name, node_spec)) in spec.nodes.iter().enumerate() {
            let content = match &node_spec.content {
                None => ContentExpr::empty(),
                Some(expr) => ContentExpr::parse(expr, resolve).map_err(|e| match e {
                    ContentParseError::UnknownName(n) => SchemaError::UnknownContentReference {
                        node: name.clone(),
                        name: n,
                    },
                    ContentParseError::Syntax(reason) => SchemaError::InvalidContentExpression {
                        node: name.clone(),
                        expr: expr.clone(),
                        reason,
                    },
                })?,
            };

            let names = content.names();
            let inline_count = names.iter().filter(|n| is_inline(n)).count();
            if inline_count != 0 && inline_count != names.len() {
                return Err(SchemaError::MixedContent(name.clone()));
            }
            let inline_content = inline_count > 0;

            let mark_set = match node_spec.marks.as_deref() {
                Some("_") => None,
                Some("") => Some(Vec::new()),
                Some(list) => Some(gather_marks(&spec.marks, &split_names(list)).map_err(|n| {
                    SchemaError::UnknownMarkReference {
                        node: name.clone(),
                        name: n,
                    }
                })?),
                None if inline_content => None,
                None => Some(Vec::new()),
            };

            nodes.push(Arc::new(NodeType {
                name: name.clone(),
                rank,
                groups: groups_of(node_spec),
                spec: node_spec.clone(),
                content,
                inline_content,
                mark_set,
                default_attrs: default_attrs(&node_spec.attrs),
            }));
        }

        let mut marks = Vec::with_capacity(spec.marks.len());
        for (rank, (name, mark_spec)) in spec.marks.iter().enumerate() {
            let excluded = match mark_spec.excludes.as_deref() {
                None => vec![name.clone()],
                Some("") => Vec::new(),
                Some(list) => gather_marks(&spec.marks, &split_names(list)).map_err(|n| {
                    SchemaError::UnknownExcludesReference {
                        mark: name.clone(),
                        name: n,
                    }
                })?,
            };
            marks.push(Arc::new(MarkType {
                name: name.clone(),
                rank,
                spec: mark_spec.clone(),
                groups: mark_spec.group.as_deref().map(split_names).unwrap_or_default(),
                excluded,
                default_attrs: default_attrs(&mark_spec.attrs),
            }));
        }

        tracing::debug!(
            nodes = nodes.len(),
            marks = marks.len(),
            top = %top_name,
            "schema compiled"
        );

        Ok(Self {
            spec,
            nodes,
            node_index,
            marks,
            mark_index,
            top,
            text,
        })
    }

    /// The spec the schema was compiled from.
    pub fn spec(&self) -> &SchemaSpec {
        &self.spec
    }

    pub fn node_type(&self, name: &str) -> Option<&Arc<NodeType>> {
        self.node_index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn mark_type(&self, name: &str) -> Option<&Arc<MarkType>> {
        self.mark_index.get(name).map(|&i| &self.marks[i])
    }

    /// Like [`Self::node_type`], but an unknown name is an error.
    pub fn expect_node_type(&self, name: &str) -> ModelResult<&Arc<NodeType>> {
        self.node_type(name)
            .ok_or_else(|| ModelError::UnknownNodeType(name.to_string()))
    }

    /// Like [`Self::mark_type`], but an unknown name is an error.
    pub fn expect_mark_type(&self, name: &str) -> ModelResult<&Arc<MarkType>> {
        self.mark_type(name)
            .ok_or_else(|| ModelError::UnknownMarkType(name.to_string()))
    }

    /// Node types in schema order.
    pub fn node_types(&self) -> impl Iterator<Item = &Arc<NodeType>> {
        self.nodes.iter()
    }

    /// Mark types in schema order.
    pub fn mark_types(&self) -> impl Iterator<Item = &Arc<MarkType>> {
        self.marks.iter()
    }

    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|t| t.name()).collect()
    }

    pub fn mark_names(&self) -> Vec<&str> {
        self.marks.iter().map(|t| t.name()).collect()
    }

    pub fn top_node_type(&self) -> &Arc<NodeType> {
        &self.nodes[self.top]
    }

    pub fn text_type(&self) -> &Arc<NodeType> {
        &self.nodes[self.text]
    }

    /// Creates a node of the named type, checking its content.
    pub fn node(
        &self,
        name: &str,
        attrs: Option<&Attrs>,
        content: Vec<Node>,
        marks: Vec<Mark>,
    ) -> ModelResult<Node> {
        self.expect_node_type(name)?
            .create_checked(attrs, Fragment::from_vec(content), marks)
    }

    /// Creates a text node. Empty text is an error.
    pub fn text(&self, text: &str, marks: Vec<Mark>) -> ModelResult<Node> {
        if text.is_empty() {
            return Err(ModelError::EmptyText);
        }
        Ok(Node::new_text(
            Arc::clone(self.text_type()),
            text.to_string(),
            Mark::set_from(marks),
        ))
    }

    /// Creates a mark of the named type.
    pub fn mark(&self, name: &str, attrs: Option<&Attrs>) -> ModelResult<Mark> {
        self.expect_mark_type(name)?.create(attrs)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.spec == other.spec
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("nodes", &self.node_names())
            .field("marks", &self.mark_names())
            .field("top", &self.top_node_type().name())
            .finish()
    }
}
