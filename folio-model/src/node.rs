//! Document nodes.

use crate::attrs::Attrs;
use crate::error::{ModelError, ModelResult};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::replace::replace;
use crate::resolved::ResolvedPos;
use crate::schema::{MarkType, NodeType};
use crate::slice::Slice;
use std::fmt;
use std::sync::Arc;

/// An immutable document node.
///
/// Text nodes carry their text and no content; every other node carries a
/// [`Fragment`] of children. Positions count one unit per character of text,
/// one unit per leaf node and two units (open and close) per other node.
#[derive(Clone)]
pub struct Node {
    ty: Arc<NodeType>,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
    text_len: usize,
}

/// Returns the characters `from..to` of `s`.
pub(crate) fn char_slice(s: &str, from: usize, to: usize) -> String {
    s.chars().skip(from).take(to.saturating_sub(from)).collect()
}

impl Node {
    pub(crate) fn new(ty: Arc<NodeType>, attrs: Attrs, content: Fragment, marks: Vec<Mark>) -> Self {
        Self {
            ty,
            attrs,
            content,
            marks,
            text: None,
            text_len: 0,
        }
    }

    pub(crate) fn new_text(ty: Arc<NodeType>, text: String, marks: Vec<Mark>) -> Self {
        let text_len = text.chars().count();
        Self {
            ty,
            attrs: Attrs::new(),
            content: Fragment::empty(),
            marks,
            text: Some(text),
            text_len,
        }
    }

    pub fn ty(&self) -> &Arc<NodeType> {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&serde_json::Value> {
        self.attrs.get(name)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// The text of a text node.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Length of a text node in characters; zero for other nodes.
    pub fn text_len(&self) -> usize {
        self.text_len
    }

    pub fn node_size(&self) -> usize {
        if self.is_text() {
            self.text_len
        } else if self.is_leaf() {
            1
        } else {
            self.content.size() + 2
        }
    }

    pub fn child_count(&self) -> usize {
        self.content.child_count()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last_child()
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn is_inline(&self) -> bool {
        self.ty.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.ty.is_block()
    }

    pub fn is_textblock(&self) -> bool {
        self.ty.is_textblock()
    }

    pub fn inline_content(&self) -> bool {
        self.ty.inline_content()
    }

    pub fn is_leaf(&self) -> bool {
        self.ty.is_leaf()
    }

    pub fn is_atom(&self) -> bool {
        self.ty.is_atom()
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self.content.text_between(0, self.content.size(), "", ""),
        }
    }

    /// Text between two positions inside this node.
    pub fn text_between(&self, from: usize, to: usize, block_separator: &str) -> String {
        self.content.text_between(from, to, block_separator, "")
    }

    /// Whether two nodes share type, attributes and marks.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.has_markup(&other.ty, &other.attrs, &other.marks)
    }

    pub fn has_markup(&self, ty: &NodeType, attrs: &Attrs, marks: &[Mark]) -> bool {
        *self.ty == *ty && self.attrs == *attrs && Mark::same_set(&self.marks, marks)
    }

    /// Same markup, new content.
    pub fn copy(&self, content: Fragment) -> Node {
        Node {
            content,
            ..self.clone_markup()
        }
    }

    fn clone_markup(&self) -> Node {
        Node {
            ty: Arc::clone(&self.ty),
            attrs: self.attrs.clone(),
            content: Fragment::empty(),
            marks: self.marks.clone(),
            text: None,
            text_len: 0,
        }
    }

    /// Same node, different marks.
    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        Node {
            marks,
            ..self.clone()
        }
    }

    /// Same node, different attributes. Attributes are not validated.
    pub fn with_attrs(&self, attrs: Attrs) -> Node {
        Node {
            attrs,
            ..self.clone()
        }
    }

    /// A text node with the same marks and new text.
    pub fn with_text(&self, text: String) -> Node {
        Node::new_text(Arc::clone(&self.ty), text, self.marks.clone())
    }

    /// Cuts the node down to the range `from..to` of its content.
    pub fn cut(&self, from: usize, to: usize) -> Node {
        match &self.text {
            Some(text) => {
                if from == 0 && to >= self.text_len {
                    self.clone()
                } else {
                    self.with_text(char_slice(text, from, to))
                }
            }
            None => {
                if from == 0 && to == self.content.size() {
                    self.clone()
                } else {
                    self.copy(self.content.cut(from, to))
                }
            }
        }
    }

    /// The content between two positions as a slice.
    ///
    /// With `include_parents` the slice is opened all the way up to this node.
    pub fn slice(&self, from: usize, to: usize, include_parents: bool) -> ModelResult<Slice> {
        if from == to {
            return Ok(Slice::empty());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = if include_parents { 0 } else { rfrom.shared_depth(to) };
        let start = rfrom.start(depth);
        let node = rfrom.node(depth);
        let content = node.content().cut(rfrom.pos() - start, rto.pos() - start);
        Ok(Slice::new(content, rfrom.depth() - depth, rto.depth() - depth))
    }

    /// Replaces `from..to` with `slice`, returning the new node.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> ModelResult<Node> {
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        replace(&rfrom, &rto, slice)
    }

    /// Resolves a position inside this node.
    pub fn resolve(&self, pos: usize) -> ModelResult<ResolvedPos<'_>> {
        ResolvedPos::resolve(self, pos)
    }

    /// The node starting at `pos`, if any.
    pub fn node_at(&self, mut pos: usize) -> Option<&Node> {
        let mut node = self;
        loop {
            let (index, offset) = node.content.find_index(pos, false).ok()?;
            node = node.child(index)?;
            if offset == pos || node.is_text() {
                return Some(node);
            }
            pos -= offset + 1;
        }
    }

    /// Visits descendants overlapping `from..to`. See [`Fragment::nodes_between`].
    pub fn nodes_between<'a, F>(&'a self, from: usize, to: usize, mut f: F)
    where
        F: FnMut(&'a Node, usize, Option<&'a Node>, usize) -> bool,
    {
        self.content.nodes_between(from, to, &mut f, 0, Some(self));
    }

    /// Visits every descendant.
    pub fn descendants<'a, F>(&'a self, f: F)
    where
        F: FnMut(&'a Node, usize, Option<&'a Node>, usize) -> bool,
    {
        self.nodes_between(0, self.content.size(), f);
    }

    /// Whether any inline node in `from..to` carries a mark of type `ty`.
    pub fn range_has_mark(&self, from: usize, to: usize, ty: &MarkType) -> bool {
        let mut found = false;
        if to > from {
            self.nodes_between(from, to, |node, _, _, _| {
                if ty.is_in_set(node.marks()).is_some() {
                    found = true;
                }
                !found
            });
        }
        found
    }

    /// Whether replacing children `from..to` with `replacement` yields valid content.
    pub fn can_replace(&self, from: usize, to: usize, replacement: &Fragment) -> bool {
        if from > to || to > self.child_count() {
            return false;
        }
        let children = self.content.iter();
        let names: Vec<&str> = children
            .clone()
            .take(from)
            .chain(replacement.iter())
            .chain(children.skip(to))
            .map(Node::type_name)
            .collect();
        self.ty.content_expr().matches(&names) && replacement.iter().all(|n| self.ty.allows_marks(n.marks()))
    }

    /// Whether a node of type `ty` could replace children `from..to`.
    pub fn can_replace_with(&self, from: usize, to: usize, ty: &NodeType) -> bool {
        if from > to || to > self.child_count() {
            return false;
        }
        let names: Vec<&str> = self
            .content
            .iter()
            .take(from)
            .map(Node::type_name)
            .chain(std::iter::once(ty.name()))
            .chain(self.content.iter().skip(to).map(Node::type_name))
            .collect();
        self.ty.content_expr().matches(&names)
    }

    /// Checks the node and its descendants against the schema.
    pub fn check(&self) -> ModelResult<()> {
        if self.is_text() && self.text_len == 0 {
            return Err(ModelError::EmptyText);
        }
        for child in &self.content {
            if let Some(bad) = child.marks.iter().find(|m| !self.ty.allows_mark(m.ty().name())) {
                return Err(ModelError::MarkNotAllowed {
                    node: self.ty.name().to_string(),
                    mark: bad.ty().name().to_string(),
                });
            }
        }
        self.ty.check_content(&self.content)?;
        if !self.is_text() {
            self.ty.compute_attrs(Some(&self.attrs))?;
        }
        let normalized = self.marks.iter().fold(Vec::new(), |set, m| m.add_to_set(&set));
        if !Mark::same_set(&normalized, &self.marks) {
            return Err(ModelError::InvalidContent(format!(
                "invalid collection of marks for node {}: {:?}",
                self.ty.name(),
                self.marks
            )));
        }
        self.content.iter().try_for_each(Node::check)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.same_markup(other) && self.text == other.text && self.content == other.content
    }
}

fn write_marked(f: &mut fmt::Formatter<'_>, marks: &[Mark], base: String) -> fmt::Result {
    let wrapped = marks
        .iter()
        .rev()
        .fold(base, |acc, m| format!("{}({acc})", m.ty().name()));
    f.write_str(&wrapped)
}

impl fmt::Display for Node {
    /// Renders the node as `doc(paragraph("hi"))`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.text {
            return write_marked(f, &self.marks, format!("{text:?}"));
        }
        let mut out = self.ty.name().to_string();
        if self.content.size() > 0 {
            let children: Vec<String> = self.content.iter().map(|c| c.to_string()).collect();
            out = format!("{out}({})", children.join(", "));
        }
        write_marked(f, &self.marks, out)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
