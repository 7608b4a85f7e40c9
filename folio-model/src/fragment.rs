//! Fragments: ordered sequences of sibling nodes.

use crate::error::{ModelError, ModelResult};
use crate::node::Node;
use std::fmt;

/// A node's children together with their combined size.
#[derive(Clone, Default, PartialEq)]
pub struct Fragment {
    content: Vec<Node>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a fragment, merging adjacent text nodes with identical marks.
    pub fn from_vec(nodes: Vec<Node>) -> Self {
        let mut content: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut size = 0;
        for node in nodes {
            size += node.node_size();
            match content.last_mut() {
                Some(last) if last.is_text() && node.is_text() && last.same_markup(&node) => {
                    let joined = format!("{}{}", last.text().unwrap_or_default(), node.text().unwrap_or_default());
                    *last = last.with_text(joined);
                }
                _ => content.push(node),
            }
        }
        Self { content, size }
    }

    pub fn from_node(node: Node) -> Self {
        let size = node.node_size();
        Self {
            content: vec![node],
            size,
        }
    }

    /// Total size of the content in position units.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.content.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn into_vec(self) -> Vec<Node> {
        self.content
    }

    /// Concatenates two fragments, joining text at the seam.
    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.size == 0 {
            return self.clone();
        }
        if self.size == 0 {
            return other.clone();
        }
        let mut content = self.content.clone();
        content.extend(other.content.iter().cloned());
        Fragment::from_vec(content)
    }

    /// The part of the fragment between two positions.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to == self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        let mut size = 0;
        if to > from {
            let mut pos = 0;
            for child in &self.content {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let piece = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), (to - pos).min(child.text_len()))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                (to - pos - 1).min(child.content().size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    size += piece.node_size();
                    result.push(piece);
                }
                pos = end;
            }
        }
        Fragment {
            content: result,
            size,
        }
    }

    /// The children between two indices.
    pub fn cut_by_index(&self, from: usize, to: usize) -> Fragment {
        let to = to.min(self.content.len());
        let from = from.min(to);
        let content: Vec<Node> = self.content[from..to].to_vec();
        let size = content.iter().map(Node::node_size).sum();
        Fragment { content, size }
    }

    /// Replaces the child at `index`.
    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut content = self.content.clone();
        if let Some(slot) = content.get_mut(index) {
            *slot = node;
        }
        let size = content.iter().map(Node::node_size).sum();
        Fragment { content, size }
    }

    pub fn add_to_start(&self, node: Node) -> Fragment {
        let mut content = Vec::with_capacity(self.content.len() + 1);
        content.push(node);
        content.extend(self.content.iter().cloned());
        Fragment::from_vec(content)
    }

    pub fn add_to_end(&self, node: Node) -> Fragment {
        let mut content = self.content.clone();
        content.push(node);
        Fragment::from_vec(content)
    }

    /// Finds the child index at `pos`.
    ///
    /// Returns `(index, offset)` where `offset` is the start of that child. A
    /// position inside a child rounds down to it, or past it when `round_up`.
    pub fn find_index(&self, pos: usize, round_up: bool) -> ModelResult<(usize, usize)> {
        if pos == 0 {
            return Ok((0, 0));
        }
        if pos == self.size {
            return Ok((self.content.len(), pos));
        }
        if pos > self.size {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: self.size,
            });
        }
        let mut cur = 0;
        for (i, child) in self.content.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos || round_up {
                    return Ok((i + 1, end));
                }
                return Ok((i, cur));
            }
            cur = end;
        }
        Err(ModelError::PositionOutOfRange {
            pos,
            size: self.size,
        })
    }

    /// Calls `f` for every node overlapping `from..to`, descending into
    /// children while `f` returns true. `f` receives the node, its absolute
    /// start position, its parent and its index in the parent.
    pub fn nodes_between<'a, F>(
        &'a self,
        from: usize,
        to: usize,
        f: &mut F,
        node_start: usize,
        parent: Option<&'a Node>,
    ) where
        F: FnMut(&'a Node, usize, Option<&'a Node>, usize) -> bool,
    {
        let mut pos = 0;
        for (i, child) in self.content.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, i) && child.content().size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    child.content().size().min(to - start),
                    f,
                    node_start + start,
                    Some(child),
                );
            }
            pos = end;
        }
    }

    /// Text between two positions, with `block_separator` between blocks
    /// and `leaf_text` standing in for non-text leaves.
    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: &str,
        leaf_text: &str,
    ) -> String {
        let mut text = String::new();
        let mut first = true;
        self.nodes_between(
            from,
            to,
            &mut |node: &Node, pos: usize, _parent, _index| {
                let node_text: String = if let Some(t) = node.text() {
                    let start = from.saturating_sub(pos);
                    let end = (to - pos).min(node.text_len());
                    t.chars().skip(start).take(end.saturating_sub(start)).collect()
                } else if node.is_leaf() {
                    leaf_text.to_string()
                } else {
                    String::new()
                };
                let separates = node.is_block()
                    && ((node.is_leaf() && !node_text.is_empty()) || node.is_textblock());
                if separates && !block_separator.is_empty() {
                    if first {
                        first = false;
                    } else {
                        text.push_str(block_separator);
                    }
                }
                text.push_str(&node_text);
                true
            },
            0,
            None,
        );
        text
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.content.iter()
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        for (i, child) in self.content.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{child:?}")?;
        }
        f.write_str(">")
    }
}
