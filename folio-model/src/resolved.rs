//! Resolved positions.

use crate::error::{ModelError, ModelResult};
use crate::mark::Mark;
use crate::node::Node;

#[derive(Debug, Clone, Copy)]
struct PathEntry<'a> {
    node: &'a Node,
    index: usize,
    /// Absolute position of the start of child `index`.
    offset: usize,
}

/// A position together with the path of ancestors that contain it.
///
/// Depth 0 is the document itself; [`ResolvedPos::depth`] is the depth of the
/// innermost node whose content holds the position.
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pos: usize,
    path: Vec<PathEntry<'a>>,
    parent_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub(crate) fn resolve(doc: &'a Node, pos: usize) -> ModelResult<Self> {
        if pos > doc.content().size() {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: doc.content().size(),
            });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc;
        loop {
            let (index, offset) = node.content().find_index(parent_offset, false)?;
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node,
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            node = match node.child(index) {
                Some(child) => child,
                None => break,
            };
            if node.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
        }
        Ok(Self {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Offset of the position inside its parent's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    pub fn parent(&self) -> &'a Node {
        self.node(self.depth())
    }

    pub fn doc(&self) -> &'a Node {
        self.node(0)
    }

    /// The ancestor at `depth`. Depths beyond [`Self::depth`] clamp to the parent.
    pub fn node(&self, depth: usize) -> &'a Node {
        self.path[depth.min(self.depth())].node
    }

    /// Index into the ancestor at `depth`.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth.min(self.depth())].index
    }

    /// Index pointing after this position in the ancestor at `depth`.
    pub fn index_after(&self, depth: usize) -> usize {
        let extra = usize::from(!(depth == self.depth() && self.text_offset() == 0));
        self.index(depth) + extra
    }

    /// Start position of the content of the ancestor at `depth`.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].offset + 1
        }
    }

    /// End position of the content of the ancestor at `depth`.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content().size()
    }

    /// Position directly before the ancestor at `depth` (which must be > 0).
    pub fn before(&self, depth: usize) -> usize {
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth.saturating_sub(1)].offset
        }
    }

    /// Position directly after the ancestor at `depth` (which must be > 0).
    pub fn after(&self, depth: usize) -> usize {
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth.saturating_sub(1)].offset + self.path[depth.min(self.depth())].node.node_size()
        }
    }

    /// Offset into a text node when the position points inside one.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    /// The node directly after the position, cut when inside text.
    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.child(index)?;
        let d_off = self.text_offset();
        Some(if d_off > 0 {
            child.cut(d_off, child.text_len())
        } else {
            child.clone()
        })
    }

    /// The node directly before the position, cut when inside text.
    pub fn node_before(&self) -> Option<Node> {
        let index = self.index(self.depth());
        let d_off = self.text_offset();
        if d_off > 0 {
            return self.parent().child(index).map(|c| c.cut(0, d_off));
        }
        if index == 0 {
            None
        } else {
            self.parent().child(index - 1).cloned()
        }
    }

    /// Position of child `index` in the ancestor at `depth`.
    pub fn pos_at_index(&self, index: usize, depth: usize) -> usize {
        let node = self.node(depth);
        let start = self.start(depth);
        start + node.content().iter().take(index).map(Node::node_size).sum::<usize>()
    }

    /// Marks that text inserted here would get.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if parent.content().size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return parent.child(index).map(|c| c.marks().to_vec()).unwrap_or_default();
        }
        let before = index.checked_sub(1).and_then(|i| parent.child(i));
        let after = parent.child(index);
        let (main, other) = match before {
            Some(b) => (Some(b), after),
            None => (after, None),
        };
        let Some(main) = main else {
            return Vec::new();
        };
        main.marks()
            .iter()
            .filter(|m| m.ty().is_inclusive() || other.is_some_and(|o| m.is_in_set(o.marks())))
            .cloned()
            .collect()
    }

    /// Deepest depth whose content contains both this position and `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        (1..=self.depth())
            .rev()
            .find(|&d| self.start(d) <= pos && self.end(d) >= pos)
            .unwrap_or(0)
    }

    pub fn same_parent(&self, other: &ResolvedPos<'_>) -> bool {
        self.pos - self.parent_offset == other.pos - other.parent_offset
    }
}
