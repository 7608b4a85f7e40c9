//! Text selections.

use crate::map::{Assoc, Mapping};
use folio_model::Node;
use serde::{Deserialize, Serialize};

/// A text selection: an anchor (the side that stays put) and a head (the
/// side that moves). Both are document positions; an empty selection is a
/// cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    #[must_use]
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// An empty selection at `pos`.
    #[must_use]
    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    /// The first position inside a textblock, or 0 for documents without one.
    #[must_use]
    pub fn at_start(doc: &Node) -> Self {
        let mut found = None;
        doc.descendants(|node, pos, _, _| {
            if found.is_some() {
                return false;
            }
            if node.is_textblock() {
                found = Some(pos + 1);
                return false;
            }
            true
        });
        Self::cursor(found.unwrap_or(0))
    }

    /// The last position inside a textblock.
    #[must_use]
    pub fn at_end(doc: &Node) -> Self {
        let mut found = None;
        doc.descendants(|node, pos, _, _| {
            if node.is_textblock() {
                found = Some(pos + 1 + node.content().size());
                return false;
            }
            true
        });
        Self::cursor(found.unwrap_or_else(|| doc.content().size()))
    }

    #[must_use]
    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    #[must_use]
    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Carries the selection through `mapping`, clamped to `doc`.
    #[must_use]
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> Self {
        let size = doc.content().size();
        let anchor = mapping.map(self.anchor, Assoc::After).min(size);
        let head = mapping.map(self.head, Assoc::After).min(size);
        Self { anchor, head }
    }
}
