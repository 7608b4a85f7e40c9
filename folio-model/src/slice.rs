//! Slices: fragments with open ends.

use crate::fragment::Fragment;
use std::fmt;

/// A piece of document cut out of its context.
///
/// `open_start` and `open_end` count how many nodes on each side are cut
/// open, e.g. the slice between two paragraphs' middles has both set to 1.
#[derive(Clone, Default, PartialEq)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
        Self {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A closed slice holding `content` as is.
    pub fn closed(content: Fragment) -> Self {
        Self::new(content, 0, 0)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn open_start(&self) -> usize {
        self.open_start
    }

    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// Size the slice adds when inserted.
    pub fn size(&self) -> usize {
        self.content.size().saturating_sub(self.open_start + self.open_end)
    }

    /// Opens the slice as far as possible on both sides.
    pub fn max_open(content: Fragment) -> Self {
        let mut open_start = 0;
        let mut node = content.first_child();
        while let Some(n) = node {
            if n.is_leaf() || n.is_text() {
                break;
            }
            open_start += 1;
            node = n.first_child();
        }
        let mut open_end = 0;
        let mut node = content.last_child();
        while let Some(n) = node {
            if n.is_leaf() || n.is_text() {
                break;
            }
            open_end += 1;
            node = n.last_child();
        }
        Self::new(content, open_start, open_end)
    }
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({},{})", self.content, self.open_start, self.open_end)
    }
}
