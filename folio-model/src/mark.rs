//! Marks: typed annotations on inline content.

use crate::attrs::Attrs;
use crate::schema::MarkType;
use std::fmt;
use std::sync::Arc;

/// A mark instance: a type plus attributes.
///
/// Mark sets are plain `Vec<Mark>` kept sorted by type rank; use
/// [`Mark::add_to_set`] and friends to maintain that order.
#[derive(Clone)]
pub struct Mark {
    ty: Arc<MarkType>,
    attrs: Attrs,
}

impl Mark {
    pub(crate) fn new(ty: Arc<MarkType>, attrs: Attrs) -> Self {
        Self { ty, attrs }
    }

    pub fn ty(&self) -> &Arc<MarkType> {
        &self.ty
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Adds this mark to `set`, honouring exclusion rules and rank order.
    ///
    /// If an existing mark excludes this one, the set is returned unchanged.
    /// Marks this one excludes are dropped.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut copy: Option<Vec<Mark>> = None;
        let mut placed = false;
        for (i, other) in set.iter().enumerate() {
            if self == other {
                return set.to_vec();
            }
            if self.ty.excludes(&other.ty) {
                copy.get_or_insert_with(|| set[..i].to_vec());
            } else if other.ty.excludes(&self.ty) {
                return set.to_vec();
            } else {
                if !placed && other.ty.rank() > self.ty.rank() {
                    copy.get_or_insert_with(|| set[..i].to_vec()).push(self.clone());
                    placed = true;
                }
                if let Some(copy) = copy.as_mut() {
                    copy.push(other.clone());
                }
            }
        }
        let mut copy = copy.unwrap_or_else(|| set.to_vec());
        if !placed {
            copy.push(self.clone());
        }
        copy
    }

    /// `set` without this exact mark.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| *m != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|m| m == self)
    }

    /// Whether two mark sets hold the same marks.
    pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
    }

    /// Builds a properly ordered set from arbitrary marks.
    pub fn set_from(marks: Vec<Mark>) -> Vec<Mark> {
        if marks.len() < 2 {
            return marks;
        }
        marks.iter().fold(Vec::new(), |set, m| m.add_to_set(&set))
    }
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name() == other.ty.name() && self.attrs == other.attrs
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs.is_empty() {
            write!(f, "{}", self.ty.name())
        } else {
            write!(f, "{}{:?}", self.ty.name(), self.attrs)
        }
    }
}
