//! Built-in editing commands.
//!
//! Each constructor returns a [`Command`] that yields a transaction when it
//! applies to the given state and `None` otherwise.

use crate::keymap::Command;
use crate::state::EditorState;
use folio_model::{Attrs, Fragment, MarkType, Node, NodeType, Schema};
use folio_transform::{Selection, Transaction};
use std::sync::Arc;

/// Toggles a mark on the selection. With an empty selection the mark is
/// toggled in the stored marks instead, so it applies to the next typed text.
pub fn toggle_mark(ty: &Arc<MarkType>, attrs: Option<Attrs>) -> Command {
    let ty = Arc::clone(ty);
    Arc::new(move |state: &EditorState| {
        let sel = state.selection();
        let mark = ty.create(attrs.as_ref()).ok()?;
        let mut tr = state.tr();
        if sel.is_empty() {
            let cursor = state.doc().resolve(sel.head).ok()?;
            let parent = cursor.parent();
            if !parent.inline_content() || !parent.ty().allows_mark(ty.name()) {
                return None;
            }
            let current = match state.stored_marks() {
                Some(marks) => marks.to_vec(),
                None => cursor.marks(),
            };
            if ty.is_in_set(&current).is_some() {
                tr.remove_stored_mark(&mark);
            } else {
                tr.add_stored_mark(&mark);
            }
            return Some(tr);
        }
        if !mark_applies(state.doc(), sel.from(), sel.to(), &ty) {
            return None;
        }
        if state.doc().range_has_mark(sel.from(), sel.to(), &ty) {
            tr.remove_mark_type(sel.from(), sel.to(), &ty).ok()?;
        } else {
            tr.add_mark(sel.from(), sel.to(), &mark).ok()?;
        }
        Some(tr)
    })
}

/// Whether some inline content in `from..to` sits in a parent allowing `ty`.
fn mark_applies(doc: &Node, from: usize, to: usize, ty: &MarkType) -> bool {
    let mut applies = false;
    doc.nodes_between(from, to, |node, _, _, _| {
        if applies {
            return false;
        }
        applies = node.inline_content() && node.ty().allows_mark(ty.name());
        true
    });
    applies
}

/// Turns the textblocks touched by the selection into `ty`.
pub fn set_block_type(ty: &Arc<NodeType>, attrs: Option<Attrs>) -> Command {
    let ty = Arc::clone(ty);
    Arc::new(move |state: &EditorState| {
        let sel = state.selection();
        let target_attrs = ty.compute_attrs(attrs.as_ref()).ok()?;
        let mut targets = Vec::new();
        state.doc().nodes_between(sel.from(), sel.to(), |node, pos, parent, index| {
            if !node.is_textblock() {
                return true;
            }
            let changes = !node.has_markup(&ty, &target_attrs, node.marks());
            if changes && parent.is_some_and(|p| p.can_replace_with(index, index + 1, &ty)) {
                targets.push(pos);
            }
            false
        });
        if targets.is_empty() {
            return None;
        }
        let mut tr = state.tr();
        for pos in targets {
            tr.set_node_markup(pos, Some(&ty), Some(&target_attrs), None).ok()?;
        }
        Some(tr)
    })
}

/// Wraps the blocks around the selection in `ty`, adding an inner wrapper
/// when `ty` cannot hold them directly (a list needs list items).
pub fn wrap_in(ty: &Arc<NodeType>, attrs: Option<Attrs>) -> Command {
    let ty = Arc::clone(ty);
    Arc::new(move |state: &EditorState| {
        let sel = state.selection();
        let mut tr = state.tr();
        wrap_range(&mut tr, sel.from(), sel.to(), &ty, attrs.as_ref())?;
        Some(tr)
    })
}

/// Inserts a node of type `ty` at the selection. Block nodes go after the
/// textblock holding the cursor.
pub fn insert_node(ty: &Arc<NodeType>, attrs: Option<Attrs>) -> Command {
    let ty = Arc::clone(ty);
    Arc::new(move |state: &EditorState| {
        let node = ty.create_checked(attrs.as_ref(), Fragment::empty(), Vec::new()).ok()?;
        let mut tr = state.tr();
        if node.is_inline() {
            tr.replace_selection_with(node).ok()?;
            return Some(tr);
        }
        let cursor = state.doc().resolve(state.selection().to()).ok()?;
        let pos = if cursor.parent().is_textblock() && cursor.depth() > 0 {
            cursor.after(cursor.depth())
        } else {
            cursor.pos()
        };
        let size = node.node_size();
        tr.insert(pos, vec![node]).ok()?;
        tr.set_selection(Selection::cursor(pos + size));
        Some(tr)
    })
}

/// Wraps the block range covering `from..to` in `ty`.
pub(crate) fn wrap_range(
    tr: &mut Transaction,
    from: usize,
    to: usize,
    ty: &Arc<NodeType>,
    attrs: Option<&Attrs>,
) -> Option<()> {
    let doc = tr.doc().clone();
    let rfrom = doc.resolve(from).ok()?;
    let rto = doc.resolve(to).ok()?;
    let lift = usize::from(rfrom.parent().inline_content() || from == to);
    let mut depth = rfrom.depth().checked_sub(lift)?;
    while to > rfrom.end(depth) {
        depth = depth.checked_sub(1)?;
    }

    let parent = rfrom.node(depth);
    let start_index = rfrom.index(depth);
    let end_index = rto.index_after(depth).max(start_index + 1);
    if !parent.can_replace_with(start_index, end_index, ty) {
        return None;
    }
    let children: Vec<Node> = (start_index..end_index)
        .filter_map(|i| parent.child(i).cloned())
        .collect();
    let start = rfrom.pos_at_index(start_index, depth);
    let end = start + children.iter().map(Node::node_size).sum::<usize>();
    let (wrapped, levels) = wrap_content(tr.schema(), ty, attrs, Fragment::from_vec(children))?;

    let sel = tr.selection();
    tr.replace_with(start, end, vec![wrapped]).ok()?;
    tr.set_selection(Selection::new(sel.anchor + levels, sel.head + levels));
    Some(())
}

/// Builds `ty` around `content`, trying one inner wrapper type when needed.
/// Returns the node and how many wrapper levels were added.
fn wrap_content(
    schema: &Schema,
    ty: &Arc<NodeType>,
    attrs: Option<&Attrs>,
    content: Fragment,
) -> Option<(Node, usize)> {
    if ty.valid_content(&content) {
        return Some((ty.create(attrs, content, Vec::new()).ok()?, 1));
    }
    for inner in schema.node_types() {
        if inner.is_inline() || inner == ty || !inner.valid_content(&content) {
            continue;
        }
        let Ok(inner_node) = inner.create(None, content.clone(), Vec::new()) else {
            continue;
        };
        let wrapped = Fragment::from_node(inner_node);
        if ty.valid_content(&wrapped) {
            return Some((ty.create(attrs, wrapped, Vec::new()).ok()?, 2));
        }
    }
    None
}
