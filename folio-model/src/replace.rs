//! The replace algorithm.
//!
//! Replacing a range with a slice joins the slice's open sides onto the nodes
//! around the range. Every node whose content is touched is re-checked against
//! its content expression; a replacement that would leave invalid content
//! fails instead of producing a malformed tree.

use crate::error::{ModelResult, ReplaceError};
use crate::fragment::Fragment;
use crate::node::Node;
use crate::resolved::ResolvedPos;
use crate::slice::Slice;

pub(crate) fn replace(from: &ResolvedPos<'_>, to: &ResolvedPos<'_>, slice: &Slice) -> ModelResult<Node> {
    if slice.open_start() > from.depth() {
        return Err(ReplaceError::TooDeep.into());
    }
    if slice.open_end() > to.depth()
        || from.depth() - slice.open_start() != to.depth() - slice.open_end()
    {
        return Err(ReplaceError::InconsistentOpenDepths.into());
    }
    replace_outer(from, to, slice, 0)
}

fn replace_outer(
    from: &ResolvedPos<'_>,
    to: &ResolvedPos<'_>,
    slice: &Slice,
    depth: usize,
) -> ModelResult<Node> {
    let index = from.index(depth);
    let node = from.node(depth);
    if index == to.index(depth) && depth < from.depth() - slice.open_start() {
        let inner = replace_outer(from, to, slice, depth + 1)?;
        Ok(node.copy(node.content().replace_child(index, inner)))
    } else if slice.content().size() == 0 {
        close(node, replace_two_way(from, to, depth)?)
    } else if slice.open_start() == 0
        && slice.open_end() == 0
        && from.depth() == depth
        && to.depth() == depth
    {
        let parent = from.parent();
        let content = parent.content();
        let joined = content
            .cut(0, from.parent_offset())
            .append(slice.content())
            .append(&content.cut(to.parent_offset(), content.size()));
        close(parent, joined)
    } else {
        let extra = from.depth() - slice.open_start();
        let prepared = prepare_slice_for_replace(slice, from);
        let start = prepared.resolve(slice.open_start() + extra)?;
        let end = prepared.resolve(prepared.content().size() - slice.open_end() - extra)?;
        close(node, replace_three_way(from, &start, &end, to, depth)?)
    }
}

fn check_join(main: &Node, sub: &Node) -> ModelResult<()> {
    if sub.ty().compatible_content(main.ty()) {
        Ok(())
    } else {
        Err(ReplaceError::CannotJoin {
            main: main.type_name().to_string(),
            sub: sub.type_name().to_string(),
        }
        .into())
    }
}

fn joinable<'a>(before: &ResolvedPos<'a>, after: &ResolvedPos<'_>, depth: usize) -> ModelResult<&'a Node> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node)
}

fn add_node(child: Node, target: &mut Vec<Node>) {
    if let Some(last) = target.last_mut() {
        if child.is_text() && last.is_text() && child.same_markup(last) {
            let joined = format!(
                "{}{}",
                last.text().unwrap_or_default(),
                child.text().unwrap_or_default()
            );
            *last = last.with_text(joined);
            return;
        }
    }
    target.push(child);
}

fn add_range(
    start: Option<&ResolvedPos<'_>>,
    end: Option<&ResolvedPos<'_>>,
    depth: usize,
    target: &mut Vec<Node>,
) {
    let Some(node) = end.or(start).map(|p| p.node(depth)) else {
        return;
    };
    let mut start_index = 0;
    let end_index = end.map_or(node.child_count(), |e| e.index(depth));
    if let Some(start) = start {
        start_index = start.index(depth);
        if start.depth() > depth {
            start_index += 1;
        } else if start.text_offset() > 0 {
            if let Some(after) = start.node_after() {
                add_node(after, target);
            }
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        if let Some(child) = node.child(i) {
            add_node(child.clone(), target);
        }
    }
    if let Some(end) = end {
        if end.depth() == depth && end.text_offset() > 0 {
            if let Some(before) = end.node_before() {
                add_node(before, target);
            }
        }
    }
}

fn close(node: &Node, content: Fragment) -> ModelResult<Node> {
    node.ty().check_content(&content)?;
    Ok(node.copy(content))
}

fn replace_three_way(
    from: &ResolvedPos<'_>,
    start: &ResolvedPos<'_>,
    end: &ResolvedPos<'_>,
    to: &ResolvedPos<'_>,
    depth: usize,
) -> ModelResult<Fragment> {
    let open_start = if from.depth() > depth {
        Some(joinable(from, start, depth + 1)?)
    } else {
        None
    };
    let open_end = if to.depth() > depth {
        Some(joinable(end, to, depth + 1)?)
    } else {
        None
    };

    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    match (open_start, open_end) {
        (Some(os), Some(oe)) if start.index(depth) == end.index(depth) => {
            check_join(os, oe)?;
            let inner = replace_three_way(from, start, end, to, depth + 1)?;
            add_node(close(os, inner)?, &mut content);
        }
        _ => {
            if let Some(os) = open_start {
                let inner = replace_two_way(from, start, depth + 1)?;
                add_node(close(os, inner)?, &mut content);
            }
            add_range(Some(start), Some(end), depth, &mut content);
            if let Some(oe) = open_end {
                let inner = replace_two_way(end, to, depth + 1)?;
                add_node(close(oe, inner)?, &mut content);
            }
        }
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_vec(content))
}

fn replace_two_way(from: &ResolvedPos<'_>, to: &ResolvedPos<'_>, depth: usize) -> ModelResult<Fragment> {
    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    if from.depth() > depth {
        let ty = joinable(from, to, depth + 1)?;
        let inner = replace_two_way(from, to, depth + 1)?;
        add_node(close(ty, inner)?, &mut content);
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_vec(content))
}

/// Wraps the slice's content in copies of the ancestors of `along` so its
/// open sides can be resolved like a document.
fn prepare_slice_for_replace(slice: &Slice, along: &ResolvedPos<'_>) -> Node {
    let extra = along.depth() - slice.open_start();
    let parent = along.node(extra);
    let mut node = parent.copy(slice.content().clone());
    for i in (0..extra).rev() {
        node = along.node(i).copy(Fragment::from_node(node));
    }
    node
}
