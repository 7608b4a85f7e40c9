use crate::commands::{insert_node, set_block_type, wrap_in};
use crate::extension::NodeExtension;
use crate::input_rules::{textblock_type_input_rule, wrapping_input_rule, InputRule, RuleMatch};
use crate::keymap::Keymap;
use crate::plugin::Plugin;
use crate::state::EditorState;
use folio_model::{AttrSpec, Attrs, Fragment, Node, NodeSpec};
use folio_transform::{Selection, Transaction};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

fn attrs(value: Value) -> Option<Attrs> {
    serde_json::from_value(value).ok()
}

fn no_attrs() -> Arc<dyn Fn(&RuleMatch) -> Option<Attrs> + Send + Sync> {
    Arc::new(|_: &RuleMatch| None)
}

/// The top node. `content` is its content expression.
pub fn doc(content: &str) -> NodeExtension {
    NodeExtension::new("doc", NodeSpec::new().content(content))
}

pub fn text() -> NodeExtension {
    NodeExtension::new("text", NodeSpec::new().group("inline"))
}

/// The document title. Enter moves the cursor into the following block.
pub fn title() -> NodeExtension {
    NodeExtension::new("title", NodeSpec::new().content("text*").marks("").defining()).keymap(|ty| {
        let name = ty.name().to_string();
        Keymap::new().bind("Enter", move |state: &EditorState| {
            let cursor = state.doc().resolve(state.selection().from()).ok()?;
            if cursor.parent().type_name() != name || cursor.depth() == 0 {
                return None;
            }
            let after = cursor.after(cursor.depth());
            let next = state.doc().node_at(after)?;
            let target = if next.is_textblock() { after + 1 } else { after };
            let mut tr = state.tr();
            tr.set_selection(Selection::cursor(target));
            Some(tr)
        })
    })
}

/// Keeps a paragraph at the end of the document so there is always
/// somewhere to type after the last block.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsureTrailingParagraph;

impl Plugin for EnsureTrailingParagraph {
    fn key(&self) -> &str {
        "trailing_paragraph"
    }

    fn append_transaction(
        &self,
        _transactions: &[Transaction],
        _old_state: &EditorState,
        new_state: &EditorState,
    ) -> Option<Transaction> {
        let doc = new_state.doc();
        if doc.last_child().is_some_and(|n| n.type_name() == "paragraph") {
            return None;
        }
        let ty = new_state.schema().node_type("paragraph")?;
        let end = doc.child_count();
        if !doc.can_replace_with(end, end, ty) {
            return None;
        }
        let paragraph = ty.create(None, Fragment::empty(), Vec::new()).ok()?;
        let mut tr = new_state.tr();
        tr.insert(doc.content().size(), vec![paragraph]).ok()?;
        Some(tr)
    }
}

pub fn paragraph() -> NodeExtension {
    NodeExtension::new("paragraph", NodeSpec::new().content("inline*").group("block"))
        .keymap(|ty| Keymap::new().bind_command("Mod-Alt-0", set_block_type(ty, None)))
        .plugin(EnsureTrailingParagraph)
}

/// Headings, levels 1 to 6. `## ` at the start of a paragraph makes a
/// level-2 heading.
pub fn heading() -> NodeExtension {
    let spec = NodeSpec::new()
        .content("text*")
        .marks("")
        .group("block")
        .defining()
        .attr("level", AttrSpec::with_default(1));
    NodeExtension::new("heading", spec)
        .input_rules(|ty| {
            let level = Arc::new(|m: &RuleMatch| attrs(json!({ "level": m.get(1)?.len() })));
            Ok(vec![textblock_type_input_rule(r"^(#{1,6})\s$", ty, level)?])
        })
        .keymap(|ty| {
            (1..=6).fold(Keymap::new(), |keymap, level| {
                keymap.bind_command(
                    format!("Shift-Ctrl-{level}"),
                    set_block_type(ty, attrs(json!({ "level": level }))),
                )
            })
        })
}

pub fn blockquote() -> NodeExtension {
    NodeExtension::new("blockquote", NodeSpec::new().content("block+").group("block").defining())
        .input_rules(|ty| Ok(vec![wrapping_input_rule(r"^\s*>\s$", ty, no_attrs())?]))
        .keymap(|ty| Keymap::new().bind_command("Ctrl->", wrap_in(ty, None)))
}

pub fn bullet_list() -> NodeExtension {
    NodeExtension::new("bullet_list", NodeSpec::new().content("list_item+").group("block"))
        .input_rules(|ty| Ok(vec![wrapping_input_rule(r"^\s*([-+*])\s$", ty, no_attrs())?]))
        .keymap(|ty| Keymap::new().bind_command("Shift-Ctrl-8", wrap_in(ty, None)))
}

/// Numbered lists. `3. ` starts a list numbered from 3.
pub fn ordered_list() -> NodeExtension {
    let spec = NodeSpec::new()
        .content("list_item+")
        .group("block")
        .attr("order", AttrSpec::with_default(1));
    NodeExtension::new("ordered_list", spec)
        .input_rules(|ty| {
            let order = Arc::new(|m: &RuleMatch| {
                let order: u64 = m.get(1)?.parse().ok()?;
                attrs(json!({ "order": order }))
            });
            Ok(vec![wrapping_input_rule(r"^(\d+)\.\s$", ty, order)?])
        })
        .keymap(|ty| Keymap::new().bind_command("Shift-Ctrl-9", wrap_in(ty, None)))
}

pub fn list_item() -> NodeExtension {
    NodeExtension::new("list_item", NodeSpec::new().content("paragraph block*").defining())
}

/// Checklists. `[] ` or `[ ] ` starts one; Mod-Enter toggles the item
/// holding the cursor.
pub fn todo_list() -> NodeExtension {
    let item = NodeExtension::new(
        "todo_item",
        NodeSpec::new()
            .content("paragraph block*")
            .defining()
            .attr("checked", AttrSpec::with_default(false)),
    )
    .keymap(|ty| {
        let name = ty.name().to_string();
        Keymap::new().bind("Mod-Enter", move |state: &EditorState| {
            let cursor = state.doc().resolve(state.selection().from()).ok()?;
            let depth = (1..=cursor.depth())
                .rev()
                .find(|&d| cursor.node(d).type_name() == name)?;
            let checked = cursor.node(depth).attr("checked").and_then(Value::as_bool).unwrap_or(false);
            let mut tr = state.tr();
            tr.set_node_attribute(cursor.before(depth), "checked", Value::Bool(!checked))
                .ok()?;
            Some(tr)
        })
    });

    NodeExtension::new("todo_list", NodeSpec::new().content("todo_item+").group("block"))
        .input_rules(|ty| Ok(vec![wrapping_input_rule(r"^(\[\s?\])\s$", ty, no_attrs())?]))
        .child(item)
}

/// Gives every code block a unique `editorId`, so hosts can attach an
/// embedded code editor to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeBlockIds;

impl Plugin for CodeBlockIds {
    fn key(&self) -> &str {
        "code_block_ids"
    }

    fn append_transaction(
        &self,
        _transactions: &[Transaction],
        _old_state: &EditorState,
        new_state: &EditorState,
    ) -> Option<Transaction> {
        let mut missing = Vec::new();
        new_state.doc().descendants(|node, pos, _, _| {
            if node.type_name() == "code_block" {
                if node.attr("editorId").is_none_or(Value::is_null) {
                    missing.push(pos);
                }
                return false;
            }
            true
        });
        if missing.is_empty() {
            return None;
        }
        let mut tr = new_state.tr();
        for pos in missing {
            tr.set_node_attribute(pos, "editorId", Value::String(Uuid::new_v4().to_string()))
                .ok()?;
        }
        Some(tr)
    }
}

/// Code blocks. A fence (```` ```rust ````) at the start of a paragraph
/// turns it into one.
pub fn code_block() -> NodeExtension {
    let spec = NodeSpec::new()
        .content("text*")
        .marks("")
        .group("block")
        .code()
        .defining()
        .isolating()
        .attr("editorId", AttrSpec::nullable())
        .attr("language", AttrSpec::nullable());
    NodeExtension::new("code_block", spec)
        .input_rules(|ty| {
            let language = Arc::new(|m: &RuleMatch| attrs(json!({ "language": m.get(1) })));
            Ok(vec![textblock_type_input_rule(r"^```([a-z]+)?\s$", ty, language)?])
        })
        .keymap(|ty| Keymap::new().bind_command("Shift-Ctrl-\\", set_block_type(ty, None)))
        .plugin(CodeBlockIds)
}

/// Image figures with a caption. `src` holds a content handle for the
/// uploaded image.
pub fn image_block() -> NodeExtension {
    let caption = NodeExtension::new("image_block_caption", NodeSpec::new().content("text*").marks(""));
    let spec = NodeSpec::new()
        .content("image_block_caption")
        .marks("")
        .group("block")
        .isolating()
        .attr("src", AttrSpec::nullable())
        .attr("naturalWidth", AttrSpec::nullable())
        .attr("naturalHeight", AttrSpec::nullable())
        .attr("thumbnail", AttrSpec::nullable());
    NodeExtension::new("image_block", spec).child(caption)
}

/// Video figures. `src` holds a content handle for the uploaded video.
pub fn video_block() -> NodeExtension {
    let spec = NodeSpec::new()
        .marks("")
        .group("block")
        .atom()
        .defining()
        .isolating()
        .attr("src", AttrSpec::nullable())
        .attr("caption", AttrSpec::nullable());
    NodeExtension::new("video_block", spec)
}

/// Inline math written between dollar signs, with display math
/// (`$$ ` on an empty line) as a child node.
pub fn math_inline() -> NodeExtension {
    let display = NodeExtension::new(
        "math_display",
        NodeSpec::new().content("text*").group("block").atom().code(),
    )
    .input_rules(|ty| Ok(vec![textblock_type_input_rule(r"^\$\$\s+$", ty, no_attrs())?]));

    NodeExtension::new(
        "math_inline",
        NodeSpec::new().content("text*").group("inline").inline().atom(),
    )
    .input_rules(|ty| {
        let ty = Arc::clone(ty);
        Ok(vec![InputRule::new(r"\$([^$]+)\$$", move |state, m, start, end| {
            let formula = state.schema().text(m.get(1)?, Vec::new()).ok()?;
            let node: Node = ty.create_checked(None, Fragment::from_node(formula), Vec::new()).ok()?;
            let mut tr = state.tr();
            tr.replace_with(start, end, vec![node]).ok()?;
            Some(tr)
        })?])
    })
    .keymap(|ty| Keymap::new().bind_command("Mod-Space", insert_node(ty, None)))
    .child(display)
}

pub fn hard_break() -> NodeExtension {
    NodeExtension::new("hard_break", NodeSpec::new().inline().group("inline"))
        .keymap(|ty| Keymap::new().bind_command("Shift-Enter", insert_node(ty, None)))
}
