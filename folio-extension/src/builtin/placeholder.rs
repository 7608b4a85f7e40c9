use crate::extension::PlainExtension;
use crate::plugin::{Decoration, Plugin};
use crate::state::EditorState;
use std::collections::BTreeMap;

pub const TITLE_PLACEHOLDER: &str = "Untitled";
pub const BODY_PLACEHOLDER: &str = "Write something...";

/// Shows placeholder text in an empty title, and in the first empty
/// paragraph while the body has no text at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Placeholder;

fn widget(pos: usize, text: &str) -> Decoration {
    let attrs = BTreeMap::from([
        ("class".to_string(), "folio-placeholder".to_string()),
        ("data-placeholder".to_string(), text.to_string()),
    ]);
    Decoration::Widget { pos, attrs }
}

impl Plugin for Placeholder {
    fn key(&self) -> &str {
        "placeholder"
    }

    fn decorations(&self, state: &EditorState) -> Vec<Decoration> {
        let doc = state.doc();
        let mut decorations = Vec::new();

        let empty_title = doc
            .first_child()
            .is_some_and(|n| n.type_name() == "title" && n.text_content().trim().is_empty());
        if empty_title {
            decorations.push(widget(1, TITLE_PLACEHOLDER));
        }

        let mut has_content = false;
        let mut empty_paragraph = None;
        doc.descendants(|node, pos, _, _| {
            let blank = node.text_content().trim().is_empty();
            if node.type_name() != "title" && node.is_textblock() && !blank {
                has_content = true;
            }
            if empty_paragraph.is_none() && node.type_name() == "paragraph" && blank {
                empty_paragraph = Some(pos);
            }
            true
        });
        if let (false, Some(pos)) = (has_content, empty_paragraph) {
            decorations.push(widget(pos, BODY_PLACEHOLDER));
        }
        decorations
    }
}

pub fn placeholder() -> PlainExtension {
    PlainExtension::new("placeholder").plugin(Placeholder)
}
