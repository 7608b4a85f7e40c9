//! Shared editor fixtures.

#![allow(dead_code)]

use folio_extension::builtin::default_extensions;
use folio_extension::{Editor, EditorConfig, Extension};
use folio_transform::Selection;
use serde_json::{json, Value};

pub fn title(text: &str) -> Value {
    block("title", text)
}

pub fn p(text: &str) -> Value {
    block("paragraph", text)
}

pub fn block(ty: &str, text: &str) -> Value {
    if text.is_empty() {
        json!({ "type": ty })
    } else {
        json!({ "type": ty, "content": [{ "type": "text", "text": text }] })
    }
}

pub fn doc(blocks: Vec<Value>) -> Value {
    json!({ "type": "doc", "content": blocks })
}

/// An untitled document with one empty paragraph; the paragraph starts at 3.
pub fn empty_doc() -> Value {
    doc(vec![title(""), p("")])
}

pub fn editor(doc: Value) -> Editor {
    Editor::with_document(default_extensions(), EditorConfig::default(), doc).unwrap()
}

pub fn editor_with(extensions: Vec<Extension>, doc: Value) -> Editor {
    Editor::with_document(extensions, EditorConfig::default(), doc).unwrap()
}

pub fn set_cursor(editor: &mut Editor, pos: usize) {
    select(editor, pos, pos);
}

pub fn select(editor: &mut Editor, anchor: usize, head: usize) {
    let mut tr = editor.state().tr();
    tr.set_selection(Selection::new(anchor, head));
    editor.dispatch(tr).unwrap();
}

/// Types `text` one character at a time at the selection.
pub fn type_text(editor: &mut Editor, text: &str) {
    for ch in text.chars() {
        let sel = editor.state().selection();
        editor
            .handle_text_input(sel.from(), sel.to(), &ch.to_string())
            .unwrap();
    }
}

/// The document in its JSON wire form.
pub fn json_of(editor: &Editor) -> Value {
    editor.doc().to_value().unwrap()
}

/// Type names of the document's top-level blocks.
pub fn block_types(editor: &Editor) -> Vec<String> {
    (0..editor.doc().child_count())
        .filter_map(|i| editor.doc().child(i))
        .map(|n| n.type_name().to_string())
        .collect()
}
