mod common;

use common::{block_types, doc, editor, editor_with, p, title};
use folio_extension::builtin;
use folio_extension::{EditorState, Extension, ExtensionError, PlainExtension, Plugin, META_APPENDED_TRANSACTION};
use folio_transform::{Selection, Transaction};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn minimal() -> Vec<Extension> {
    vec![
        builtin::doc("paragraph+").into(),
        builtin::text().into(),
        builtin::paragraph().into(),
        builtin::bold().into(),
    ]
}

/// Appends `add` to the single paragraph once its text equals `when`.
struct Suffix {
    key: &'static str,
    when: &'static str,
    add: &'static str,
}

impl Plugin for Suffix {
    fn key(&self) -> &str {
        self.key
    }

    fn append_transaction(&self, _: &[Transaction], _: &EditorState, new_state: &EditorState) -> Option<Transaction> {
        let text = new_state.doc().text_content();
        if text != self.when {
            return None;
        }
        let mut tr = new_state.tr();
        tr.insert_text(self.add, 1 + text.chars().count()).ok()?;
        Some(tr)
    }
}

/// Refuses transactions tagged `blocked`.
struct Gate;

impl Plugin for Gate {
    fn key(&self) -> &str {
        "gate"
    }

    fn filter_transaction(&self, tr: &Transaction, _: &EditorState) -> bool {
        tr.get_meta("blocked").is_none()
    }
}

// ── Applying transactions ───────────────────────────────────────

#[test]
fn apply_leaves_old_state_untouched() {
    let editor = editor_with(minimal(), doc(vec![p("ab")]));
    let state = editor.state().clone();
    let mut tr = state.tr();
    tr.insert_text("x", 2).unwrap();
    let next = state.apply(tr).unwrap();

    assert_eq!(state.doc().text_content(), "ab");
    assert_eq!(next.doc().text_content(), "axb");
}

#[test]
fn stale_transaction_is_rejected() {
    let editor = editor_with(minimal(), doc(vec![p("ab")]));
    let state = editor.state().clone();
    let mut tr = state.tr();
    tr.insert_text("x", 2).unwrap();
    let next = state.apply(tr.clone()).unwrap();
    assert!(matches!(next.apply(tr), Err(ExtensionError::MismatchedTransaction)));
}

#[test]
fn stored_marks_survive_selection_free_transactions() {
    let editor = editor_with(minimal(), doc(vec![p("ab")]));
    let bold = editor.schema().mark("bold", None).unwrap();

    let mut tr = editor.state().tr();
    tr.add_stored_mark(&bold);
    let state = editor.state().apply(tr).unwrap();
    assert_eq!(state.stored_marks().unwrap().len(), 1);

    let mut tr = state.tr();
    tr.set_meta("note", true);
    let state = state.apply(tr).unwrap();
    assert_eq!(state.stored_marks().unwrap().len(), 1);

    let mut tr = state.tr();
    tr.set_selection(Selection::cursor(2));
    let state = state.apply(tr).unwrap();
    assert!(state.stored_marks().is_none());
}

// ── Plugins ─────────────────────────────────────────────────────

#[test]
fn appended_transactions_are_shown_to_every_plugin() {
    let mut extensions = minimal();
    extensions.push(
        PlainExtension::new("suffixes")
            .plugin(Suffix { key: "second", when: "ab", add: "c" })
            .plugin(Suffix { key: "first", when: "a", add: "b" })
            .into(),
    );
    let mut editor = editor_with(extensions, doc(vec![p("")]));

    let mut tr = editor.state().tr();
    tr.insert_text("a", 1).unwrap();
    let applied = editor.dispatch(tr).unwrap();

    assert_eq!(editor.doc().text_content(), "abc");
    assert_eq!(applied.len(), 3);
    let root = json!(applied[0].id());
    assert!(applied[0].get_meta(META_APPENDED_TRANSACTION).is_none());
    for appended in &applied[1..] {
        assert_eq!(appended.get_meta(META_APPENDED_TRANSACTION), Some(&root));
    }
}

#[test]
fn filtered_transaction_changes_nothing() {
    let mut extensions = minimal();
    extensions.push(PlainExtension::new("gate").plugin(Gate).into());
    let mut editor = editor_with(extensions, doc(vec![p("ab")]));

    let mut tr = editor.state().tr();
    tr.insert_text("x", 1).unwrap();
    tr.set_meta("blocked", true);
    let applied = editor.dispatch(tr).unwrap();

    assert!(applied.is_empty());
    assert_eq!(editor.doc().text_content(), "ab");
}

#[test]
fn filter_does_not_apply_to_remote_changes() {
    let mut extensions = minimal();
    extensions.push(PlainExtension::new("gate").plugin(Gate).into());
    let mut editor = editor_with(extensions, doc(vec![p("ab")]));

    let mut tr = editor.state().tr();
    tr.insert_text("x", 1).unwrap();
    tr.set_meta("blocked", true);
    editor.apply_remote(tr).unwrap();
    assert_eq!(editor.doc().text_content(), "xab");
}

#[test]
fn trailing_paragraph_is_restored() {
    let mut editor = editor(doc(vec![title("T"), p("body")]));
    let video = editor.schema().node("video_block", None, vec![], vec![]).unwrap();
    let end = editor.doc().content().size();
    let mut tr = editor.state().tr();
    tr.replace_with(3, end, vec![video]).unwrap();
    let applied = editor.dispatch(tr).unwrap();

    assert_eq!(applied.len(), 2);
    assert_eq!(block_types(&editor), vec!["title", "video_block", "paragraph"]);
    assert_eq!(editor.doc().child(2).unwrap().text_content(), "");
}

#[test]
fn code_blocks_get_distinct_editor_ids() {
    let code = json!({ "type": "code_block", "content": [{ "type": "text", "text": "x" }] });
    let mut editor = editor(doc(vec![title(""), code.clone(), code, p("")]));
    assert_eq!(editor.doc().child(1).unwrap().attr("editorId"), Some(&Value::Null));

    let mut tr = editor.state().tr();
    tr.set_selection(Selection::cursor(3));
    let applied = editor.dispatch(tr).unwrap();
    assert_eq!(applied.len(), 2);

    let id = |i: usize| editor.doc().child(i).unwrap().attr("editorId").cloned().unwrap();
    assert!(id(1).is_string());
    assert!(id(2).is_string());
    assert_ne!(id(1), id(2));

    let mut tr = editor.state().tr();
    tr.set_selection(Selection::cursor(4));
    assert_eq!(editor.dispatch(tr).unwrap().len(), 1);
}
