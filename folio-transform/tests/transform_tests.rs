mod common;

use common::{attrs, br, doc, doc_of, h, mark, p, schema, t, tm};
use folio_model::Slice;
use folio_transform::{Assoc, Selection, Step, Transaction, Transform};
use pretty_assertions::assert_eq;
use serde_json::json;

// ── Transform ───────────────────────────────────────────────────

#[test]
fn steps_and_docs_are_recorded() {
    let s = schema();
    let d = doc_of(&s, &["ab"]);
    let mut tr = Transform::new(s.clone(), d.clone());
    tr.insert_text("X", 2).unwrap().delete(1, 2).unwrap();
    assert_eq!(tr.steps().len(), 2);
    assert_eq!(tr.docs().len(), 2);
    assert_eq!(tr.before(), &d);
    assert_eq!(tr.doc(), &doc_of(&s, &["Xb"]));
    assert!(tr.doc_changed());
}

#[test]
fn empty_replace_adds_no_step() {
    let s = schema();
    let mut tr = Transform::new(s.clone(), doc_of(&s, &["ab"]));
    tr.replace(1, 1, Slice::empty()).unwrap();
    assert!(!tr.doc_changed());
}

#[test]
fn failed_step_leaves_transform_unchanged() {
    let s = schema();
    let d = doc_of(&s, &["ab"]);
    let mut tr = Transform::new(s.clone(), d.clone());
    assert!(tr.maybe_step(Step::replace(0, 4, Slice::empty())).is_err());
    assert_eq!(tr.doc(), &d);
    assert!(tr.steps().is_empty());
    assert!(tr.mapping().is_empty());
}

#[test]
fn insert_text_inherits_marks() {
    let s = schema();
    let d = doc(&s, vec![p(&s, vec![tm(&s, "ab", &["bold"])])]);
    let mut tr = Transform::new(s.clone(), d);
    tr.insert_text("X", 2).unwrap();
    assert_eq!(tr.doc(), &doc(&s, vec![p(&s, vec![tm(&s, "aXb", &["bold"])])]));
}

#[test]
fn mapping_follows_steps() {
    let s = schema();
    let mut tr = Transform::new(s.clone(), doc_of(&s, &["abc"]));
    tr.insert_text("XY", 1).unwrap();
    assert_eq!(tr.mapping().map(3, Assoc::After), 5);
    assert_eq!(tr.mapping().map(1, Assoc::Before), 1);
}

// ── Marks ───────────────────────────────────────────────────────

#[test]
fn add_mark_across_blocks() {
    let s = schema();
    let mut tr = Transform::new(s.clone(), doc_of(&s, &["ab", "cd"]));
    tr.add_mark(2, 6, &mark(&s, "bold")).unwrap();
    assert_eq!(
        tr.doc(),
        &doc(
            &s,
            vec![
                p(&s, vec![t(&s, "a"), tm(&s, "b", &["bold"])]),
                p(&s, vec![tm(&s, "c", &["bold"]), t(&s, "d")]),
            ]
        )
    );
    assert_eq!(tr.steps().len(), 2);
}

#[test]
fn add_mark_already_present_is_a_no_op() {
    let s = schema();
    let mut tr = Transform::new(s.clone(), doc(&s, vec![p(&s, vec![tm(&s, "ab", &["bold"])])]));
    tr.add_mark(1, 3, &mark(&s, "bold")).unwrap();
    assert!(!tr.doc_changed());
}

#[test]
fn exclusive_mark_replaces_others() {
    let s = schema();
    let mut tr = Transform::new(s.clone(), doc(&s, vec![p(&s, vec![tm(&s, "ab", &["bold"])])]));
    tr.add_mark(1, 3, &mark(&s, "code")).unwrap();
    assert_eq!(tr.doc(), &doc(&s, vec![p(&s, vec![tm(&s, "ab", &["code"])])]));
}

#[test]
fn remove_mark_type_clears_range() {
    let s = schema();
    let mut tr = Transform::new(
        s.clone(),
        doc(&s, vec![p(&s, vec![tm(&s, "abc", &["bold", "italic"])])]),
    );
    let bold = s.mark_type("bold").unwrap().clone();
    tr.remove_mark_type(1, 3, &bold).unwrap();
    assert_eq!(
        tr.doc(),
        &doc(
            &s,
            vec![p(
                &s,
                vec![tm(&s, "ab", &["italic"]), tm(&s, "c", &["bold", "italic"])]
            )]
        )
    );
}

// ── Node markup ─────────────────────────────────────────────────

#[test]
fn set_node_markup_turns_paragraph_into_heading() {
    let s = schema();
    let mut tr = Transform::new(s.clone(), doc_of(&s, &["abc"]));
    let heading = s.node_type("heading").unwrap().clone();
    tr.set_node_markup(0, Some(&heading), Some(&attrs(json!({ "level": 2 }))), None)
        .unwrap();
    assert_eq!(tr.doc(), &doc(&s, vec![h(&s, 2, vec![t(&s, "abc")])]));
    assert_eq!(tr.mapping().map(2, Assoc::After), 2);
}

#[test]
fn set_node_markup_keeps_attrs_of_same_type() {
    let s = schema();
    let mut tr = Transform::new(s.clone(), doc(&s, vec![h(&s, 3, vec![t(&s, "x")])]));
    tr.set_node_markup(0, None, None, None).unwrap();
    assert_eq!(tr.doc(), &doc(&s, vec![h(&s, 3, vec![t(&s, "x")])]));
}

#[test]
fn set_node_markup_rejects_text() {
    let s = schema();
    let mut tr = Transform::new(s.clone(), doc_of(&s, &["abc"]));
    assert!(tr.set_node_markup(1, None, None, None).is_err());
}

#[test]
fn set_node_attribute() {
    let s = schema();
    let mut tr = Transform::new(s.clone(), doc(&s, vec![h(&s, 1, vec![t(&s, "x")])]));
    tr.set_node_attribute(0, "level", json!(5)).unwrap();
    assert_eq!(tr.doc().child(0).unwrap().attr("level"), Some(&json!(5)));
}

// ── Transactions ────────────────────────────────────────────────

fn transaction(paragraphs: &[&str], selection: Selection) -> (std::sync::Arc<folio_model::Schema>, Transaction) {
    let s = schema();
    let d = doc_of(&s, paragraphs);
    let tr = Transaction::new(s.clone(), d, selection, None);
    (s, tr)
}

#[test]
fn selection_maps_through_later_steps() {
    let (_, mut tr) = transaction(&["abc"], Selection::cursor(4));
    tr.insert_text("XY", 1).unwrap();
    assert_eq!(tr.selection(), Selection::cursor(6));
    assert!(!tr.selection_set());
}

#[test]
fn selection_is_clamped_to_document() {
    let (_, mut tr) = transaction(&["abc"], Selection::cursor(4));
    tr.set_selection(Selection::new(1, 99));
    assert_eq!(tr.selection(), Selection::new(1, 5));
}

#[test]
fn insert_text_replaces_selection() {
    let (s, mut tr) = transaction(&["abcd"], Selection::new(2, 4));
    tr.replace_selection_with_text("Z").unwrap();
    assert_eq!(tr.doc(), &doc_of(&s, &["aZd"]));
    assert_eq!(tr.selection(), Selection::cursor(3));
}

#[test]
fn insert_text_uses_stored_marks() {
    let (s, mut tr) = transaction(&["abc"], Selection::cursor(2));
    tr.set_stored_marks(Some(vec![mark(&s, "bold")]));
    tr.replace_selection_with_text("Z").unwrap();
    assert_eq!(
        tr.doc(),
        &doc(&s, vec![p(&s, vec![t(&s, "a"), tm(&s, "Z", &["bold"]), t(&s, "bc")])])
    );
    assert_eq!(tr.stored_marks(), None);
}

#[test]
fn add_stored_mark_builds_on_current_marks() {
    let s = schema();
    let d = doc(&s, vec![p(&s, vec![tm(&s, "ab", &["italic"])])]);
    let mut tr = Transaction::new(s.clone(), d, Selection::cursor(2), None);
    tr.add_stored_mark(&mark(&s, "bold"));
    let names: Vec<&str> = tr
        .stored_marks()
        .unwrap()
        .iter()
        .map(|m| m.ty().name())
        .collect();
    assert_eq!(names, vec!["bold", "italic"]);
}

#[test]
fn set_selection_drops_stored_marks() {
    let (s, mut tr) = transaction(&["abc"], Selection::cursor(2));
    tr.set_stored_marks(Some(vec![mark(&s, "bold")]));
    tr.set_selection(Selection::cursor(1));
    assert_eq!(tr.stored_marks(), None);
}

#[test]
fn delete_selection_collapses_to_cursor() {
    let (s, mut tr) = transaction(&["abc"], Selection::new(3, 1));
    tr.delete_selection().unwrap();
    assert_eq!(tr.doc(), &doc_of(&s, &["c"]));
    assert_eq!(tr.selection(), Selection::cursor(1));
}

#[test]
fn replace_selection_with_node() {
    let (s, mut tr) = transaction(&["ab"], Selection::cursor(2));
    tr.replace_selection_with(br(&s)).unwrap();
    assert_eq!(tr.doc(), &doc(&s, vec![p(&s, vec![t(&s, "a"), br(&s), t(&s, "b")])]));
    assert_eq!(tr.selection(), Selection::cursor(3));
}

#[test]
fn meta_values() {
    let (_, mut tr) = transaction(&["a"], Selection::cursor(1));
    tr.set_meta("remote", true).set_meta("rebased", 3);
    assert_eq!(tr.get_meta("remote"), Some(&json!(true)));
    assert_eq!(tr.get_meta("rebased"), Some(&json!(3)));
    assert_eq!(tr.get_meta("missing"), None);
}

#[test]
fn selection_helpers() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    assert_eq!(Selection::at_start(&d), Selection::cursor(1));
    assert_eq!(Selection::at_end(&d), Selection::cursor(7));
    let sel = Selection::new(5, 2);
    assert_eq!((sel.from(), sel.to()), (2, 5));
    assert!(!sel.is_empty());
}
