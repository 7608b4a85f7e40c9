mod common;

use common::{bq, doc, doc_of, link, mark, p, schema, t, tm, ul, li};
use folio_model::{Fragment, Mark, ModelError, ReplaceError, Slice};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// ── Sizes and positions ─────────────────────────────────────────

#[test]
fn node_sizes() {
    let s = schema();
    let d = doc_of(&s, &["hello"]);
    assert_eq!(d.content().size(), 7);
    assert_eq!(d.child(0).unwrap().node_size(), 7);
    assert_eq!(d.child(0).unwrap().child(0).unwrap().node_size(), 5);
}

#[test]
fn text_size_counts_characters() {
    let s = schema();
    assert_eq!(t(&s, "héllo").node_size(), 5);
}

#[test]
fn leaf_nodes_have_size_one() {
    let s = schema();
    let br = s.node("hard_break", None, vec![], vec![]).unwrap();
    assert_eq!(br.node_size(), 1);
}

#[test]
fn resolve_inside_text() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    let pos = d.resolve(2).unwrap();
    assert_eq!(pos.depth(), 1);
    assert_eq!(pos.parent().type_name(), "paragraph");
    assert_eq!(pos.parent_offset(), 1);
    assert_eq!(pos.text_offset(), 1);
    assert_eq!(pos.start(1), 1);
    assert_eq!(pos.end(1), 3);
    assert_eq!(pos.before(1), 0);
    assert_eq!(pos.after(1), 4);
    assert_eq!(pos.node_before().unwrap().text(), Some("a"));
    assert_eq!(pos.node_after().unwrap().text(), Some("b"));
}

#[test]
fn resolve_between_blocks() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    let pos = d.resolve(4).unwrap();
    assert_eq!(pos.depth(), 0);
    assert_eq!(pos.index(0), 1);
    assert_eq!(pos.node_before().unwrap().text_content(), "ab");
    assert_eq!(pos.node_after().unwrap().text_content(), "cd");
    assert_eq!(pos.pos_at_index(1, 0), 4);
}

#[test]
fn resolve_out_of_range() {
    let s = schema();
    let d = doc_of(&s, &["ab"]);
    assert!(matches!(
        d.resolve(5),
        Err(ModelError::PositionOutOfRange { pos: 5, size: 4 })
    ));
}

#[test]
fn shared_depth_of_nested_positions() {
    let s = schema();
    let d = doc(&s, vec![bq(&s, vec![p(&s, vec![t(&s, "ab")]), p(&s, vec![t(&s, "cd")])])]);
    let pos = d.resolve(3).unwrap();
    assert_eq!(pos.depth(), 2);
    assert_eq!(pos.shared_depth(4), 2);
    assert_eq!(pos.shared_depth(7), 1);
    assert_eq!(pos.shared_depth(11), 0);
}

#[test]
fn node_at_finds_blocks_and_text() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    assert_eq!(d.node_at(0).unwrap().type_name(), "paragraph");
    assert_eq!(d.node_at(1).unwrap().text(), Some("ab"));
    assert_eq!(d.node_at(4).unwrap().text_content(), "cd");
    assert!(d.node_at(8).is_none());
}

#[test]
fn text_between_blocks() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    assert_eq!(d.text_between(0, 8, "\n"), "ab\ncd");
    assert_eq!(d.text_between(2, 6, "|"), "b|c");
    assert_eq!(d.text_content(), "abcd");
}

#[test]
fn nodes_between_visits_in_document_order() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    let mut seen = Vec::new();
    d.nodes_between(0, 8, |node, pos, _, _| {
        seen.push((node.type_name().to_string(), pos));
        true
    });
    assert_eq!(
        seen,
        vec![
            ("paragraph".to_string(), 0),
            ("text".to_string(), 1),
            ("paragraph".to_string(), 4),
            ("text".to_string(), 5),
        ]
    );
}

#[test]
fn display_renders_tree() {
    let s = schema();
    let d = doc(&s, vec![p(&s, vec![t(&s, "a"), tm(&s, "b", &["bold"])])]);
    assert_eq!(d.to_string(), r#"doc(paragraph("a", bold("b")))"#);
}

// ── Fragments ───────────────────────────────────────────────────

#[test]
fn adjacent_text_with_same_marks_is_joined() {
    let s = schema();
    let f = Fragment::from_vec(vec![t(&s, "a"), t(&s, "b"), tm(&s, "c", &["bold"])]);
    assert_eq!(f.child_count(), 2);
    assert_eq!(f.child(0).unwrap().text(), Some("ab"));
    assert_eq!(f.size(), 3);
}

#[test]
fn fragment_cut_inside_nodes() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    let cut = d.content().cut(2, 6);
    assert_eq!(cut.child_count(), 2);
    assert_eq!(cut.child(0).unwrap().text_content(), "b");
    assert_eq!(cut.child(1).unwrap().text_content(), "c");
    assert_eq!(cut.size(), 6);
}

#[test]
fn find_index_rounding() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    assert_eq!(d.content().find_index(2, false).unwrap(), (0, 0));
    assert_eq!(d.content().find_index(2, true).unwrap(), (1, 4));
    assert_eq!(d.content().find_index(4, false).unwrap(), (1, 4));
}

// ── Marks ───────────────────────────────────────────────────────

#[test]
fn add_to_set_keeps_rank_order() {
    let s = schema();
    let set = mark(&s, "italic").add_to_set(&[]);
    let set = mark(&s, "bold").add_to_set(&set);
    let names: Vec<_> = set.iter().map(|m| m.ty().name().to_string()).collect();
    assert_eq!(names, vec!["bold", "italic"]);
}

#[test]
fn add_to_set_is_idempotent() {
    let s = schema();
    let set = vec![mark(&s, "bold")];
    assert_eq!(mark(&s, "bold").add_to_set(&set), set);
}

#[test]
fn excluding_mark_replaces_others() {
    let s = schema();
    let set = vec![mark(&s, "bold"), mark(&s, "italic")];
    let with_code = mark(&s, "code").add_to_set(&set);
    assert_eq!(with_code, vec![mark(&s, "code")]);
    assert_eq!(mark(&s, "bold").add_to_set(&with_code), with_code);
}

#[test]
fn link_replaces_link_with_other_href() {
    let s = schema();
    let set = vec![link(&s, "a")];
    assert_eq!(link(&s, "b").add_to_set(&set), vec![link(&s, "b")]);
    assert!(!link(&s, "a").is_in_set(&[link(&s, "b")]));
}

#[test]
fn remove_from_set() {
    let s = schema();
    let set = vec![mark(&s, "bold"), mark(&s, "italic")];
    assert_eq!(mark(&s, "bold").remove_from_set(&set), vec![mark(&s, "italic")]);
    assert!(Mark::same_set(&mark(&s, "code").remove_from_set(&set), &set));
}

#[test]
fn non_inclusive_mark_does_not_extend() {
    let s = schema();
    let linked = s.text("ab", vec![link(&s, "x")]).unwrap();
    let d = doc(&s, vec![p(&s, vec![linked, t(&s, "cd")])]);
    assert!(d.resolve(3).unwrap().marks().is_empty());

    let d = doc(&s, vec![p(&s, vec![tm(&s, "ab", &["bold"]), t(&s, "cd")])]);
    assert_eq!(d.resolve(3).unwrap().marks(), vec![mark(&s, "bold")]);
}

#[test]
fn range_has_mark() {
    let s = schema();
    let d = doc(&s, vec![p(&s, vec![t(&s, "ab"), tm(&s, "cd", &["bold"])])]);
    let bold = s.mark_type("bold").unwrap();
    assert!(!d.range_has_mark(1, 3, bold));
    assert!(d.range_has_mark(2, 4, bold));
}

// ── Replace ─────────────────────────────────────────────────────

#[test]
fn slice_across_blocks_is_open() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    let slice = d.slice(2, 6, false).unwrap();
    assert_eq!(slice.open_start(), 1);
    assert_eq!(slice.open_end(), 1);
    assert_eq!(slice.size(), 4);
}

#[test]
fn slice_inside_one_block_is_closed() {
    let s = schema();
    let d = doc_of(&s, &["hello"]);
    let slice = d.slice(2, 4, false).unwrap();
    assert_eq!(slice.open_start(), 0);
    assert_eq!(slice.content().child(0).unwrap().text(), Some("el"));
}

#[test]
fn delete_across_blocks_joins_them() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    let result = d.replace(2, 6, &Slice::empty()).unwrap();
    assert_eq!(result, doc_of(&s, &["ad"]));
}

#[test]
fn insert_text() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    let slice = Slice::closed(Fragment::from_node(t(&s, "XY")));
    let result = d.replace(3, 3, &slice).unwrap();
    assert_eq!(result, doc_of(&s, &["abXY", "cd"]));
}

#[test]
fn paste_open_slice_splits_block() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    let content = Fragment::from_vec(vec![p(&s, vec![t(&s, "X")]), p(&s, vec![t(&s, "Y")])]);
    let result = d.replace(2, 2, &Slice::new(content, 1, 1)).unwrap();
    assert_eq!(result, doc_of(&s, &["aX", "Yb", "cd"]));
}

#[test]
fn replace_rejects_invalid_content() {
    let s = schema();
    let d = doc_of(&s, &["ab"]);
    let slice = Slice::closed(Fragment::from_node(p(&s, vec![t(&s, "Z")])));
    assert!(matches!(
        d.replace(2, 2, &slice),
        Err(ModelError::InvalidContent(ref name)) if name == "paragraph"
    ));
}

#[test]
fn replace_rejects_too_deep_slice() {
    let s = schema();
    let d = doc_of(&s, &["ab"]);
    let slice = Slice::new(Fragment::from_node(p(&s, vec![t(&s, "Z")])), 2, 0);
    assert!(matches!(
        d.replace(2, 2, &slice),
        Err(ModelError::Replace(ReplaceError::TooDeep))
    ));
}

#[test]
fn replace_rejects_unbalanced_range() {
    let s = schema();
    let d = doc(&s, vec![ul(&s, vec![li(&s, vec![p(&s, vec![t(&s, "ab")])])]), p(&s, vec![t(&s, "cd")])]);
    // The range starts three levels deep and ends one level deep.
    let result = d.replace(4, 9, &Slice::empty());
    assert!(result.is_err());
}

#[test]
fn delete_whole_block() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    let result = d.replace(0, 4, &Slice::empty()).unwrap();
    assert_eq!(result, doc_of(&s, &["cd"]));
}

// ── Validation ──────────────────────────────────────────────────

#[test]
fn check_reports_disallowed_marks() {
    let s = schema();
    let code_block = s.node_type("code_block").unwrap();
    let bad = code_block
        .create(None, Fragment::from_node(tm(&s, "x", &["bold"])), vec![])
        .unwrap();
    assert!(matches!(
        bad.check(),
        Err(ModelError::MarkNotAllowed { ref mark, .. }) if mark == "bold"
    ));
}

#[test]
fn schema_node_checks_content() {
    let s = schema();
    assert!(matches!(
        s.node("doc", None, vec![], vec![]),
        Err(ModelError::InvalidContent(_))
    ));
    assert!(matches!(
        s.node("bullet_list", None, vec![p(&s, vec![])], vec![]),
        Err(ModelError::InvalidContent(_))
    ));
}

#[test]
fn empty_text_is_rejected() {
    let s = schema();
    assert!(matches!(s.text("", vec![]), Err(ModelError::EmptyText)));
}

#[test]
fn can_replace_with_checks_grammar() {
    let s = schema();
    let d = doc_of(&s, &["ab"]);
    let heading = s.node_type("heading").unwrap();
    let list_item = s.node_type("list_item").unwrap();
    assert!(d.can_replace_with(0, 1, heading));
    assert!(!d.can_replace_with(0, 1, list_item));
}

// ── Properties ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn replacing_a_range_with_its_own_slice_is_identity(a in 0usize..=14, b in 0usize..=14) {
        let s = schema();
        let d = doc_of(&s, &["abc", "", "defg", "hi"]);
        let (from, to) = (a.min(b), a.max(b));
        prop_assume!(to <= d.content().size());
        let slice = d.slice(from, to, false).unwrap();
        let result = d.replace(from, to, &slice).unwrap();
        prop_assert_eq!(result, d);
    }
}
