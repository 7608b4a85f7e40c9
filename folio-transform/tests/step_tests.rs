mod common;

use common::{code_block, doc, doc_of, h, mark, p, schema, t, tm};
use folio_model::{Fragment, ModelError, Slice};
use folio_transform::{Mapping, Step, StepError, StepMap};
use pretty_assertions::assert_eq;
use serde_json::json;

fn insert(s: &folio_model::Schema, pos: usize, text: &str) -> Step {
    Step::replace(pos, pos, Slice::closed(Fragment::from_node(t(s, text))))
}

// ── Apply and invert ────────────────────────────────────────────

#[test]
fn replace_inserts_text() {
    let s = schema();
    let d = doc_of(&s, &["hello", "world"]);
    let after = insert(&s, 3, "X").apply(&d).unwrap();
    assert_eq!(after, doc_of(&s, &["heXllo", "world"]));
}

#[test]
fn replace_inverse_restores_document() {
    let s = schema();
    let d = doc_of(&s, &["hello", "world"]);
    let step = Step::replace(2, 10, Slice::empty());
    let after = step.apply(&d).unwrap();
    assert_eq!(after, doc_of(&s, &["hrld"]));
    let inverse = step.invert(&d).unwrap();
    assert_eq!(inverse.apply(&after).unwrap(), d);
}

#[test]
fn replace_out_of_range_fails() {
    let s = schema();
    let d = doc_of(&s, &["ab"]);
    let result = Step::replace(3, 40, Slice::empty()).apply(&d);
    assert!(matches!(result, Err(StepError::Model(ModelError::PositionOutOfRange { .. }))));
}

#[test]
fn replace_producing_invalid_content_fails() {
    let s = schema();
    let d = doc_of(&s, &["ab"]);
    // the doc requires at least one block
    let result = Step::replace(0, 4, Slice::empty()).apply(&d);
    assert!(result.is_err());
}

#[test]
fn add_mark_and_inverse() {
    let s = schema();
    let d = doc_of(&s, &["hello"]);
    let bold = mark(&s, "bold");
    let step = Step::AddMark {
        from: 1,
        to: 3,
        mark: bold.clone(),
    };
    let after = step.apply(&d).unwrap();
    assert_eq!(after, doc(&s, vec![p(&s, vec![tm(&s, "he", &["bold"]), t(&s, "llo")])]));

    let inverse = step.invert(&d).unwrap();
    assert_eq!(
        inverse,
        Step::RemoveMark {
            from: 1,
            to: 3,
            mark: bold
        }
    );
    assert_eq!(inverse.apply(&after).unwrap(), d);
}

#[test]
fn add_mark_skips_parents_that_disallow_it() {
    let s = schema();
    let d = doc(&s, vec![code_block(&s, "let x")]);
    let step = Step::AddMark {
        from: 1,
        to: 4,
        mark: mark(&s, "bold"),
    };
    assert_eq!(step.apply(&d).unwrap(), d);
}

#[test]
fn attr_step_sets_one_attribute() {
    let s = schema();
    let d = doc(&s, vec![h(&s, 1, vec![t(&s, "ab")]), p(&s, vec![t(&s, "c")])]);
    let step = Step::Attr {
        pos: 0,
        attr: "level".into(),
        value: json!(2),
    };
    let after = step.apply(&d).unwrap();
    assert_eq!(after, doc(&s, vec![h(&s, 2, vec![t(&s, "ab")]), p(&s, vec![t(&s, "c")])]));

    let inverse = step.invert(&d).unwrap();
    assert_eq!(
        inverse,
        Step::Attr {
            pos: 0,
            attr: "level".into(),
            value: json!(1)
        }
    );
    assert_eq!(inverse.apply(&after).unwrap(), d);
}

#[test]
fn attr_step_on_text_fails() {
    let s = schema();
    let d = doc_of(&s, &["ab"]);
    let step = Step::Attr {
        pos: 1,
        attr: "level".into(),
        value: json!(2),
    };
    assert!(matches!(step.apply(&d), Err(StepError::Failed(_))));
}

#[test]
fn step_maps() {
    let s = schema();
    assert!(Step::AddMark {
        from: 0,
        to: 0,
        mark: mark(&s, "bold")
    }
    .get_map()
    .is_empty());
    let step = Step::replace(2, 5, Slice::empty());
    assert_eq!(step.get_map(), StepMap::new(2, 3, 0));
}

// ── Mapping steps ───────────────────────────────────────────────

#[test]
fn replace_maps_past_earlier_insertion() {
    let s = schema();
    let mapping = Mapping::from_maps(vec![StepMap::new(2, 0, 3)]);
    let mapped = insert(&s, 10, "X").map(&mapping).unwrap();
    assert_eq!(mapped, insert(&s, 13, "X"));
}

#[test]
fn replace_inside_deleted_range_is_dropped() {
    let mapping = Mapping::from_maps(vec![StepMap::new(1, 5, 0)]);
    assert_eq!(Step::replace(2, 4, Slice::empty()).map(&mapping), None);
}

#[test]
fn replace_partially_deleted_is_trimmed() {
    let mapping = Mapping::from_maps(vec![StepMap::new(1, 3, 0)]);
    let mapped = Step::replace(2, 6, Slice::empty()).map(&mapping).unwrap();
    assert_eq!(mapped, Step::replace(1, 3, Slice::empty()));
}

#[test]
fn mark_step_collapsed_by_deletion_is_dropped() {
    let s = schema();
    let step = Step::RemoveMark {
        from: 2,
        to: 4,
        mark: mark(&s, "bold"),
    };
    let mapping = Mapping::from_maps(vec![StepMap::new(1, 5, 0)]);
    assert_eq!(step.map(&mapping), None);
}

#[test]
fn attr_step_survives_insertion_at_its_position() {
    let step = Step::Attr {
        pos: 7,
        attr: "level".into(),
        value: json!(3),
    };
    let mapping = Mapping::from_maps(vec![StepMap::new(7, 0, 4)]);
    let mapped = step.map(&mapping).unwrap();
    assert!(matches!(mapped, Step::Attr { pos: 11, .. }));
}

#[test]
fn attr_step_on_deleted_node_is_dropped() {
    let step = Step::Attr {
        pos: 7,
        attr: "level".into(),
        value: json!(3),
    };
    let mapping = Mapping::from_maps(vec![StepMap::new(6, 4, 0)]);
    assert_eq!(step.map(&mapping), None);
}

// ── JSON ────────────────────────────────────────────────────────

#[test]
fn replace_step_json_shape() {
    let s = schema();
    let value = serde_json::to_value(insert(&s, 1, "X")).unwrap();
    assert_eq!(
        value,
        json!({
            "stepType": "replace",
            "from": 1,
            "to": 1,
            "slice": { "content": [{ "type": "text", "text": "X" }] }
        })
    );
}

#[test]
fn deletion_omits_slice() {
    let value = serde_json::to_value(Step::replace(1, 3, Slice::empty())).unwrap();
    assert_eq!(value, json!({ "stepType": "replace", "from": 1, "to": 3 }));
}

#[test]
fn mark_step_json_shape() {
    let s = schema();
    let step = Step::AddMark {
        from: 1,
        to: 4,
        mark: common::link(&s, "https://example.com"),
    };
    let value = serde_json::to_value(&step).unwrap();
    assert_eq!(
        value,
        json!({
            "stepType": "addMark",
            "from": 1,
            "to": 4,
            "mark": { "type": "link", "attrs": { "href": "https://example.com" } }
        })
    );
    assert_eq!(Step::from_value(&s, value).unwrap(), step);
}

#[test]
fn open_slice_survives_json() {
    let s = schema();
    let d = doc_of(&s, &["ab", "cd"]);
    let step = Step::replace(2, 6, d.slice(2, 6, false).unwrap());
    let value = serde_json::to_value(&step).unwrap();
    assert_eq!(value["slice"]["openStart"], json!(1));
    assert_eq!(value["slice"]["openEnd"], json!(1));
    assert_eq!(Step::from_value(&s, value).unwrap(), step);
}

#[test]
fn unknown_step_type_is_malformed() {
    let s = schema();
    let result = Step::from_value(&s, json!({ "stepType": "teleport", "pos": 1 }));
    assert!(matches!(result, Err(StepError::Malformed(_))));
}

#[test]
fn reversed_range_is_malformed() {
    let s = schema();
    let result = Step::from_value(&s, json!({ "stepType": "replace", "from": 5, "to": 2 }));
    assert!(matches!(result, Err(StepError::Malformed(_))));
}

#[test]
fn unknown_mark_is_a_model_error() {
    let s = schema();
    let result = Step::from_value(
        &s,
        json!({ "stepType": "addMark", "from": 1, "to": 2, "mark": { "type": "blink" } }),
    );
    assert!(matches!(result, Err(StepError::Model(ModelError::UnknownMarkType(_)))));
}

#[test]
fn attr_step_json_round_trip() {
    let s = schema();
    let step = Step::Attr {
        pos: 0,
        attr: "level".into(),
        value: json!(4),
    };
    let value = serde_json::to_value(&step).unwrap();
    assert_eq!(value, json!({ "stepType": "attr", "pos": 0, "attr": "level", "value": 4 }));
    assert_eq!(Step::from_value(&s, value).unwrap(), step);
}
