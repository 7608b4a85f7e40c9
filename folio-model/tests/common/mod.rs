//! Shared test schema and node builders.

#![allow(dead_code)]

use folio_model::{AttrSpec, Attrs, Mark, MarkSpec, Node, NodeSpec, Schema, SchemaSpec};
use serde_json::json;
use std::sync::Arc;

pub fn test_spec() -> SchemaSpec {
    SchemaSpec::new()
        .node("doc", NodeSpec::new().content("block+"))
        .node("paragraph", NodeSpec::new().content("inline*").group("block"))
        .node(
            "heading",
            NodeSpec::new()
                .content("inline*")
                .group("block")
                .defining()
                .attr("level", AttrSpec::with_default(1)),
        )
        .node("blockquote", NodeSpec::new().content("block+").group("block"))
        .node(
            "code_block",
            NodeSpec::new().content("text*").marks("").group("block").code(),
        )
        .node("bullet_list", NodeSpec::new().content("list_item+").group("block"))
        .node("list_item", NodeSpec::new().content("paragraph block*").defining())
        .node(
            "image",
            NodeSpec::new()
                .inline()
                .group("inline")
                .attr("src", AttrSpec::required())
                .attr("alt", AttrSpec::nullable()),
        )
        .node("hard_break", NodeSpec::new().inline().group("inline"))
        .node("text", NodeSpec::new().group("inline"))
        .mark("bold", MarkSpec::new())
        .mark("italic", MarkSpec::new())
        .mark("code", MarkSpec::new().excludes("_"))
        .mark(
            "link",
            MarkSpec::new()
                .attr("href", AttrSpec::required())
                .inclusive(false),
        )
}

pub fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(test_spec()).unwrap())
}

pub fn attrs(value: serde_json::Value) -> Attrs {
    serde_json::from_value(value).unwrap()
}

pub fn t(s: &Schema, text: &str) -> Node {
    s.text(text, vec![]).unwrap()
}

pub fn tm(s: &Schema, text: &str, marks: &[&str]) -> Node {
    let marks = marks.iter().map(|m| mark(s, m)).collect();
    s.text(text, marks).unwrap()
}

pub fn mark(s: &Schema, name: &str) -> Mark {
    s.mark(name, None).unwrap()
}

pub fn link(s: &Schema, href: &str) -> Mark {
    s.mark("link", Some(&attrs(json!({ "href": href })))).unwrap()
}

pub fn p(s: &Schema, content: Vec<Node>) -> Node {
    s.node("paragraph", None, content, vec![]).unwrap()
}

pub fn h(s: &Schema, level: u64, content: Vec<Node>) -> Node {
    s.node("heading", Some(&attrs(json!({ "level": level }))), content, vec![])
        .unwrap()
}

pub fn bq(s: &Schema, content: Vec<Node>) -> Node {
    s.node("blockquote", None, content, vec![]).unwrap()
}

pub fn ul(s: &Schema, content: Vec<Node>) -> Node {
    s.node("bullet_list", None, content, vec![]).unwrap()
}

pub fn li(s: &Schema, content: Vec<Node>) -> Node {
    s.node("list_item", None, content, vec![]).unwrap()
}

pub fn doc(s: &Schema, content: Vec<Node>) -> Node {
    s.node("doc", None, content, vec![]).unwrap()
}

/// `doc(paragraph(<text>), ...)`, one paragraph per string.
pub fn doc_of(s: &Schema, paragraphs: &[&str]) -> Node {
    let blocks = paragraphs
        .iter()
        .map(|text| {
            if text.is_empty() {
                p(s, vec![])
            } else {
                p(s, vec![t(s, text)])
            }
        })
        .collect();
    doc(s, blocks)
}
