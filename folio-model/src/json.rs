//! JSON wire form of documents, marks and slices.
//!
//! ```json
//! {"type": "paragraph", "attrs": {"align": "left"},
//!  "content": [{"type": "text", "text": "hi", "marks": [{"type": "bold"}]}]}
//! ```
//!
//! Empty attribute maps, content lists and mark lists are omitted. Parsing
//! needs a [`Schema`] and validates the whole tree against it.

use crate::attrs::Attrs;
use crate::error::{ModelError, ModelResult};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::node::Node;
use crate::schema::Schema;
use crate::slice::Slice;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Serialized node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeJson {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<MarkJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Serialized mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkJson {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

/// Serialized slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceJson {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub open_start: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub open_end: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Mark {
    pub fn to_json(&self) -> MarkJson {
        MarkJson {
            ty: self.ty().name().to_string(),
            attrs: self.attrs().clone(),
        }
    }

    pub fn from_json(schema: &Schema, json: &MarkJson) -> ModelResult<Mark> {
        let attrs = (!json.attrs.is_empty()).then_some(&json.attrs);
        schema.mark(&json.ty, attrs)
    }
}

impl Node {
    pub fn to_json(&self) -> NodeJson {
        NodeJson {
            ty: self.type_name().to_string(),
            attrs: self.attrs().clone(),
            content: self.content().iter().map(Node::to_json).collect(),
            marks: self.marks().iter().map(Mark::to_json).collect(),
            text: self.text().map(str::to_string),
        }
    }

    pub fn to_value(&self) -> ModelResult<Value> {
        Ok(serde_json::to_value(self.to_json())?)
    }

    /// Parses and validates a node tree.
    pub fn from_json(schema: &Schema, json: &NodeJson) -> ModelResult<Node> {
        let node = build_node(schema, json)?;
        node.check()?;
        Ok(node)
    }

    /// Parses a node tree from an untyped JSON value.
    pub fn from_value(schema: &Schema, value: Value) -> ModelResult<Node> {
        let json: NodeJson =
            serde_json::from_value(value).map_err(|e| ModelError::MalformedJson(e.to_string()))?;
        Self::from_json(schema, &json)
    }
}

fn build_marks(schema: &Schema, marks: &[MarkJson]) -> ModelResult<Vec<Mark>> {
    marks.iter().map(|m| Mark::from_json(schema, m)).collect()
}

fn build_node(schema: &Schema, json: &NodeJson) -> ModelResult<Node> {
    let marks = build_marks(schema, &json.marks)?;
    if json.ty == schema.text_type().name() {
        let text = json
            .text
            .as_deref()
            .ok_or_else(|| ModelError::MalformedJson("text node without text".into()))?;
        if !json.content.is_empty() || !json.attrs.is_empty() {
            return Err(ModelError::MalformedJson(
                "text nodes cannot carry attributes or content".into(),
            ));
        }
        return schema.text(text, marks);
    }
    if json.text.is_some() {
        return Err(ModelError::MalformedJson(format!(
            "non-text node '{}' carries text",
            json.ty
        )));
    }
    let ty = schema.expect_node_type(&json.ty)?;
    let content = json
        .content
        .iter()
        .map(|c| build_node(schema, c))
        .collect::<ModelResult<Vec<_>>>()?;
    let attrs = (!json.attrs.is_empty()).then_some(&json.attrs);
    ty.create(attrs, Fragment::from_vec(content), marks)
}

impl Slice {
    pub fn to_json(&self) -> SliceJson {
        SliceJson {
            content: self.content().iter().map(Node::to_json).collect(),
            open_start: self.open_start(),
            open_end: self.open_end(),
        }
    }

    /// Parses a slice. Nodes inside are checked individually; the open sides
    /// are only checked when the slice is applied.
    pub fn from_json(schema: &Schema, json: &SliceJson) -> ModelResult<Slice> {
        let content = json
            .content
            .iter()
            .map(|c| build_node(schema, c))
            .collect::<ModelResult<Vec<_>>>()?;
        let content = Fragment::from_vec(content);
        let depth_limit = |mut node: Option<&Node>, first: bool| {
            let mut depth = 0;
            while let Some(n) = node {
                if n.is_text() || n.is_leaf() {
                    break;
                }
                depth += 1;
                node = if first { n.first_child() } else { n.last_child() };
            }
            depth
        };
        if json.open_start > depth_limit(content.first_child(), true)
            || json.open_end > depth_limit(content.last_child(), false)
        {
            return Err(ModelError::MalformedJson(
                "slice open depth exceeds its content".into(),
            ));
        }
        Ok(Slice::new(content, json.open_start, json.open_end))
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Serialize for Mark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Serialize for Slice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
