//! Steps: atomic, invertible document changes.
//!
//! A step is position-addressed against the document it applies to. It can be
//! inverted (given that document), mapped through a [`Mapping`] so it applies
//! to a document changed by other steps, and serialized to the JSON form
//! exchanged between replicas.

use crate::error::{StepError, StepResult};
use crate::map::{Assoc, Mapping, StepMap};
use folio_model::{Attrs, Fragment, Mark, MarkJson, Node, Schema, Slice, SliceJson};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// An atomic document change.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace `from..to` with a slice. With `structure` set the step refuses
    /// to overwrite content, which keeps structural edits from eating text
    /// that a concurrent edit put in the range.
    Replace {
        from: usize,
        to: usize,
        slice: Slice,
        structure: bool,
    },
    /// Add a mark to all inline content in `from..to`.
    AddMark { from: usize, to: usize, mark: Mark },
    /// Remove a mark from all inline content in `from..to`.
    RemoveMark { from: usize, to: usize, mark: Mark },
    /// Set one attribute of the node at `pos`.
    Attr {
        pos: usize,
        attr: String,
        value: Value,
    },
}

impl Step {
    /// A plain replace step.
    #[must_use]
    pub fn replace(from: usize, to: usize, slice: Slice) -> Self {
        Step::Replace {
            from,
            to,
            slice,
            structure: false,
        }
    }

    /// Applies the step, returning the new document.
    pub fn apply(&self, doc: &Node) -> StepResult<Node> {
        match self {
            Step::Replace {
                from,
                to,
                slice,
                structure,
            } => {
                if *structure && content_between(doc, *from, *to)? {
                    return Err(StepError::Failed(
                        "structure replace would overwrite content".into(),
                    ));
                }
                Ok(doc.replace(*from, *to, slice)?)
            }
            Step::AddMark { from, to, mark } => apply_mark(doc, *from, *to, |node, parent| {
                if !node.is_atom() || !parent.ty().allows_mark(mark.ty().name()) {
                    return node.clone();
                }
                node.mark(mark.add_to_set(node.marks()))
            }),
            Step::RemoveMark { from, to, mark } => apply_mark(doc, *from, *to, |node, _| {
                node.mark(mark.remove_from_set(node.marks()))
            }),
            Step::Attr { pos, attr, value } => {
                let node = doc
                    .node_at(*pos)
                    .ok_or_else(|| StepError::Failed(format!("no node at attribute step's position {pos}")))?;
                if node.is_text() {
                    return Err(StepError::Failed("text nodes have no attributes".into()));
                }
                let mut attrs = node.attrs().clone();
                attrs.insert(attr.clone(), value.clone());
                let updated = node.ty().create(Some(&attrs), Fragment::empty(), node.marks().to_vec())?;
                let open_end = usize::from(!node.is_leaf());
                let slice = Slice::new(Fragment::from_node(updated), 0, open_end);
                Ok(doc.replace(*pos, *pos + 1, &slice)?)
            }
        }
    }

    /// The position changes this step makes.
    #[must_use]
    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, slice, .. } => StepMap::new(*from, to - from, slice.size()),
            _ => StepMap::empty(),
        }
    }

    /// The step that undoes this one, given the document it was applied to.
    pub fn invert(&self, doc: &Node) -> StepResult<Step> {
        Ok(match self {
            Step::Replace {
                from, to, slice, ..
            } => Step::replace(*from, from + slice.size(), doc.slice(*from, *to, false)?),
            Step::AddMark { from, to, mark } => Step::RemoveMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
            Step::RemoveMark { from, to, mark } => Step::AddMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
            Step::Attr { pos, attr, .. } => {
                let node = doc
                    .node_at(*pos)
                    .ok_or_else(|| StepError::Failed(format!("no node at attribute step's position {pos}")))?;
                Step::Attr {
                    pos: *pos,
                    attr: attr.clone(),
                    value: node.attr(attr).cloned().unwrap_or(Value::Null),
                }
            }
        })
    }

    /// Maps the step through `mapping`, or `None` when the content it
    /// targeted was deleted.
    #[must_use]
    pub fn map(&self, mapping: &Mapping) -> Option<Step> {
        match self {
            Step::Replace {
                from,
                to,
                slice,
                structure,
            } => {
                let from = mapping.map_result(*from, Assoc::After);
                let to = mapping.map_result(*to, Assoc::Before);
                if from.deleted_across() && to.deleted_across() {
                    return None;
                }
                Some(Step::Replace {
                    from: from.pos,
                    to: from.pos.max(to.pos),
                    slice: slice.clone(),
                    structure: *structure,
                })
            }
            Step::AddMark { from, to, mark } | Step::RemoveMark { from, to, mark } => {
                let from = mapping.map_result(*from, Assoc::After);
                let to = mapping.map_result(*to, Assoc::Before);
                if (from.deleted() && to.deleted()) || from.pos >= to.pos {
                    return None;
                }
                let mark = mark.clone();
                Some(match self {
                    Step::AddMark { .. } => Step::AddMark {
                        from: from.pos,
                        to: to.pos,
                        mark,
                    },
                    _ => Step::RemoveMark {
                        from: from.pos,
                        to: to.pos,
                        mark,
                    },
                })
            }
            Step::Attr { pos, attr, value } => {
                let pos = mapping.map_result(*pos, Assoc::After);
                if pos.deleted_after() {
                    return None;
                }
                Some(Step::Attr {
                    pos: pos.pos,
                    attr: attr.clone(),
                    value: value.clone(),
                })
            }
        }
    }

    /// The step's wire form.
    #[must_use]
    pub fn to_json(&self) -> StepJson {
        match self {
            Step::Replace {
                from,
                to,
                slice,
                structure,
            } => StepJson::Replace {
                from: *from,
                to: *to,
                slice: (slice.content().size() > 0).then(|| slice.to_json()),
                structure: *structure,
            },
            Step::AddMark { from, to, mark } => StepJson::AddMark {
                from: *from,
                to: *to,
                mark: mark.to_json(),
            },
            Step::RemoveMark { from, to, mark } => StepJson::RemoveMark {
                from: *from,
                to: *to,
                mark: mark.to_json(),
            },
            Step::Attr { pos, attr, value } => StepJson::Attr {
                pos: *pos,
                attr: attr.clone(),
                value: value.clone(),
            },
        }
    }

    /// Parses a step, resolving its marks and nodes against `schema`.
    pub fn from_json(schema: &Schema, json: &StepJson) -> StepResult<Step> {
        Ok(match json {
            StepJson::Replace {
                from,
                to,
                slice,
                structure,
            } => {
                if to < from {
                    return Err(StepError::Malformed(format!("replace range {from}..{to} is reversed")));
                }
                let slice = match slice {
                    Some(s) => Slice::from_json(schema, s)?,
                    None => Slice::empty(),
                };
                Step::Replace {
                    from: *from,
                    to: *to,
                    slice,
                    structure: *structure,
                }
            }
            StepJson::AddMark { from, to, mark } => Step::AddMark {
                from: *from,
                to: *to,
                mark: Mark::from_json(schema, mark)?,
            },
            StepJson::RemoveMark { from, to, mark } => Step::RemoveMark {
                from: *from,
                to: *to,
                mark: Mark::from_json(schema, mark)?,
            },
            StepJson::Attr { pos, attr, value } => Step::Attr {
                pos: *pos,
                attr: attr.clone(),
                value: value.clone(),
            },
        })
    }

    /// Parses a step from an untyped JSON value.
    pub fn from_value(schema: &Schema, value: Value) -> StepResult<Step> {
        let json: StepJson =
            serde_json::from_value(value).map_err(|e| StepError::Malformed(e.to_string()))?;
        Self::from_json(schema, &json)
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Serialized step, tagged by `stepType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "camelCase")]
pub enum StepJson {
    Replace {
        from: usize,
        to: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slice: Option<SliceJson>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        structure: bool,
    },
    AddMark {
        from: usize,
        to: usize,
        mark: MarkJson,
    },
    RemoveMark {
        from: usize,
        to: usize,
        mark: MarkJson,
    },
    Attr {
        pos: usize,
        attr: String,
        value: Value,
    },
}

/// Rebuilds the range `from..to` with `f` applied to every inline node.
fn apply_mark<F>(doc: &Node, from: usize, to: usize, f: F) -> StepResult<Node>
where
    F: Fn(&Node, &Node) -> Node,
{
    let old = doc.slice(from, to, false)?;
    let rfrom = doc.resolve(from)?;
    let parent = rfrom.node(rfrom.shared_depth(to));
    let content = map_fragment(old.content(), &f, parent);
    let slice = Slice::new(content, old.open_start(), old.open_end());
    Ok(doc.replace(from, to, &slice)?)
}

fn map_fragment<F>(fragment: &Fragment, f: &F, parent: &Node) -> Fragment
where
    F: Fn(&Node, &Node) -> Node,
{
    let mapped = fragment
        .iter()
        .map(|child| {
            let child = if child.content().size() > 0 {
                child.copy(map_fragment(child.content(), f, child))
            } else {
                child.clone()
            };
            if child.is_inline() {
                f(&child, parent)
            } else {
                child
            }
        })
        .collect();
    Fragment::from_vec(mapped)
}

/// Whether a structure replace of `from..to` would delete real content.
fn content_between(doc: &Node, from: usize, to: usize) -> StepResult<bool> {
    let rfrom = doc.resolve(from)?;
    let mut dist = to.saturating_sub(from);
    let mut depth = rfrom.depth();
    while dist > 0 && depth > 0 && rfrom.index_after(depth) == rfrom.node(depth).child_count() {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = rfrom.node(depth).child(rfrom.index_after(depth));
        while dist > 0 {
            match next {
                Some(node) if !node.is_leaf() => next = node.first_child(),
                _ => return Ok(true),
            }
            dist -= 1;
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::{NodeSpec, SchemaSpec};

    fn schema() -> Schema {
        Schema::new(
            SchemaSpec::new()
                .node("doc", NodeSpec::new().content("paragraph+"))
                .node("paragraph", NodeSpec::new().content("text*"))
                .node("text", NodeSpec::new()),
        )
        .unwrap()
    }

    fn doc(s: &Schema, paragraphs: &[&str]) -> Node {
        let blocks = paragraphs
            .iter()
            .map(|t| {
                let content = if t.is_empty() { vec![] } else { vec![s.text(t, vec![]).unwrap()] };
                s.node("paragraph", None, content, vec![]).unwrap()
            })
            .collect();
        s.node("doc", None, blocks, vec![]).unwrap()
    }

    #[test]
    fn content_between_detects_text() {
        let s = schema();
        let d = doc(&s, &["ab", "cd"]);
        assert!(content_between(&d, 1, 3).unwrap());
        // closing and reopening paragraph tokens only
        assert!(!content_between(&d, 3, 5).unwrap());
    }

    #[test]
    fn structure_replace_refuses_to_eat_text() {
        let s = schema();
        let d = doc(&s, &["ab", "cd"]);
        let step = Step::Replace {
            from: 2,
            to: 6,
            slice: Slice::empty(),
            structure: true,
        };
        assert!(matches!(step.apply(&d), Err(StepError::Failed(_))));
    }
}
