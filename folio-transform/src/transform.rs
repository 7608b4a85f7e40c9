//! Transforms: documents under construction by a sequence of steps.

use crate::error::{StepError, StepResult};
use crate::map::Mapping;
use crate::step::Step;
use folio_model::{Attrs, Fragment, Mark, MarkType, Node, NodeType, Schema, Slice};
use serde_json::Value;
use std::sync::Arc;

/// Accumulates steps applied to a starting document.
///
/// Keeps the document before every step (so steps can be inverted later) and
/// the combined [`Mapping`] of all steps.
#[derive(Debug, Clone)]
pub struct Transform {
    schema: Arc<Schema>,
    doc: Node,
    steps: Vec<Step>,
    docs: Vec<Node>,
    mapping: Mapping,
}

impl Transform {
    /// Starts a transform on `doc`.
    #[must_use]
    pub fn new(schema: Arc<Schema>, doc: Node) -> Self {
        Self {
            schema,
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The current document.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document the transform started from.
    pub fn before(&self) -> &Node {
        self.docs.first().unwrap_or(&self.doc)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Documents before each step.
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Records that steps `n` and `m` undo each other.
    pub fn set_mirror(&mut self, n: usize, m: usize) {
        self.mapping.set_mirror(n, m);
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Applies a step, returning `self` for chaining.
    pub fn step(&mut self, step: Step) -> StepResult<&mut Self> {
        self.maybe_step(step)?;
        Ok(self)
    }

    /// Applies a step. On failure the transform is left unchanged and the
    /// failure is returned.
    pub fn maybe_step(&mut self, step: Step) -> StepResult<()> {
        let doc = step.apply(&self.doc)?;
        self.add_step(step, doc);
        Ok(())
    }

    fn add_step(&mut self, step: Step, doc: Node) {
        let previous = std::mem::replace(&mut self.doc, doc);
        self.docs.push(previous);
        self.mapping.append_map(step.get_map(), None);
        self.steps.push(step);
    }

    // ── Replacing ───────────────────────────────────────────────

    /// Replaces `from..to` with `slice`. A no-op replace adds no step.
    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> StepResult<&mut Self> {
        if from == to && slice.size() == 0 {
            return Ok(self);
        }
        self.step(Step::replace(from, to, slice))
    }

    /// Replaces `from..to` with closed content.
    pub fn replace_with(&mut self, from: usize, to: usize, content: Vec<Node>) -> StepResult<&mut Self> {
        self.replace(from, to, Slice::closed(Fragment::from_vec(content)))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> StepResult<&mut Self> {
        self.replace(from, to, Slice::empty())
    }

    pub fn insert(&mut self, pos: usize, content: Vec<Node>) -> StepResult<&mut Self> {
        self.replace_with(pos, pos, content)
    }

    /// Replaces `from..to` with text carrying `marks`, or deletes the range
    /// when `text` is empty.
    pub fn insert_text_with_marks(
        &mut self,
        text: &str,
        from: usize,
        to: usize,
        marks: Vec<Mark>,
    ) -> StepResult<&mut Self> {
        if text.is_empty() {
            return self.delete(from, to);
        }
        let node = self.schema.text(text, marks)?;
        self.replace_with(from, to, vec![node])
    }

    /// Inserts text at `pos` with the marks found there.
    pub fn insert_text(&mut self, text: &str, pos: usize) -> StepResult<&mut Self> {
        let marks = self.doc.resolve(pos)?.marks();
        self.insert_text_with_marks(text, pos, pos, marks)
    }

    // ── Marks ───────────────────────────────────────────────────

    /// Adds `mark` to inline content in `from..to` where the parent allows it.
    pub fn add_mark(&mut self, from: usize, to: usize, mark: &Mark) -> StepResult<&mut Self> {
        let mut removed: Vec<(usize, usize, Mark)> = Vec::new();
        let mut added: Vec<(usize, usize)> = Vec::new();
        self.doc.nodes_between(from, to, |node, pos, parent, _| {
            if !node.is_inline() {
                return true;
            }
            let allowed = parent.is_some_and(|p| p.ty().allows_mark(mark.ty().name()));
            if !mark.is_in_set(node.marks()) && allowed {
                let start = pos.max(from);
                let end = (pos + node.node_size()).min(to);
                let new_set = mark.add_to_set(node.marks());
                for old in node.marks().iter().filter(|m| !m.is_in_set(&new_set)) {
                    match removed.last_mut() {
                        Some(last) if last.1 == start && last.2 == *old => last.1 = end,
                        _ => removed.push((start, end, old.clone())),
                    }
                }
                match added.last_mut() {
                    Some(last) if last.1 == start => last.1 = end,
                    _ => added.push((start, end)),
                }
            }
            true
        });
        for (from, to, mark) in removed {
            self.step(Step::RemoveMark { from, to, mark })?;
        }
        for (from, to) in added {
            self.step(Step::AddMark {
                from,
                to,
                mark: mark.clone(),
            })?;
        }
        Ok(self)
    }

    /// Removes every mark of type `ty` from `from..to`.
    pub fn remove_mark_type(&mut self, from: usize, to: usize, ty: &MarkType) -> StepResult<&mut Self> {
        self.remove_marks_where(from, to, |m| m.ty().name() == ty.name())
    }

    /// Removes one specific mark from `from..to`.
    pub fn remove_mark(&mut self, from: usize, to: usize, mark: &Mark) -> StepResult<&mut Self> {
        self.remove_marks_where(from, to, |m| m == mark)
    }

    fn remove_marks_where<F>(&mut self, from: usize, to: usize, matches: F) -> StepResult<&mut Self>
    where
        F: Fn(&Mark) -> bool,
    {
        struct Matched {
            mark: Mark,
            from: usize,
            to: usize,
            step: usize,
        }
        let mut matched: Vec<Matched> = Vec::new();
        let mut step = 0;
        self.doc.nodes_between(from, to, |node, pos, _, _| {
            if !node.is_inline() {
                return true;
            }
            step += 1;
            let end = (pos + node.node_size()).min(to);
            for mark in node.marks().iter().filter(|&m| matches(m)) {
                match matched
                    .iter_mut()
                    .find(|m| m.step + 1 == step && m.mark == *mark)
                {
                    Some(found) => {
                        found.to = end;
                        found.step = step;
                    }
                    None => matched.push(Matched {
                        mark: mark.clone(),
                        from: pos.max(from),
                        to: end,
                        step,
                    }),
                }
            }
            true
        });
        for m in matched {
            self.step(Step::RemoveMark {
                from: m.from,
                to: m.to,
                mark: m.mark,
            })?;
        }
        Ok(self)
    }

    // ── Node markup ─────────────────────────────────────────────

    /// Changes the type, attributes and marks of the node at `pos`, keeping
    /// its content.
    ///
    /// Only the node's opening token is replaced, so positions inside the
    /// node map straight through.
    pub fn set_node_markup(
        &mut self,
        pos: usize,
        ty: Option<&Arc<NodeType>>,
        attrs: Option<&Attrs>,
        marks: Option<Vec<Mark>>,
    ) -> StepResult<&mut Self> {
        let node = self
            .doc
            .node_at(pos)
            .ok_or_else(|| StepError::Failed(format!("no node at position {pos}")))?;
        if node.is_text() {
            return Err(StepError::Failed("cannot set markup of a text node".into()));
        }
        let same_type = ty.is_none_or(|t| **t == **node.ty());
        let ty = ty.unwrap_or(node.ty()).clone();
        let marks = marks.unwrap_or_else(|| node.marks().to_vec());
        let attrs = match attrs {
            Some(attrs) => Some(attrs.clone()),
            None if same_type => Some(node.attrs().clone()),
            None => None,
        };
        let updated = ty.create(attrs.as_ref(), Fragment::empty(), marks)?;
        if node.is_leaf() {
            return self.replace(pos, pos + 1, Slice::closed(Fragment::from_node(updated)));
        }
        let open_end = usize::from(!updated.is_leaf());
        self.step(Step::replace(pos, pos + 1, Slice::new(Fragment::from_node(updated), 0, open_end)))
    }

    /// Sets one attribute of the node at `pos`.
    pub fn set_node_attribute(&mut self, pos: usize, attr: &str, value: Value) -> StepResult<&mut Self> {
        self.step(Step::Attr {
            pos,
            attr: attr.to_string(),
            value,
        })
    }
}
