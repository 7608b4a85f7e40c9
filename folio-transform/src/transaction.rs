//! Transactions: transforms with selection, stored marks and metadata.

use crate::error::StepResult;
use crate::selection::Selection;
use crate::transform::Transform;
use folio_model::{Mark, Node, Schema};
use folio_types::{Timestamp, TransactionId};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Meta key set on transactions that carry remote steps.
pub const META_REMOTE: &str = "remote";
/// Meta key recording how many pending steps a remote transaction rebased.
pub const META_REBASED: &str = "rebased";
/// Meta key marking a transaction that history should not record.
pub const META_ADD_TO_HISTORY: &str = "addToHistory";

/// One logical edit: steps plus the resulting selection and stored marks.
///
/// Dereferences to its [`Transform`], so every transform helper is available.
/// The selection set before further steps are added is mapped through them
/// when read.
#[derive(Debug, Clone)]
pub struct Transaction {
    tr: Transform,
    selection: Selection,
    selection_steps: usize,
    selection_set: bool,
    stored_marks: Option<Vec<Mark>>,
    stored_marks_set: bool,
    meta: BTreeMap<String, Value>,
    id: TransactionId,
    time: Timestamp,
}

impl Transaction {
    /// Starts a transaction on `doc` with the current selection and stored marks.
    #[must_use]
    pub fn new(
        schema: Arc<Schema>,
        doc: Node,
        selection: Selection,
        stored_marks: Option<Vec<Mark>>,
    ) -> Self {
        Self {
            tr: Transform::new(schema, doc),
            selection,
            selection_steps: 0,
            selection_set: false,
            stored_marks,
            stored_marks_set: false,
            meta: BTreeMap::new(),
            id: TransactionId::new(),
            time: Timestamp::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    #[must_use]
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// Consumes the transaction, returning its transform.
    #[must_use]
    pub fn into_transform(self) -> Transform {
        self.tr
    }

    /// The selection after all steps so far.
    #[must_use]
    pub fn selection(&self) -> Selection {
        let steps = self.tr.steps().len();
        if self.selection_steps == steps {
            return self.selection;
        }
        let mapping = self.tr.mapping().slice(self.selection_steps, steps);
        self.selection.map(self.tr.doc(), &mapping)
    }

    /// Replaces the selection. Moving the selection drops stored marks.
    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        let size = self.tr.doc().content().size();
        self.selection = Selection::new(selection.anchor.min(size), selection.head.min(size));
        self.selection_steps = self.tr.steps().len();
        self.selection_set = true;
        self.stored_marks = None;
        self.stored_marks_set = false;
        self
    }

    /// Whether the selection was set explicitly.
    #[must_use]
    pub fn selection_set(&self) -> bool {
        self.selection_set
    }

    #[must_use]
    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    /// Sets marks to apply to the next typed text.
    pub fn set_stored_marks(&mut self, marks: Option<Vec<Mark>>) -> &mut Self {
        self.stored_marks = marks;
        self.stored_marks_set = true;
        self
    }

    pub fn add_stored_mark(&mut self, mark: &Mark) -> &mut Self {
        let current = self.current_marks();
        self.set_stored_marks(Some(mark.add_to_set(&current)))
    }

    pub fn remove_stored_mark(&mut self, mark: &Mark) -> &mut Self {
        let current = self.current_marks();
        let remaining = mark.ty().remove_from_set(&current);
        self.set_stored_marks(Some(remaining))
    }

    #[must_use]
    pub fn stored_marks_set(&self) -> bool {
        self.stored_marks_set
    }

    /// Stored marks, or the marks at the selection head.
    fn current_marks(&self) -> Vec<Mark> {
        if let Some(marks) = &self.stored_marks {
            return marks.clone();
        }
        let head = self.selection().head;
        self.tr
            .doc()
            .resolve(head)
            .map(|pos| pos.marks())
            .unwrap_or_default()
    }

    /// Replaces the selection with text, using stored marks when set.
    pub fn replace_selection_with_text(&mut self, text: &str) -> StepResult<&mut Self> {
        let sel = self.selection();
        let marks = self.current_marks();
        self.tr.insert_text_with_marks(text, sel.from(), sel.to(), marks)?;
        let end = sel.from() + text.chars().count();
        self.set_selection(Selection::cursor(end));
        Ok(self)
    }

    /// Deletes the selected range.
    pub fn delete_selection(&mut self) -> StepResult<&mut Self> {
        let sel = self.selection();
        if !sel.is_empty() {
            self.tr.delete(sel.from(), sel.to())?;
            self.set_selection(Selection::cursor(sel.from()));
        }
        Ok(self)
    }

    /// Replaces the selection with a node.
    pub fn replace_selection_with(&mut self, node: Node) -> StepResult<&mut Self> {
        let sel = self.selection();
        let size = node.node_size();
        self.tr.replace_with(sel.from(), sel.to(), vec![node])?;
        self.set_selection(Selection::cursor(sel.from() + size));
        Ok(self)
    }

    /// Attaches metadata under `key`. Values that fail to serialize are stored as `null`.
    pub fn set_meta(&mut self, key: &str, value: impl Serialize) -> &mut Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.meta.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn get_meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    #[must_use]
    pub fn meta(&self) -> &BTreeMap<String, Value> {
        &self.meta
    }
}

impl Deref for Transaction {
    type Target = Transform;

    fn deref(&self) -> &Transform {
        &self.tr
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut Transform {
        &mut self.tr
    }
}
