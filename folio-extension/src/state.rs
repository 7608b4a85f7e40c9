//! Editor state: document, selection, stored marks and plugins.

use crate::error::{ExtensionError, ExtensionResult};
use crate::plugin::{Plugin, META_APPENDED_TRANSACTION};
use folio_model::{Mark, Node, Schema};
use folio_transform::{Selection, Transaction};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// An immutable snapshot of the editor.
///
/// Applying a transaction yields a new state; the old one stays valid.
#[derive(Clone)]
pub struct EditorState {
    schema: Arc<Schema>,
    doc: Node,
    selection: Selection,
    stored_marks: Option<Vec<Mark>>,
    plugins: Arc<[Arc<dyn Plugin>]>,
}

impl EditorState {
    /// Creates a state with the cursor at the start of the document.
    pub fn new(schema: Arc<Schema>, doc: Node, plugins: Vec<Arc<dyn Plugin>>) -> Self {
        let selection = Selection::at_start(&doc);
        Self {
            schema,
            doc,
            selection,
            stored_marks: None,
            plugins: plugins.into(),
        }
    }

    /// Creates a state from a document in its JSON wire form.
    pub fn from_json(schema: Arc<Schema>, doc: Value, plugins: Vec<Arc<dyn Plugin>>) -> ExtensionResult<Self> {
        let doc = Node::from_value(&schema, doc)?;
        Ok(Self::new(schema, doc, plugins))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// Starts a transaction on this state.
    pub fn tr(&self) -> Transaction {
        Transaction::new(
            Arc::clone(&self.schema),
            self.doc.clone(),
            self.selection,
            self.stored_marks.clone(),
        )
    }

    /// A copy of this state with a different document, keeping plugins.
    pub fn with_doc(&self, doc: Node) -> Self {
        Self::new(Arc::clone(&self.schema), doc, self.plugins.to_vec())
    }

    /// Applies a transaction, returning the resulting state.
    pub fn apply(&self, tr: Transaction) -> ExtensionResult<EditorState> {
        Ok(self.apply_transaction(tr)?.0)
    }

    /// Applies a transaction and whatever plugins append to it.
    ///
    /// Returns the new state and every transaction that was applied, root
    /// first. A root transaction rejected by a plugin filter leaves the state
    /// unchanged and applies nothing.
    pub fn apply_transaction(&self, root: Transaction) -> ExtensionResult<(EditorState, Vec<Transaction>)> {
        if !self.filter(&root, None) {
            trace!(tr = %root.id(), "transaction filtered");
            return Ok((self.clone(), Vec::new()));
        }
        self.apply_with_plugins(root)
    }

    /// Applies a transaction that must not be refused, such as confirmed
    /// remote steps. Plugins may still append to it.
    pub fn apply_unfiltered(&self, root: Transaction) -> ExtensionResult<(EditorState, Vec<Transaction>)> {
        self.apply_with_plugins(root)
    }

    /// Applies a transaction without consulting any plugin.
    pub fn apply_without_plugins(&self, tr: &Transaction) -> ExtensionResult<EditorState> {
        self.apply_inner(tr)
    }

    fn apply_with_plugins(&self, root: Transaction) -> ExtensionResult<(EditorState, Vec<Transaction>)> {
        let root_id = root.id();
        let mut new_state = self.apply_inner(&root)?;
        let mut trs = vec![root];
        let mut seen: Option<Vec<(EditorState, usize)>> = None;

        loop {
            let mut have_new = false;
            for (i, plugin) in self.plugins.iter().enumerate() {
                let (old_state, n) = match &seen {
                    Some(seen) => (seen[i].0.clone(), seen[i].1),
                    None => (self.clone(), 0),
                };
                if n < trs.len() {
                    if let Some(mut tr) = plugin.append_transaction(&trs[n..], &old_state, &new_state) {
                        if new_state.filter(&tr, Some(i)) {
                            tr.set_meta(META_APPENDED_TRANSACTION, root_id);
                            if seen.is_none() {
                                seen = Some(
                                    (0..self.plugins.len())
                                        .map(|j| {
                                            if j < i {
                                                (new_state.clone(), trs.len())
                                            } else {
                                                (self.clone(), 0)
                                            }
                                        })
                                        .collect(),
                                );
                            }
                            trace!(plugin = plugin.key(), "plugin appended a transaction");
                            new_state = new_state.apply_inner(&tr)?;
                            trs.push(tr);
                            have_new = true;
                        }
                    }
                }
                if let Some(seen) = &mut seen {
                    seen[i] = (new_state.clone(), trs.len());
                }
            }
            if !have_new {
                return Ok((new_state, trs));
            }
        }
    }

    fn filter(&self, tr: &Transaction, ignore: Option<usize>) -> bool {
        self.plugins
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != ignore)
            .all(|(_, plugin)| plugin.filter_transaction(tr, self))
    }

    fn apply_inner(&self, tr: &Transaction) -> ExtensionResult<EditorState> {
        if *tr.before() != self.doc {
            return Err(ExtensionError::MismatchedTransaction);
        }
        let stored_marks = if tr.stored_marks_set() || !(tr.doc_changed() || tr.selection_set()) {
            tr.stored_marks().map(<[Mark]>::to_vec)
        } else {
            None
        };
        Ok(Self {
            schema: Arc::clone(&self.schema),
            doc: tr.doc().clone(),
            selection: tr.selection(),
            stored_marks,
            plugins: Arc::clone(&self.plugins),
        })
    }
}

impl fmt::Debug for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|p| p.key()).collect();
        f.debug_struct("EditorState")
            .field("doc", &self.doc)
            .field("selection", &self.selection)
            .field("stored_marks", &self.stored_marks)
            .field("plugins", &plugins)
            .finish()
    }
}
