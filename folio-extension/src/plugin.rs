//! Editor plugins.

use crate::state::EditorState;
use folio_transform::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Meta key set on transactions appended by a plugin. Holds the id of the
/// transaction that triggered them.
pub const META_APPENDED_TRANSACTION: &str = "appendedTransaction";

/// Observes and extends the transactions applied to an [`EditorState`].
///
/// Plugins run in registration order. The default implementations accept
/// every transaction and append nothing.
pub trait Plugin: Send + Sync {
    /// Unique key identifying the plugin.
    fn key(&self) -> &str;

    /// Returning `false` drops the transaction before it is applied.
    fn filter_transaction(&self, _tr: &Transaction, _state: &EditorState) -> bool {
        true
    }

    /// Called with the transactions applied since this plugin last looked,
    /// the state before them and the state after them. A returned
    /// transaction is applied on top and shown to every plugin in turn.
    fn append_transaction(
        &self,
        _transactions: &[Transaction],
        _old_state: &EditorState,
        _new_state: &EditorState,
    ) -> Option<Transaction> {
        None
    }

    /// Presentation hints for the current state.
    fn decorations(&self, _state: &EditorState) -> Vec<Decoration> {
        Vec::new()
    }
}

/// A presentation hint. Rendering is left to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Decoration {
    /// Something drawn at a position without occupying document space.
    Widget {
        pos: usize,
        attrs: BTreeMap<String, String>,
    },
    /// Attributes applied to the inline content in `from..to`.
    Inline {
        from: usize,
        to: usize,
        attrs: BTreeMap<String, String>,
    },
    /// Attributes applied to the node spanning `from..to`.
    Node {
        from: usize,
        to: usize,
        attrs: BTreeMap<String, String>,
    },
}
