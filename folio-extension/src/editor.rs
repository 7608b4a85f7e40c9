//! Headless editor: composed schema, assembled pipeline and current state.

use crate::compose::compose;
use crate::config::EditorConfig;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::Extension;
use crate::input_rules::run_input_rules;
use crate::keymap::{normalize_key_name, Command};
use crate::pipeline::{assemble, NodeView, Pipeline};
use crate::plugin::Decoration;
use crate::state::EditorState;
use folio_model::{Mark, Node, Schema};
use folio_transform::{Selection, Transaction};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// An editor built from an extension list.
///
/// Owns the current [`EditorState`]. Local edits go through
/// [`dispatch`](Editor::dispatch), which checks editability and runs
/// transaction hooks; remote edits go through
/// [`apply_remote`](Editor::apply_remote), which does neither.
pub struct Editor {
    extensions: Vec<Extension>,
    schema: Arc<Schema>,
    pipeline: Pipeline,
    config: EditorConfig,
    state: EditorState,
}

impl Editor {
    /// Builds an editor whose initial document comes from the first
    /// extension providing one.
    pub async fn create(extensions: Vec<Extension>, config: EditorConfig) -> ExtensionResult<Self> {
        let (schema, pipeline) = build(&extensions, &config)?;
        let provider = pipeline
            .default_document
            .clone()
            .ok_or(ExtensionError::NoDefaultDocument)?;
        let doc = provider.default_document(&schema).await?;
        Self::finish(extensions, config, schema, pipeline, doc)
    }

    /// Builds an editor over a known document.
    pub fn with_document(extensions: Vec<Extension>, config: EditorConfig, doc: Value) -> ExtensionResult<Self> {
        let (schema, pipeline) = build(&extensions, &config)?;
        Self::finish(extensions, config, schema, pipeline, doc)
    }

    fn finish(
        extensions: Vec<Extension>,
        config: EditorConfig,
        schema: Arc<Schema>,
        pipeline: Pipeline,
        doc: Value,
    ) -> ExtensionResult<Self> {
        let state = EditorState::from_json(Arc::clone(&schema), doc, pipeline.plugins.clone())?;
        info!(
            extensions = extensions.len(),
            doc_size = state.doc().content().size(),
            "editor created"
        );
        Ok(Self {
            extensions,
            schema,
            pipeline,
            config,
            state,
        })
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        self.state.doc()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Whether local edits may change the document. Editors without an
    /// editability predicate are always editable.
    pub fn editable(&self) -> bool {
        self.pipeline.editable.as_ref().is_none_or(|f| f(&self.state))
    }

    /// Applies a local transaction.
    ///
    /// Refuses document changes while not editable. Returns every applied
    /// transaction, root first; an empty list means a plugin filtered the
    /// transaction out. Transaction hooks run in order, each seeing the
    /// state left by the previous one.
    pub fn dispatch(&mut self, tr: Transaction) -> ExtensionResult<Vec<Transaction>> {
        if tr.doc_changed() && !self.editable() {
            debug!(tr = %tr.id(), "edit refused: editor is read-only");
            return Err(ExtensionError::ReadOnly);
        }
        let (mut state, applied) = self.state.apply_transaction(tr)?;
        let Some(root) = applied.first() else {
            return Ok(applied);
        };
        for hook in &self.pipeline.hooks {
            if let Some(next) = hook(root, &state) {
                state = next;
            }
        }
        self.state = state;
        Ok(applied)
    }

    /// Applies a transaction carrying remote changes. No filter, editability
    /// check or hook runs; plugins may still append transactions, which are
    /// returned after the root.
    pub fn apply_remote(&mut self, tr: Transaction) -> ExtensionResult<Vec<Transaction>> {
        let (state, applied) = self.remote_state(tr)?;
        self.state = state;
        Ok(applied)
    }

    /// The state [`apply_remote`](Editor::apply_remote) would produce, without
    /// committing it.
    ///
    /// Plugins only append while the editor is editable. A read-only editor
    /// takes remote changes as they are and leaves plugin follow-ups to a
    /// writable replica.
    pub fn remote_state(&self, tr: Transaction) -> ExtensionResult<(EditorState, Vec<Transaction>)> {
        if self.editable() {
            return self.state.apply_unfiltered(tr);
        }
        let state = self.state.apply_without_plugins(&tr)?;
        Ok((state, vec![tr]))
    }

    /// Replaces the state with one derived from it, e.g. by
    /// [`remote_state`](Editor::remote_state).
    pub fn update_state(&mut self, state: EditorState) -> ExtensionResult<()> {
        if !Arc::ptr_eq(state.schema(), &self.schema) {
            return Err(ExtensionError::MismatchedTransaction);
        }
        self.state = state;
        Ok(())
    }

    /// Handles text typed over `from..to`.
    ///
    /// Input rules get the first chance; otherwise the text is inserted with
    /// the stored marks (or the marks at `from`).
    pub fn handle_text_input(&mut self, from: usize, to: usize, text: &str) -> ExtensionResult<Vec<Transaction>> {
        if let Some(tr) = run_input_rules(
            &self.pipeline.input_rules,
            &self.state,
            from,
            to,
            text,
            self.config.input_rule_lookbehind,
        )? {
            return self.dispatch(tr);
        }
        let marks: Vec<Mark> = match self.state.stored_marks() {
            Some(marks) => marks.to_vec(),
            None => self.state.doc().resolve(from)?.marks(),
        };
        let mut tr = self.state.tr();
        tr.insert_text_with_marks(text, from, to, marks)?;
        tr.set_selection(Selection::cursor(from + text.chars().count()));
        self.dispatch(tr)
    }

    /// Handles a key press. The first keymap whose command applies wins.
    /// Returns `None` when no binding handled the key.
    pub fn handle_key(&mut self, key: &str) -> ExtensionResult<Option<Vec<Transaction>>> {
        let key = normalize_key_name(key, self.config.mac)?;
        let tr = self
            .pipeline
            .keymaps
            .iter()
            .find_map(|keymap| keymap.handle(&key, &self.state));
        match tr {
            Some(tr) => self.dispatch(tr).map(Some),
            None => Ok(None),
        }
    }

    /// Runs a command against the current state.
    pub fn run(&mut self, command: &Command) -> ExtensionResult<Option<Vec<Transaction>>> {
        match command(&self.state) {
            Some(tr) => self.dispatch(tr).map(Some),
            None => Ok(None),
        }
    }

    /// Decorations from every plugin, in plugin order.
    pub fn decorations(&self) -> Vec<Decoration> {
        self.state
            .plugins()
            .iter()
            .flat_map(|plugin| plugin.decorations(&self.state))
            .collect()
    }

    /// Creates a view for `node` when its type declared a factory.
    pub fn create_node_view(&self, node: &Node) -> Option<Box<dyn NodeView>> {
        self.pipeline
            .node_views
            .get(node.type_name())
            .map(|factory| factory.create(node))
    }

    /// Replaces the whole document, resetting selection and stored marks.
    pub fn reset(&mut self, doc: Node) {
        self.state = self.state.with_doc(doc);
    }

    /// Replaces the whole document from its JSON wire form.
    pub fn reset_json(&mut self, doc: Value) -> ExtensionResult<()> {
        let doc = Node::from_value(&self.schema, doc)?;
        self.reset(doc);
        Ok(())
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("extensions", &self.extensions)
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

fn build(extensions: &[Extension], config: &EditorConfig) -> ExtensionResult<(Arc<Schema>, Pipeline)> {
    let schema = Arc::new(compose(extensions)?);
    let pipeline = assemble(extensions, &schema, config)?;
    Ok((schema, pipeline))
}
