//! Editing pipeline assembly.
//!
//! Collects what every extension contributes once the schema exists. Order
//! is significant everywhere: top-level extensions come first in list order,
//! then child node extensions. Earlier keymaps win on conflicting keys and
//! earlier plugins see transactions first.

use crate::compose::child_nodes;
use crate::config::EditorConfig;
use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::{Capabilities, DefaultDocument, EditablePredicate, Extension, NodeExtension, TransactionHook};
use crate::input_rules::InputRule;
use crate::keymap::Keymap;
use crate::plugin::Plugin;
use folio_model::{Node, NodeType, Schema};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A host-side view of one node. Rendering is out of scope; views are told
/// about updates and teardown.
pub trait NodeView: Send {
    /// Called when the node changes. Returning `false` asks the host to
    /// recreate the view.
    fn update(&mut self, node: &Node) -> bool;

    fn destroy(&mut self) {}
}

/// Creates node views for one node type.
pub trait NodeViewFactory: Send + Sync {
    fn create(&self, node: &Node) -> Box<dyn NodeView>;
}

/// Everything assembled from an extension list.
#[derive(Clone, Default)]
pub struct Pipeline {
    pub(crate) input_rules: Vec<InputRule>,
    pub(crate) keymaps: Vec<Keymap>,
    pub(crate) plugins: Vec<Arc<dyn Plugin>>,
    pub(crate) node_views: BTreeMap<String, Arc<dyn NodeViewFactory>>,
    pub(crate) hooks: Vec<TransactionHook>,
    pub(crate) editable: Option<EditablePredicate>,
    pub(crate) default_document: Option<Arc<dyn DefaultDocument>>,
}

impl Pipeline {
    pub fn input_rules(&self) -> &[InputRule] {
        &self.input_rules
    }

    /// Keymaps with normalized key names, highest priority first.
    pub fn keymaps(&self) -> &[Keymap] {
        &self.keymaps
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    pub fn node_views(&self) -> &BTreeMap<String, Arc<dyn NodeViewFactory>> {
        &self.node_views
    }

    pub fn hooks(&self) -> &[TransactionHook] {
        &self.hooks
    }

    pub fn editable(&self) -> Option<&EditablePredicate> {
        self.editable.as_ref()
    }

    pub fn default_document(&self) -> Option<&Arc<dyn DefaultDocument>> {
        self.default_document.as_ref()
    }

    fn add_node(&mut self, node: &NodeExtension, schema: &Schema, mac: bool) -> ExtensionResult<()> {
        let ty = node_type(schema, node.name())?;
        self.input_rules.extend(node.rules_for(ty)?);
        if let Some(keymap) = node.keymap_for(ty) {
            self.keymaps.push(keymap.normalize(mac)?);
        }
        if let Some(factory) = node.node_view_factory() {
            self.node_views.insert(node.name().to_string(), Arc::clone(factory));
        }
        Ok(())
    }

    fn add_capabilities(&mut self, caps: &Capabilities) {
        self.plugins.extend(caps.plugins.iter().cloned());
        if let Some(hook) = &caps.on_transaction {
            self.hooks.push(Arc::clone(hook));
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|p| p.key()).collect();
        f.debug_struct("Pipeline")
            .field("input_rules", &self.input_rules)
            .field("keymaps", &self.keymaps)
            .field("plugins", &plugins)
            .field("node_views", &self.node_views.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks.len())
            .field("editable", &self.editable.is_some())
            .field("default_document", &self.default_document.is_some())
            .finish()
    }
}

fn node_type<'a>(schema: &'a Schema, name: &str) -> ExtensionResult<&'a Arc<NodeType>> {
    schema
        .node_type(name)
        .ok_or_else(|| ExtensionError::MissingType(name.to_string()))
}

/// Assembles the editing pipeline for `extensions` over their composed schema.
pub fn assemble(extensions: &[Extension], schema: &Schema, config: &EditorConfig) -> ExtensionResult<Pipeline> {
    let mut pipeline = Pipeline::default();

    for ext in extensions {
        match ext {
            Extension::Node(node) => pipeline.add_node(node, schema, config.mac)?,
            Extension::Mark(mark) => {
                let ty = schema
                    .mark_type(mark.name())
                    .ok_or_else(|| ExtensionError::MissingType(mark.name().to_string()))?;
                pipeline.input_rules.extend(mark.rules_for(ty)?);
                if let Some(keymap) = mark.keymap_for(ty) {
                    pipeline.keymaps.push(keymap.normalize(config.mac)?);
                }
            }
            Extension::Plain(plain) => {
                pipeline.input_rules.extend(plain.rules_for(schema)?);
                if let Some(keymap) = plain.keymap_for(schema) {
                    pipeline.keymaps.push(keymap.normalize(config.mac)?);
                }
            }
        }
        let caps = ext.capabilities();
        pipeline.add_capabilities(caps);
        if pipeline.editable.is_none() {
            pipeline.editable = caps.editable.clone();
        }
        if pipeline.default_document.is_none() {
            pipeline.default_document = caps.default_document.clone();
        }
    }

    for child in child_nodes(extensions) {
        pipeline.add_node(child, schema, config.mac)?;
        pipeline.add_capabilities(child.capabilities());
    }

    debug!(
        input_rules = pipeline.input_rules.len(),
        keymaps = pipeline.keymaps.len(),
        plugins = pipeline.plugins.len(),
        node_views = pipeline.node_views.len(),
        "pipeline assembled"
    );
    Ok(pipeline)
}
