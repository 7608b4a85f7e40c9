//! Extension descriptors.
//!
//! An [`Extension`] is one of three shapes:
//! - [`NodeExtension`]: one node type, plus optional child node types
//! - [`MarkExtension`]: one mark type
//! - [`PlainExtension`]: behavior only (rules, keys, plugins), no schema footprint
//!
//! All three share a [`Capabilities`] record. Input-rule and keymap
//! generators are called once the schema exists, with the extension's
//! resolved type.

use crate::error::ExtensionResult;
use crate::input_rules::InputRule;
use crate::keymap::Keymap;
use crate::pipeline::NodeViewFactory;
use crate::plugin::Plugin;
use crate::state::EditorState;
use async_trait::async_trait;
use folio_model::{MarkSpec, MarkType, NodeSpec, NodeType, Schema};
use folio_transform::Transaction;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Decides whether the editor accepts document-changing transactions.
pub type EditablePredicate = Arc<dyn Fn(&EditorState) -> bool + Send + Sync>;

/// Called after every applied transaction; may return a replacement state.
pub type TransactionHook = Arc<dyn Fn(&Transaction, &EditorState) -> Option<EditorState> + Send + Sync>;

type RulesFn<T> = Arc<dyn Fn(&Arc<T>) -> ExtensionResult<Vec<InputRule>> + Send + Sync>;
type KeymapFn<T> = Arc<dyn Fn(&Arc<T>) -> Keymap + Send + Sync>;
type PlainRulesFn = Arc<dyn Fn(&Schema) -> ExtensionResult<Vec<InputRule>> + Send + Sync>;
type PlainKeymapFn = Arc<dyn Fn(&Schema) -> Keymap + Send + Sync>;

/// Supplies the document an editor starts with.
#[async_trait]
pub trait DefaultDocument: Send + Sync {
    /// Returns the document in its JSON wire form.
    async fn default_document(&self, schema: &Schema) -> ExtensionResult<Value>;
}

/// A default document known up front.
#[derive(Debug, Clone)]
pub struct StaticDocument(pub Value);

#[async_trait]
impl DefaultDocument for StaticDocument {
    async fn default_document(&self, _schema: &Schema) -> ExtensionResult<Value> {
        Ok(self.0.clone())
    }
}

/// Capabilities every extension variant may expose.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub plugins: Vec<Arc<dyn Plugin>>,
    pub default_document: Option<Arc<dyn DefaultDocument>>,
    pub editable: Option<EditablePredicate>,
    pub on_transaction: Option<TransactionHook>,
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|p| p.key()).collect();
        f.debug_struct("Capabilities")
            .field("plugins", &plugins)
            .field("default_document", &self.default_document.is_some())
            .field("editable", &self.editable.is_some())
            .field("on_transaction", &self.on_transaction.is_some())
            .finish()
    }
}

/// Builder methods for the shared capability record.
macro_rules! capability_builders {
    ($ty:ty) => {
        impl $ty {
            /// Adds an editor plugin.
            #[must_use]
            pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
                self.capabilities.plugins.push(Arc::new(plugin));
                self
            }

            /// Supplies the initial document.
            #[must_use]
            pub fn default_document(mut self, provider: impl DefaultDocument + 'static) -> Self {
                self.capabilities.default_document = Some(Arc::new(provider));
                self
            }

            /// Sets the editability predicate.
            #[must_use]
            pub fn editable<F>(mut self, f: F) -> Self
            where
                F: Fn(&EditorState) -> bool + Send + Sync + 'static,
            {
                self.capabilities.editable = Some(Arc::new(f));
                self
            }

            /// Sets the hook run after every applied transaction.
            #[must_use]
            pub fn on_transaction<F>(mut self, f: F) -> Self
            where
                F: Fn(&Transaction, &EditorState) -> Option<EditorState> + Send + Sync + 'static,
            {
                self.capabilities.on_transaction = Some(Arc::new(f));
                self
            }

            pub fn capabilities(&self) -> &Capabilities {
                &self.capabilities
            }
        }
    };
}

/// Contributes one node type, and optionally child node types that exist to
/// support it.
#[derive(Clone)]
pub struct NodeExtension {
    name: String,
    spec: NodeSpec,
    children: Vec<NodeExtension>,
    input_rules: Option<RulesFn<NodeType>>,
    keymap: Option<KeymapFn<NodeType>>,
    node_view: Option<Arc<dyn NodeViewFactory>>,
    capabilities: Capabilities,
}

impl NodeExtension {
    pub fn new(name: impl Into<String>, spec: NodeSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            children: Vec::new(),
            input_rules: None,
            keymap: None,
            node_view: None,
            capabilities: Capabilities::default(),
        }
    }

    /// Declares a child node type. Children share the node namespace.
    #[must_use]
    pub fn child(mut self, child: NodeExtension) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn input_rules<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<NodeType>) -> ExtensionResult<Vec<InputRule>> + Send + Sync + 'static,
    {
        self.input_rules = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn keymap<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<NodeType>) -> Keymap + Send + Sync + 'static,
    {
        self.keymap = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn node_view(mut self, factory: impl NodeViewFactory + 'static) -> Self {
        self.node_view = Some(Arc::new(factory));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    pub fn children(&self) -> &[NodeExtension] {
        &self.children
    }

    pub fn node_view_factory(&self) -> Option<&Arc<dyn NodeViewFactory>> {
        self.node_view.as_ref()
    }

    pub(crate) fn rules_for(&self, ty: &Arc<NodeType>) -> ExtensionResult<Vec<InputRule>> {
        self.input_rules.as_ref().map_or(Ok(Vec::new()), |f| f(ty))
    }

    pub(crate) fn keymap_for(&self, ty: &Arc<NodeType>) -> Option<Keymap> {
        self.keymap.as_ref().map(|f| f(ty))
    }
}

capability_builders!(NodeExtension);

/// Contributes one mark type.
#[derive(Clone)]
pub struct MarkExtension {
    name: String,
    spec: MarkSpec,
    input_rules: Option<RulesFn<MarkType>>,
    keymap: Option<KeymapFn<MarkType>>,
    capabilities: Capabilities,
}

impl MarkExtension {
    pub fn new(name: impl Into<String>, spec: MarkSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            input_rules: None,
            keymap: None,
            capabilities: Capabilities::default(),
        }
    }

    #[must_use]
    pub fn input_rules<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<MarkType>) -> ExtensionResult<Vec<InputRule>> + Send + Sync + 'static,
    {
        self.input_rules = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn keymap<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<MarkType>) -> Keymap + Send + Sync + 'static,
    {
        self.keymap = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &MarkSpec {
        &self.spec
    }

    pub(crate) fn rules_for(&self, ty: &Arc<MarkType>) -> ExtensionResult<Vec<InputRule>> {
        self.input_rules.as_ref().map_or(Ok(Vec::new()), |f| f(ty))
    }

    pub(crate) fn keymap_for(&self, ty: &Arc<MarkType>) -> Option<Keymap> {
        self.keymap.as_ref().map(|f| f(ty))
    }
}

capability_builders!(MarkExtension);

/// Cross-cutting behavior with no schema footprint.
#[derive(Clone)]
pub struct PlainExtension {
    name: String,
    input_rules: Option<PlainRulesFn>,
    keymap: Option<PlainKeymapFn>,
    capabilities: Capabilities,
}

impl PlainExtension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_rules: None,
            keymap: None,
            capabilities: Capabilities::default(),
        }
    }

    #[must_use]
    pub fn input_rules<F>(mut self, f: F) -> Self
    where
        F: Fn(&Schema) -> ExtensionResult<Vec<InputRule>> + Send + Sync + 'static,
    {
        self.input_rules = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn keymap<F>(mut self, f: F) -> Self
    where
        F: Fn(&Schema) -> Keymap + Send + Sync + 'static,
    {
        self.keymap = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rules_for(&self, schema: &Schema) -> ExtensionResult<Vec<InputRule>> {
        self.input_rules.as_ref().map_or(Ok(Vec::new()), |f| f(schema))
    }

    pub(crate) fn keymap_for(&self, schema: &Schema) -> Option<Keymap> {
        self.keymap.as_ref().map(|f| f(schema))
    }
}

capability_builders!(PlainExtension);

/// A pluggable editor component.
#[derive(Clone)]
pub enum Extension {
    Node(NodeExtension),
    Mark(MarkExtension),
    Plain(PlainExtension),
}

impl Extension {
    pub fn name(&self) -> &str {
        match self {
            Extension::Node(ext) => ext.name(),
            Extension::Mark(ext) => ext.name(),
            Extension::Plain(ext) => ext.name(),
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        match self {
            Extension::Node(ext) => ext.capabilities(),
            Extension::Mark(ext) => ext.capabilities(),
            Extension::Plain(ext) => ext.capabilities(),
        }
    }
}

impl From<NodeExtension> for Extension {
    fn from(ext: NodeExtension) -> Self {
        Extension::Node(ext)
    }
}

impl From<MarkExtension> for Extension {
    fn from(ext: MarkExtension) -> Self {
        Extension::Mark(ext)
    }
}

impl From<PlainExtension> for Extension {
    fn from(ext: PlainExtension) -> Self {
        Extension::Plain(ext)
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, children): (&str, Vec<&str>) = match self {
            Extension::Node(ext) => ("Node", ext.children.iter().map(|c| c.name.as_str()).collect()),
            Extension::Mark(_) => ("Mark", Vec::new()),
            Extension::Plain(_) => ("Plain", Vec::new()),
        };
        f.debug_struct(kind)
            .field("name", &self.name())
            .field("children", &children)
            .field("capabilities", self.capabilities())
            .finish()
    }
}
