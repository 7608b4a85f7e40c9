//! Extension composition and the headless editing pipeline for folio.
//!
//! A document editor is described by an ordered list of [`Extension`]s:
//!
//! - node and mark extensions contribute schema entries, input rules and
//!   keymaps for their type
//! - any extension may carry plugins, an editability predicate, a default
//!   document and a transaction hook
//!
//! [`compose`] turns the list into a [`folio_model::Schema`], [`assemble`]
//! collects the editing pipeline, and [`Editor`] ties both to an
//! [`EditorState`].

pub mod builtin;
pub mod commands;
mod compose;
mod config;
mod editor;
mod error;
mod extension;
mod input_rules;
mod keymap;
mod pipeline;
mod plugin;
mod state;

pub use compose::compose;
pub use config::EditorConfig;
pub use editor::Editor;
pub use error::{ExtensionError, ExtensionResult, Namespace};
pub use extension::{
    Capabilities, DefaultDocument, EditablePredicate, Extension, MarkExtension, NodeExtension, PlainExtension,
    StaticDocument, TransactionHook,
};
pub use input_rules::{
    mark_input_rule, mark_input_rule_with_attrs, run_input_rules, textblock_type_input_rule, wrapping_input_rule,
    AttrsFromMatch, InputRule, RuleHandler, RuleMatch,
};
pub use keymap::{normalize_key_name, Command, Keymap};
pub use pipeline::{assemble, NodeView, NodeViewFactory, Pipeline};
pub use plugin::{Decoration, Plugin, META_APPENDED_TRANSACTION};
pub use state::EditorState;
