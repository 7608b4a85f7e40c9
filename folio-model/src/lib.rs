//! Document model for folio.
//!
//! Defines the tree every other folio crate operates on:
//! - [`Schema`]: node and mark type tables compiled from a [`SchemaSpec`]
//! - [`Node`] / [`Fragment`]: the immutable document tree
//! - [`Mark`]: typed annotations on inline content
//! - [`Slice`] and the replace algorithm used by steps
//! - [`ResolvedPos`]: positions with their ancestor path
//! - [`NodeJson`]: the JSON wire form exchanged between replicas
//!
//! Documents are values. Every edit produces a new tree; structure is shared
//! by cloning only the touched path.

mod attrs;
mod content;
mod error;
mod fragment;
mod json;
mod mark;
mod node;
mod replace;
mod resolved;
mod schema;
mod slice;

pub use attrs::{compute_attrs, AttrSpec, Attrs};
pub use content::{ContentExpr, ContentParseError};
pub use error::{ModelError, ModelResult, ReplaceError, SchemaError};
pub use fragment::Fragment;
pub use json::{MarkJson, NodeJson, SliceJson};
pub use mark::Mark;
pub use node::Node;
pub use resolved::ResolvedPos;
pub use schema::{MarkSpec, MarkType, NodeSpec, NodeType, Schema, SchemaSpec};
pub use slice::Slice;
