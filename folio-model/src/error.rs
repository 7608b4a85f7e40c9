//! Error types for the document model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building a schema.
///
/// All of these are construction-time programmer errors: no partial schema is
/// ever produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("duplicate node type: {0}")]
    DuplicateNodeType(String),

    #[error("duplicate mark type: {0}")]
    DuplicateMarkType(String),

    #[error("schema is missing the top node type '{0}'")]
    MissingTopNode(String),

    #[error("every schema needs a 'text' node type")]
    MissingTextType,

    #[error("the text node type must not have attributes")]
    TextTypeWithAttributes,

    #[error("content expression of '{node}' references unknown name '{name}'")]
    UnknownContentReference { node: String, name: String },

    #[error("marks of '{node}' reference unknown mark or group '{name}'")]
    UnknownMarkReference { node: String, name: String },

    #[error("mark '{mark}' excludes unknown mark or group '{name}'")]
    UnknownExcludesReference { mark: String, name: String },

    #[error("invalid content expression '{expr}' on '{node}': {reason}")]
    InvalidContentExpression {
        node: String,
        expr: String,
        reason: String,
    },

    #[error("content expression of '{0}' mixes inline and block content")]
    MixedContent(String),
}

/// Errors raised by the replace algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplaceError {
    #[error("inserted content deeper than insertion position")]
    TooDeep,

    #[error("inconsistent open depths")]
    InconsistentOpenDepths,

    #[error("cannot join {sub} onto {main}")]
    CannotJoin { main: String, sub: String },
}

/// Errors that can occur in document model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("replace error: {0}")]
    Replace(#[from] ReplaceError),

    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("unknown mark type: {0}")]
    UnknownMarkType(String),

    #[error("missing required attribute '{attr}' on {owner}")]
    MissingAttribute { owner: String, attr: String },

    #[error("unsupported attribute '{attr}' on {owner}")]
    UnknownAttribute { owner: String, attr: String },

    #[error("invalid content for node {0}")]
    InvalidContent(String),

    #[error("mark '{mark}' is not allowed in {node}")]
    MarkNotAllowed { node: String, mark: String },

    #[error("position {pos} out of range (document size {size})")]
    PositionOutOfRange { pos: usize, size: usize },

    #[error("empty text nodes are not allowed")]
    EmptyText,

    #[error("malformed JSON document: {0}")]
    MalformedJson(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
