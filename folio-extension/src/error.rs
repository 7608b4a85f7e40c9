//! Error types for extension composition and the editor.

use folio_model::{ModelError, SchemaError};
use folio_transform::StepError;
use std::fmt;
use thiserror::Error;

/// Result type for extension operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// The name table an extension registers into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Node,
    Mark,
    Plain,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Namespace::Node => "node",
            Namespace::Mark => "mark",
            Namespace::Plain => "extension",
        })
    }
}

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("duplicate {namespace} name: '{name}'")]
    DuplicateName { namespace: Namespace, name: String },

    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error("invalid input rule pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unrecognized modifier '{modifier}' in key '{key}'")]
    InvalidKey { key: String, modifier: String },

    #[error("extension '{0}' has no type in the composed schema")]
    MissingType(String),

    #[error("editor is read-only")]
    ReadOnly,

    #[error("transaction was not started from the current document")]
    MismatchedTransaction,

    #[error("no extension provides a default document")]
    NoDefaultDocument,

    #[error("default document unavailable: {0}")]
    DefaultDocument(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
