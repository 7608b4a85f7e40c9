//! Error types for the collaboration layer.

use folio_extension::ExtensionError;
use folio_model::ModelError;
use folio_types::Version;
use thiserror::Error;

/// Result type for collaboration operations.
pub type CollabResult<T> = Result<T, CollabError>;

/// Errors that can occur while collaborating on a document.
#[derive(Debug, Error)]
pub enum CollabError {
    /// No snapshot has been received yet.
    #[error("session not synced: no snapshot received")]
    NotSynced,

    /// The session was closed.
    #[error("session closed")]
    Closed,

    /// A local edit was attempted while the document is not writable.
    #[error("document is read-only")]
    ReadOnly,

    /// The peer sent something this replica cannot interpret, such as a step
    /// that does not fit the local schema or document.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A remote batch starts past the local version; steps are missing.
    #[error("version gap: local replica at {local}, batch starts at {base}")]
    VersionGap { local: Version, base: Version },

    /// A snapshot arrived while local steps were still unconfirmed.
    #[error("resync required: snapshot received with {pending} unconfirmed steps")]
    ResyncRequired { pending: usize },

    /// A batch was not based on the authority's current version.
    #[error("stale batch: based on {got}, authority is at {expected}")]
    Conflict { expected: Version, got: Version },

    /// Sending through the transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer kept rejecting our batches.
    #[error("batch rejected {attempts} times in a row: {message}")]
    Rejected { attempts: u32, message: String },

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Extension(ExtensionError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CollabError {
    /// Whether the session can carry on after this error.
    ///
    /// Transport failures and stale batches are retried on the next flush;
    /// a refused read-only edit only drops that edit.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CollabError::Transport(_) | CollabError::Conflict { .. } | CollabError::ReadOnly
        )
    }
}

impl From<ExtensionError> for CollabError {
    fn from(err: ExtensionError) -> Self {
        match err {
            ExtensionError::ReadOnly => CollabError::ReadOnly,
            other => CollabError::Extension(other),
        }
    }
}
