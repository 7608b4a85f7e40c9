//! Core type definitions for folio.
//!
//! This crate defines the small, dependency-free vocabulary shared by every
//! other folio crate:
//! - Client, document and transaction identifiers (UUID v7)
//! - The collaboration [`Version`] counter
//! - Millisecond wall-clock [`Timestamp`]s used in transaction metadata and
//!   persistence notices
//!
//! Document trees, schemas and steps live in `folio-model` and
//! `folio-transform`, not here.

mod ids;
mod timestamp;
mod version;

pub use ids::{ClientId, DocumentId, TransactionId};
pub use timestamp::Timestamp;
pub use version::Version;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("version underflow: cannot step {version} back by {steps}")]
    VersionUnderflow { version: u64, steps: usize },
}
