//! Error types for steps and transforms.

use folio_model::ModelError;
use thiserror::Error;

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Errors that can occur when applying, inverting or parsing steps.
#[derive(Debug, Error)]
pub enum StepError {
    /// The step does not fit the document it was applied to.
    #[error("step failed: {0}")]
    Failed(String),

    /// The document model rejected the result of the step.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A serialized step could not be understood.
    #[error("malformed step: {0}")]
    Malformed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
