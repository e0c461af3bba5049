//! Pipeline and operation error taxonomy.
//!
//! Three classes of operation-scoped failures exist: an unreconstructible
//! rank declaration, a metadata/shape reconciliation failure, and a failure
//! inside the operation's own computation. All carry the offending
//! operation's name, are never retried, and terminate the step. Absent
//! metadata is not an error anywhere in the crate.

use crate::ops::OperationRank;

/// Source error type surfaced from operations and visitors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure scoped to a single operation step.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// The operation declared an output rank the engine cannot embed back
    /// into full-rank coordinate space (`Zero`, `None`, or fixed rank > 2).
    #[error("operation `{operation}` declared an unreconstructible output rank ({declared})")]
    InvalidOutputRank {
        operation: String,
        declared: OperationRank,
    },

    /// The squeezed slice does not satisfy the operation's declared
    /// input rank.
    #[error("operation `{operation}` expects input rank {declared}, got a rank-{actual} slice")]
    InputRankMismatch {
        operation: String,
        declared: OperationRank,
        actual: usize,
    },

    /// The operation declared no usable input rank for delta computation.
    #[error("operation `{operation}` declares input rank NONE, which cannot be resolved")]
    UnresolvedInputRank { operation: String },

    /// Reading, cloning, or reshaping metadata failed during reconciliation.
    #[error("operation `{operation}`: metadata reconciliation failed: {source}")]
    Metadata {
        operation: String,
        #[source]
        source: BoxError,
    },

    /// The operation's own computation failed.
    #[error("operation `{operation}` failed: {source}")]
    Process {
        operation: String,
        #[source]
        source: BoxError,
    },
}

impl OperationError {
    /// Wrap a metadata/shape failure with the operation's identity.
    pub fn metadata(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        OperationError::Metadata {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Wrap a computation failure with the operation's identity.
    pub fn process(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        OperationError::Process {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Name of the operation the failure is scoped to.
    pub fn operation(&self) -> &str {
        match self {
            OperationError::InvalidOutputRank { operation, .. }
            | OperationError::InputRankMismatch { operation, .. }
            | OperationError::UnresolvedInputRank { operation }
            | OperationError::Metadata { operation, .. }
            | OperationError::Process { operation, .. } => operation,
        }
    }
}

/// A failure of a whole series run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("execution visitor failed: {0}")]
    Visitor(#[source] BoxError),

    #[error(transparent)]
    Dataset(#[from] crate::data::DatasetError),

    #[error("run cancelled by monitor")]
    Cancelled,

    #[error("operation series is empty")]
    EmptySeries,
}
