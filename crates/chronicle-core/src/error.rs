//! Error taxonomy for the build and retrieval pipelines.
//!
//! Three failure classes are distinguished so the call site can decide
//! what to do with each:
//!
//! | Class | Variants | Handling |
//! |-------|----------|----------|
//! | Precondition | [`Error::Precondition`], [`Error::DimensionMismatch`] | Fatal to the build/load; nothing partial is written |
//! | Upstream | [`Error::Upstream`] | Propagated as-is; the caller owns retry policy |
//! | Corrupt artifact | [`Error::CorruptArtifact`] | Fatal to the load; the cache stays empty |
//!
//! Data-integrity problems — a malformed mapping line, a search hit with
//! no mapping entry — are *not* errors. They are logged at WARN and
//! skipped, degrading the result rather than failing the operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A build precondition was violated: empty corpus, zero chunks,
    /// zero embeddings.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A vector's dimensionality disagrees with the index, or a loaded
    /// index disagrees with the embedding model.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A persisted artifact could not be decoded.
    #[error("corrupt artifact: {0}")]
    CorruptArtifact(String),

    /// An upstream collaborator (embedding service, blob storage)
    /// failed. Never retried at this layer.
    #[error("upstream service error: {0}")]
    Upstream(#[source] anyhow::Error),
}

impl Error {
    /// Wrap a collaborator failure.
    pub fn upstream(err: impl Into<anyhow::Error>) -> Self {
        Error::Upstream(err.into())
    }

    /// True for the failure class that must abort a build or load
    /// outright (as opposed to upstream failures a caller may retry).
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::Precondition(_) | Error::DimensionMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
