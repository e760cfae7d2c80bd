//! Retrieval errors

use crate::embedding::EmbeddingError;
use crate::store::SourceError;

/// Failure of a single retrieval. Failures are never cached.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// The embedding provider failed
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The vector source failed
    #[error("Vector source failed: {0}")]
    Source(SourceError),

    /// The vector source rejected the metadata filter
    #[error("Malformed filter: {0}")]
    MalformedFilter(String),

    /// The request itself is unusable
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl From<SourceError> for RetrievalError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::MalformedFilter(msg) => Self::MalformedFilter(msg),
            other => Self::Source(other),
        }
    }
}

impl RetrievalError {
    /// An external dependency failed; a caller may fall back or retry later
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Embedding(_) | Self::Source(_))
    }

    /// The caller's request was rejected
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MalformedFilter(_) | Self::InvalidQuery(_))
    }
}
