//! Embedding provider trait and errors

use crate::types::Embedding;
use std::fmt::Debug;

/// Errors raised by an embedding provider
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Provider answered but could not produce vectors
    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    /// Rate limited by the API
    #[error("Rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited {
        /// Suggested retry delay in milliseconds, if provided by the API
        retry_after_ms: Option<u64>,
    },

    /// Provider returned a different number of vectors than inputs
    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// An embedding provider.
///
/// `embed_batch` returns one vector per input text, in input order. An empty
/// input yields an empty output. A provider may return an empty vector to
/// signal that it has no embedding for a text.
pub trait EmbeddingBackend: Send + Sync + Debug {
    /// Generate embeddings for a batch of texts
    fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>>;

    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }

    /// Embedding dimensions
    fn dimensions(&self) -> usize;

    /// Backend name (e.g., "http", "hash")
    fn name(&self) -> &str;
}
