//! Deterministic hash-based embeddings
//!
//! Vectors are stable for the same text but carry no semantic meaning. Useful
//! for smoke-testing a deployment without an embedding server.

use super::traits::{EmbeddingBackend, EmbeddingResult};
use crate::types::Embedding;

#[derive(Debug, Clone)]
pub struct HashBackend {
    dimensions: usize,
}

impl HashBackend {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl EmbeddingBackend for HashBackend {
    fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
        Ok(texts
            .iter()
            .map(|t| hash_based_embedding(t, self.dimensions))
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Values are in the range [-1, 1]. Each dimension mixes its index into the
/// hash seed so components are not a simple arithmetic progression.
pub fn hash_based_embedding(content: &str, dims: usize) -> Embedding {
    (0..dims)
        .map(|i| {
            let hash = xxhash_rust::xxh3::xxh3_64_with_seed(content.as_bytes(), i as u64);
            ((hash % 1000) as f32 / 500.0) - 1.0
        })
        .collect()
}
