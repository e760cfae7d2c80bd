//! Lectern: passage retrieval for retrieval-augmented generation
//!
//! Given a natural-language query, returns a small, diverse, relevance-ranked
//! set of passages from an embedded corpus:
//! - Dense candidate search through a pluggable vector source (in-memory or Chroma)
//! - MMR diversity selection over the oversampled candidate pool
//! - Optional BM25 re-ranking of the same pool, fused with Reciprocal Rank Fusion
//! - TTL query cache in front of the pipeline
//! - Pluggable embedding backends (OpenAI-compatible HTTP, deterministic hash)

pub mod config;
pub mod embedding;
pub mod retrieval;
pub mod store;
pub mod types;
pub mod util;

pub use config::Config;
pub use retrieval::{QueryCache, RetrievalError, Retriever};
pub use types::*;
