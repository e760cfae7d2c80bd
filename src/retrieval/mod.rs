//! Passage retrieval
//!
//! Combines:
//! - Dense candidate search through a [`VectorSource`](crate::store::VectorSource)
//! - MMR diversity selection over the candidate pool
//! - BM25 lexical ranking of the same pool, fused with Reciprocal Rank Fusion (RRF)
//! - A TTL cache in front of the whole pipeline

mod bm25;
mod cache;
mod error;
mod fusion;
mod metrics;
mod mmr;
mod retriever;

pub use bm25::{Bm25Ranker, LexicalRanker, LexicalRanking};
pub use cache::{cache_key, QueryCache, DEFAULT_CACHE_TTL};
pub use error::RetrievalError;
pub use fusion::{reciprocal_rank_fusion, semantic_order, FusedResult, RrfConfig};
pub use metrics::{Counter, MetricsSnapshot, RetrievalMetrics};
pub use mmr::{mmr_select, tokenize};
pub use retriever::Retriever;
