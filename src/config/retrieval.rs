//! Retrieval pipeline configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// BM25 Okapi parameters for the lexical ranker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Config {
    /// Term frequency saturation
    #[serde(default = "default_k1")]
    pub k1: f64,
    /// Document length normalization
    #[serde(default = "default_b")]
    pub b: f64,
    /// Floor for negative IDF terms, as a fraction of the average IDF
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

fn default_k1() -> f64 {
    1.5
}

fn default_b() -> f64 {
    0.75
}

fn default_epsilon() -> f64 {
    0.25
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
            epsilon: default_epsilon(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Fuse a BM25 ranking over the candidate pool with the semantic order
    #[serde(default = "default_enable_lexical")]
    pub enable_lexical: bool,
    /// MMR relevance weight (1.0 = pure relevance)
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f64,
    /// RRF smoothing constant
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,
    /// Candidates requested per wanted result
    #[serde(default = "default_oversample_factor")]
    pub oversample_factor: usize,
    /// Lower bound on candidates requested from the store
    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,
    /// Lifetime of cached results
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Result count used when a caller does not name one
    #[serde(default = "default_k")]
    pub default_k: usize,
    #[serde(default)]
    pub bm25: Bm25Config,
}

fn default_enable_lexical() -> bool {
    true
}

fn default_mmr_lambda() -> f64 {
    0.3
}

fn default_rrf_k() -> usize {
    60
}

fn default_oversample_factor() -> usize {
    2
}

fn default_min_candidates() -> usize {
    8
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_k() -> usize {
    6
}

impl RetrievalConfig {
    /// Number of candidates to request for `k` wanted results
    pub fn candidate_count(&self, k: usize) -> usize {
        k.saturating_mul(self.oversample_factor)
            .max(self.min_candidates)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enable_lexical: default_enable_lexical(),
            mmr_lambda: default_mmr_lambda(),
            rrf_k: default_rrf_k(),
            oversample_factor: default_oversample_factor(),
            min_candidates: default_min_candidates(),
            cache_ttl_secs: default_cache_ttl_secs(),
            default_k: default_k(),
            bm25: Bm25Config::default(),
        }
    }
}
