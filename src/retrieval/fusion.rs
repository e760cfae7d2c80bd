//! Result fusion strategies
//!
//! Implements Reciprocal Rank Fusion (RRF) for combining the semantic order
//! with a lexical ranking of the same candidate pool

use crate::types::Candidate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Reciprocal Rank Fusion (RRF) parameters
#[derive(Debug, Clone)]
pub struct RrfConfig {
    /// K parameter for RRF (default: 60)
    pub k: usize,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self { k: 60 }
    }
}

/// Candidate after combining both rankings
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    /// Position in the candidate pool
    pub index: usize,
    pub rrf_score: f64,
    /// 1-based rank in the semantic order, if selected there
    pub semantic_rank: Option<usize>,
    /// 1-based lexical rank, if ranked there
    pub lexical_rank: Option<usize>,
}

/// MMR-selected indices re-sorted by relevance, best first.
///
/// The sort is stable, so equal relevance keeps MMR order.
pub fn semantic_order(candidates: &[Candidate], selected: &[usize]) -> Vec<usize> {
    let mut order = selected.to_vec();
    order.sort_by(|&a, &b| {
        candidates[b]
            .relevance()
            .partial_cmp(&candidates[a].relevance())
            .unwrap_or(Ordering::Equal)
    });
    order
}

/// Compute Reciprocal Rank Fusion scores
///
/// RRF score = Σ 1/(k + rank_r(d)) over the rankings that contain d
///
/// Works on ranks rather than scores, so BM25 scores and vector distances
/// need no calibration against each other. Sorted by score descending, equal
/// scores by candidate index ascending.
pub fn reciprocal_rank_fusion(
    semantic: &[usize],
    lexical: &HashMap<usize, usize>,
    config: &RrfConfig,
) -> Vec<FusedResult> {
    let contribution = |rank: usize| 1.0 / (config.k as f64 + rank as f64);

    // BTreeMap keeps index order before the score sort
    let mut fused: BTreeMap<usize, FusedResult> = BTreeMap::new();
    let entry = |index: usize| FusedResult {
        index,
        rrf_score: 0.0,
        semantic_rank: None,
        lexical_rank: None,
    };

    for (pos, &index) in semantic.iter().enumerate() {
        let rank = pos + 1;
        let result = fused.entry(index).or_insert_with(|| entry(index));
        result.rrf_score += contribution(rank);
        result.semantic_rank = Some(rank);
    }

    for (&index, &rank) in lexical {
        let result = fused.entry(index).or_insert_with(|| entry(index));
        result.rrf_score += contribution(rank);
        result.lexical_rank = Some(rank);
    }

    let mut results: Vec<FusedResult> = fused.into_values().collect();
    results.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    results
}
