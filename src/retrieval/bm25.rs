//! BM25 lexical ranking over the candidate pool
//!
//! Okapi BM25 computed in-process over the passages the vector source
//! returned, so the lexical signal re-ranks the same pool rather than
//! searching a separate index.

use crate::config::{Bm25Config, RetrievalConfig};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

/// Ranks a small corpus against a query
pub trait LexicalRanker: Send + Sync + Debug {
    /// Map every corpus index to its 1-based rank (best first)
    fn rank(&self, query: &str, corpus: &[&str]) -> HashMap<usize, usize>;

    /// Ranker name (e.g., "bm25")
    fn name(&self) -> &str;
}

/// Whether a lexical ranker takes part in retrieval
#[derive(Debug, Clone)]
pub enum LexicalRanking {
    Present(Arc<dyn LexicalRanker>),
    Absent,
}

impl LexicalRanking {
    /// BM25 when `enable_lexical` is set, otherwise absent
    pub fn from_config(config: &RetrievalConfig) -> Self {
        if config.enable_lexical {
            Self::Present(Arc::new(Bm25Ranker::new(config.bm25)))
        } else {
            Self::Absent
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

/// BM25 Okapi ranker
#[derive(Debug, Clone, Default)]
pub struct Bm25Ranker {
    params: Bm25Config,
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

impl Bm25Ranker {
    pub fn new(params: Bm25Config) -> Self {
        Self { params }
    }

    /// BM25 score of every corpus entry against the query
    pub fn scores(&self, query: &str, corpus: &[&str]) -> Vec<f64> {
        let Bm25Config { k1, b, epsilon } = self.params;
        let docs: Vec<Vec<String>> = corpus.iter().map(|text| tokenize(text)).collect();
        if docs.is_empty() {
            return Vec::new();
        }

        let total_len: usize = docs.iter().map(Vec::len).sum();
        if total_len == 0 {
            return vec![0.0; docs.len()];
        }
        let n = docs.len() as f64;
        let avgdl = total_len as f64 / n;

        let term_freqs: Vec<HashMap<&str, usize>> = docs
            .iter()
            .map(|tokens| {
                let mut tf = HashMap::new();
                for token in tokens {
                    *tf.entry(token.as_str()).or_insert(0) += 1;
                }
                tf
            })
            .collect();

        // Sorted by term: the IDF sum below must not follow hash order
        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for tf in &term_freqs {
            for &term in tf.keys() {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        // Terms in more than half the documents get a negative raw IDF; those
        // are floored to a fraction of the average IDF.
        let mut idf: HashMap<&str, f64> = HashMap::with_capacity(doc_freq.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (&term, &df) in &doc_freq {
            let df = df as f64;
            let value = (n - df + 0.5).ln() - (df + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term);
            }
            idf.insert(term, value);
        }
        let floor = epsilon * idf_sum / idf.len() as f64;
        for term in negative {
            idf.insert(term, floor);
        }

        let query_terms = tokenize(query);
        docs.iter()
            .zip(&term_freqs)
            .map(|(tokens, tf)| {
                let norm = k1 * (1.0 - b + b * tokens.len() as f64 / avgdl);
                query_terms
                    .iter()
                    .map(|term| {
                        let freq = tf.get(term.as_str()).copied().unwrap_or(0) as f64;
                        let weight = idf.get(term.as_str()).copied().unwrap_or(0.0);
                        weight * (freq * (k1 + 1.0)) / (freq + norm)
                    })
                    .sum::<f64>()
            })
            .collect()
    }
}

impl LexicalRanker for Bm25Ranker {
    fn rank(&self, query: &str, corpus: &[&str]) -> HashMap<usize, usize> {
        let scores = self.scores(query, corpus);

        let mut order: Vec<usize> = (0..scores.len()).collect();
        // Stable sort keeps index order among equal scores
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        debug!("BM25 ranked {} passages", order.len());

        order
            .into_iter()
            .enumerate()
            .map(|(pos, idx)| (idx, pos + 1))
            .collect()
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranker() -> Bm25Ranker {
        Bm25Ranker::default()
    }

    #[test]
    fn test_default_params() {
        assert_eq!(ranker().params, Bm25Config { k1: 1.5, b: 0.75, epsilon: 0.25 });
    }

    #[test]
    fn test_matching_document_ranks_first() {
        let corpus = [
            "a dragon guards the mountain",
            "a story about friendship and loyalty",
            "recipes for autumn soups",
        ];
        let ranks = ranker().rank("friendship story", &corpus);
        assert_eq!(ranks[&1], 1);
        assert_eq!(ranks.len(), 3);
    }

    #[test]
    fn test_ranks_cover_every_index_once() {
        let corpus = ["x y", "y z", "z x", ""];
        let ranks = ranker().rank("x", &corpus);
        let mut values: Vec<_> = ranks.values().copied().collect();
        values.sort_unstable();
        assert_eq!(values, vec![1, 2, 3, 4]);
        assert_eq!(ranks.keys().copied().max(), Some(3));
    }

    #[test]
    fn test_ties_follow_index_order() {
        let corpus = ["alpha", "beta", "gamma"];
        let ranks = ranker().rank("unrelated", &corpus);
        assert_eq!(ranks[&0], 1);
        assert_eq!(ranks[&1], 2);
        assert_eq!(ranks[&2], 3);
    }

    #[test]
    fn test_floored_scores_are_bit_identical_across_runs() {
        // "the" appears in every document, so its raw IDF is negative and floored
        let corpus = [
            "the quiet friendship of the two foxes",
            "the war and the peace",
            "the garden in winter",
            "the friendship of rivers and stones",
            "the sea",
        ];
        let first = ranker().scores("the friendship", &corpus);
        for _ in 0..50 {
            let again = ranker().scores("the friendship", &corpus);
            let same = first
                .iter()
                .zip(&again)
                .all(|(a, b)| a.to_bits() == b.to_bits());
            assert!(same, "{:?} != {:?}", first, again);
        }
        assert!(first[0] > first[1]);
    }

    #[test]
    fn test_empty_pool_scores_zero() {
        let scores = ranker().scores("anything", &["", "   "]);
        assert_eq!(scores, vec![0.0, 0.0]);
        assert!(ranker().rank("anything", &[]).is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let scores = ranker().scores("DRAGON", &["the Dragon sleeps", "the cat sleeps", "a bird sings"]);
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn test_common_term_uses_floored_idf() {
        // "the" appears in 3 of 4 documents: raw IDF is negative and replaced
        // by epsilon * average IDF, which is positive here
        let corpus = ["the cat", "the dog", "the bird", "fish"];
        let scores = ranker().scores("the", &corpus);
        assert!(scores[0] > 0.0);
        assert_eq!(scores[3], 0.0);
    }

    #[test]
    fn test_known_score() {
        // df = 1 out of N = 3
        let corpus = ["apple", "pear", "plum"];
        let scores = ranker().scores("apple", &corpus);
        let idf = (3.0_f64 - 1.0 + 0.5).ln() - (1.0_f64 + 0.5).ln();
        // dl == avgdl, so the length norm is k1 and tf = 1
        let expected = idf * 2.5 / (1.0 + 1.5);
        assert!((scores[0] - expected).abs() < 1e-12);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn test_lexical_ranking_from_config() {
        let mut config = RetrievalConfig::default();
        assert!(LexicalRanking::from_config(&config).is_present());
        config.enable_lexical = false;
        assert!(!LexicalRanking::from_config(&config).is_present());
    }
}
