//! Maximal Marginal Relevance selection
//!
//! Greedy re-ordering that trades relevance against token overlap with what
//! has already been picked, so near-duplicate passages do not crowd the top.

use crate::types::Candidate;
use std::collections::HashSet;

/// Guards the overlap ratio against empty token sets
const OVERLAP_EPSILON: f64 = 1e-9;

/// Lowercased whitespace tokens as a set
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Select up to `k` candidate indices in MMR order.
///
/// `score(i) = lambda * relevance(i) - (1 - lambda) * diversity(i)`, where
/// `diversity(i)` is the largest `|T_i ∩ T_j| / |T_i|` over the already
/// selected `j`. The ratio is normalised by the candidate's own token count
/// only. Ties go to the earliest remaining index.
pub fn mmr_select(candidates: &[Candidate], k: usize, lambda: f64) -> Vec<usize> {
    let tokens: Vec<HashSet<String>> = candidates.iter().map(|c| tokenize(&c.text)).collect();
    let relevance: Vec<f64> = candidates.iter().map(Candidate::relevance).collect();

    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    while selected.len() < k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_score = f64::NEG_INFINITY;

        for (pos, &i) in remaining.iter().enumerate() {
            let diversity = selected
                .iter()
                .map(|&j| overlap(&tokens[i], &tokens[j]))
                .fold(0.0, f64::max);
            let score = lambda * relevance[i] - (1.0 - lambda) * diversity;
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }

        selected.push(remaining.remove(best_pos));
    }

    selected
}

fn overlap(own: &HashSet<String>, other: &HashSet<String>) -> f64 {
    let shared = own.intersection(other).count() as f64;
    shared / (own.len() as f64 + OVERLAP_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;

    fn candidate(text: &str, distance: f32) -> Candidate {
        Candidate {
            id: text.to_string(),
            text: text.to_string(),
            metadata: Metadata::new(),
            distance,
        }
    }

    #[test]
    fn test_tokenize_lowercases_and_dedups() {
        let tokens = tokenize("The the  THE cat\tsat");
        assert_eq!(tokens.len(), 3);
        assert!(tokens.contains("the"));
        assert!(tokens.contains("cat"));
    }

    #[test]
    fn test_first_pick_is_most_relevant() {
        let candidates = vec![
            candidate("alpha beta", 0.5),
            candidate("gamma delta", 0.1),
            candidate("epsilon", 0.3),
        ];
        assert_eq!(mmr_select(&candidates, 1, 0.3)[0], 1);
    }

    #[test]
    fn test_near_duplicate_is_pushed_down() {
        let candidates = vec![
            candidate("two friends travel across the sea together", 0.10),
            candidate("two friends travel across the sea together again", 0.11),
            candidate("a dragon guards a mountain of gold", 0.20),
        ];
        assert_eq!(mmr_select(&candidates, 3, 0.3), vec![0, 2, 1]);
    }

    #[test]
    fn test_ties_go_to_earliest_index() {
        let candidates = vec![
            candidate("one", 0.2),
            candidate("two", 0.2),
            candidate("three", 0.2),
        ];
        assert_eq!(mmr_select(&candidates, 3, 0.3), vec![0, 1, 2]);
    }

    #[test]
    fn test_bounded_and_without_duplicates() {
        let candidates: Vec<_> = (0..6)
            .map(|i| candidate(&format!("shared words {i}"), i as f32 * 0.1))
            .collect();

        let selected = mmr_select(&candidates, 4, 0.3);
        assert_eq!(selected.len(), 4);
        let unique: HashSet<_> = selected.iter().collect();
        assert_eq!(unique.len(), 4);

        assert_eq!(mmr_select(&candidates, 10, 0.3).len(), 6);
        assert!(mmr_select(&candidates, 0, 0.3).is_empty());
        assert!(mmr_select(&[], 5, 0.3).is_empty());
    }

    #[test]
    fn test_empty_texts_have_no_overlap() {
        let candidates = vec![candidate("", 0.1), candidate("", 0.2)];
        assert_eq!(mmr_select(&candidates, 2, 0.3), vec![0, 1]);
    }

    #[test]
    fn test_overlap_is_normalised_by_own_tokens() {
        let short = tokenize("red fox");
        let long = tokenize("red fox jumps over the lazy dog");
        assert!((overlap(&short, &long) - 1.0).abs() < 1e-6);
        assert!((overlap(&long, &short) - 2.0 / 7.0).abs() < 1e-6);
    }
}
