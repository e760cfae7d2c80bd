//! Core types for the retrieval pipeline

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a stored passage
pub type PassageId = String;

/// Embedding vector type
pub type Embedding = Vec<f32>;

/// Per-passage metadata (string/number/bool values, Chroma style)
pub type Metadata = serde_json::Map<String, Value>;

/// A retrieval request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    /// Number of passages wanted
    pub k: usize,
    /// Structured metadata predicate, passed through to the vector source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl Query {
    pub fn new(text: impl Into<String>, k: usize) -> Self {
        Self {
            text: text.into(),
            k,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The filter that actually constrains the search.
    ///
    /// `null` and `{}` carry no constraint and are treated as absent.
    pub fn effective_filter(&self) -> Option<&Value> {
        match &self.filter {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(filter) => Some(filter),
        }
    }
}

/// One passage returned by the vector source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: PassageId,
    pub text: String,
    pub metadata: Metadata,
    pub distance: f32,
}

impl Candidate {
    /// Relevance is the inverted distance; only the ordering is meaningful
    pub fn relevance(&self) -> f64 {
        -f64::from(self.distance)
    }
}

/// Final ranked passages as four positionally aligned sequences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub documents: Vec<String>,
    pub metadatas: Vec<Metadata>,
    pub ids: Vec<PassageId>,
    pub distances: Vec<f32>,
}

impl RankedResult {
    /// Result with no passages
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a result from candidates picked by index, in the given order
    pub fn from_selection(candidates: &[Candidate], selection: &[usize]) -> Self {
        let mut result = Self {
            documents: Vec::with_capacity(selection.len()),
            metadatas: Vec::with_capacity(selection.len()),
            ids: Vec::with_capacity(selection.len()),
            distances: Vec::with_capacity(selection.len()),
        };
        for &idx in selection {
            let candidate = &candidates[idx];
            result.documents.push(candidate.text.clone());
            result.metadatas.push(candidate.metadata.clone());
            result.ids.push(candidate.id.clone());
            result.distances.push(candidate.distance);
        }
        result
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether all four sequences have the same length
    pub fn is_aligned(&self) -> bool {
        let n = self.ids.len();
        self.documents.len() == n && self.metadatas.len() == n && self.distances.len() == n
    }

    /// Iterate over aligned rows
    pub fn passages(&self) -> impl Iterator<Item = PassageRef<'_>> {
        self.ids
            .iter()
            .zip(&self.documents)
            .zip(&self.metadatas)
            .zip(&self.distances)
            .map(|(((id, text), metadata), &distance)| PassageRef {
                id,
                text,
                metadata,
                distance,
            })
    }
}

/// Borrowed view of one row of a [`RankedResult`]
#[derive(Debug, Clone, Copy)]
pub struct PassageRef<'a> {
    pub id: &'a str,
    pub text: &'a str,
    pub metadata: &'a Metadata,
    pub distance: f32,
}

impl<'a> PassageRef<'a> {
    /// Convenience accessor for a string metadata field
    pub fn meta_str(&self, key: &str) -> Option<&'a str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(id: &str, distance: f32) -> Candidate {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), json!(format!("title-{id}")));
        Candidate {
            id: id.to_string(),
            text: format!("text of {id}"),
            metadata,
            distance,
        }
    }

    #[test]
    fn test_relevance_inverts_distance() {
        assert!(candidate("a", 0.1).relevance() > candidate("b", 0.2).relevance());
        assert_eq!(candidate("c", 0.0).relevance(), 0.0);
    }

    #[test]
    fn test_from_selection_keeps_order_and_alignment() {
        let candidates = vec![candidate("a", 0.1), candidate("b", 0.2), candidate("c", 0.3)];
        let result = RankedResult::from_selection(&candidates, &[2, 0]);

        assert!(result.is_aligned());
        assert_eq!(result.ids, vec!["c", "a"]);
        assert_eq!(result.documents, vec!["text of c", "text of a"]);
        assert_eq!(result.distances, vec![0.3, 0.1]);

        let titles: Vec<_> = result.passages().map(|p| p.meta_str("title").unwrap()).collect();
        assert_eq!(titles, vec!["title-c", "title-a"]);
    }

    #[test]
    fn test_meta_str_outlives_passage_view() {
        let candidates = vec![candidate("a", 0.1)];
        let result = RankedResult::from_selection(&candidates, &[0]);
        let title = {
            let passage = result.passages().next().unwrap();
            passage.meta_str("title")
        };
        assert_eq!(title, Some("title-a"));
        assert_eq!(result.passages().next().unwrap().meta_str("missing"), None);
    }

    #[test]
    fn test_empty_result_is_aligned() {
        let result = RankedResult::empty();
        assert!(result.is_empty());
        assert!(result.is_aligned());
    }

    #[test]
    fn test_effective_filter_ignores_empty_predicates() {
        assert!(Query::new("q", 3).effective_filter().is_none());
        assert!(Query::new("q", 3).with_filter(json!({})).effective_filter().is_none());
        assert!(Query::new("q", 3).with_filter(Value::Null).effective_filter().is_none());

        let query = Query::new("q", 3).with_filter(json!({"lang": "en"}));
        assert_eq!(query.effective_filter(), Some(&json!({"lang": "en"})));
    }
}
