//! Vector candidate sources
//!
//! The retrieval core only needs `query`: given an embedding, return up to `n`
//! nearest passages with their distances. `count` and `peek` back the
//! inspection tooling.

mod chroma;
mod filter;
mod memory;

pub use chroma::{ChromaConfig, ChromaSource};
pub use filter::{Comparison, FilterError, MetadataFilter};
pub use memory::{MemoryStore, StoredRecord};

use crate::config::StoreConfig;
use crate::types::{Candidate, Embedding, Metadata, PassageId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// Errors raised by a vector source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The structured filter was rejected
    #[error("Malformed filter: {0}")]
    MalformedFilter(String),

    /// Query vector does not match the collection's dimensionality
    #[error("Embedding has {actual} dimensions, collection expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Named collection does not exist
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Server answered with an unexpected status
    #[error("Store returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response could not be interpreted
    #[error("Invalid store response: {0}")]
    Protocol(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Loading a local snapshot failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for vector source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Raw query answer: four parallel sequences, at most `n` long.
///
/// Distances, metadata and document text may be missing for some stores;
/// [`SourceResponse::into_candidates`] fills in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceResponse {
    #[serde(default)]
    pub documents: Vec<Option<String>>,
    #[serde(default)]
    pub metadatas: Vec<Option<Metadata>>,
    #[serde(default)]
    pub ids: Vec<PassageId>,
    #[serde(default)]
    pub distances: Vec<Option<f32>>,
}

impl SourceResponse {
    /// Align the parallel sequences into candidates.
    ///
    /// Missing distances count as `0.0`, missing metadata as an empty map and
    /// missing text as `""`. Ids are mandatory: one per document.
    pub fn into_candidates(self) -> SourceResult<Vec<Candidate>> {
        let n = self.documents.len();
        if self.ids.len() != n {
            return Err(SourceError::Protocol(format!(
                "{} ids for {} documents",
                self.ids.len(),
                n
            )));
        }
        if !self.distances.is_empty() && self.distances.len() != n {
            return Err(SourceError::Protocol(format!(
                "{} distances for {} documents",
                self.distances.len(),
                n
            )));
        }

        let mut metadatas = self.metadatas.into_iter();
        let mut distances = self.distances.into_iter();
        Ok(self
            .documents
            .into_iter()
            .zip(self.ids)
            .map(|(text, id)| Candidate {
                id,
                text: text.unwrap_or_default(),
                metadata: metadatas.next().flatten().unwrap_or_default(),
                distance: distances.next().flatten().unwrap_or(0.0),
            })
            .collect())
    }
}

/// One stored passage as returned by `peek`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPassage {
    pub id: PassageId,
    #[serde(default)]
    pub document: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A searchable collection of embedded passages
pub trait VectorSource: Send + Sync + Debug {
    /// Return up to `n` passages nearest to `embedding`, optionally restricted
    /// by a structured metadata predicate. Equal distances keep a stable order.
    fn query(
        &self,
        embedding: &Embedding,
        n: usize,
        filter: Option<&Value>,
    ) -> SourceResult<SourceResponse>;

    /// Number of stored passages
    fn count(&self) -> SourceResult<usize>;

    /// Page through stored passages in storage order
    fn peek(&self, limit: usize, offset: usize) -> SourceResult<Vec<StoredPassage>>;

    /// Source name (e.g., "memory", "chroma")
    fn name(&self) -> &str;
}

/// Open the vector source named by the `[store]` config section
pub fn open_store(config: &StoreConfig) -> SourceResult<Arc<dyn VectorSource>> {
    match config {
        StoreConfig::Memory { path, distance } => {
            let store = match path {
                Some(path) => MemoryStore::load_jsonl(path, *distance)?,
                None => MemoryStore::new(*distance),
            };
            Ok(Arc::new(store))
        }
        StoreConfig::Chroma {
            endpoint,
            collection,
            tenant,
            database,
            timeout_secs,
        } => {
            let source = ChromaSource::connect(ChromaConfig {
                endpoint: endpoint.clone(),
                collection: collection.clone(),
                tenant: tenant.clone(),
                database: database.clone(),
                timeout_secs: *timeout_secs,
            })?;
            Ok(Arc::new(source))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_candidates_fills_defaults() {
        let response = SourceResponse {
            documents: vec![Some("alpha".to_string()), None],
            metadatas: vec![Some(json!({"title": "A"}).as_object().unwrap().clone())],
            ids: vec!["a".to_string(), "b".to_string()],
            distances: vec![],
        };

        let candidates = response.into_candidates().unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].text, "alpha");
        assert_eq!(candidates[0].metadata["title"], "A");
        assert_eq!(candidates[0].distance, 0.0);
        assert_eq!(candidates[1].text, "");
        assert!(candidates[1].metadata.is_empty());
    }

    #[test]
    fn test_into_candidates_null_distance_is_zero() {
        let response = SourceResponse {
            documents: vec![Some("x".to_string()), Some("y".to_string())],
            metadatas: vec![None, None],
            ids: vec!["x".to_string(), "y".to_string()],
            distances: vec![Some(0.4), None],
        };
        let candidates = response.into_candidates().unwrap();
        assert_eq!(candidates[0].distance, 0.4);
        assert_eq!(candidates[1].distance, 0.0);
    }

    #[test]
    fn test_into_candidates_rejects_missing_ids() {
        let response = SourceResponse {
            documents: vec![Some("x".to_string())],
            ..Default::default()
        };
        assert!(matches!(
            response.into_candidates(),
            Err(SourceError::Protocol(_))
        ));
    }

    #[test]
    fn test_into_candidates_rejects_misaligned_distances() {
        let response = SourceResponse {
            documents: vec![Some("x".to_string()), Some("y".to_string())],
            metadatas: vec![],
            ids: vec!["x".to_string(), "y".to_string()],
            distances: vec![Some(0.1)],
        };
        assert!(matches!(
            response.into_candidates(),
            Err(SourceError::Protocol(_))
        ));
    }

    #[test]
    fn test_open_empty_memory_store() {
        let store = open_store(&StoreConfig::Memory {
            path: None,
            distance: Default::default(),
        })
        .unwrap();
        assert_eq!(store.name(), "memory");
        assert_eq!(store.count().unwrap(), 0);
    }
}
