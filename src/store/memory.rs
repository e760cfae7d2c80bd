//! In-process vector source
//!
//! Brute-force nearest neighbour search over a list of embedded passages.
//! Suitable for test fixtures and corpora of a few tens of thousands of
//! passages. Snapshots are JSONL, one record per line:
//!
//! ```json
//! {"id": "b1-0", "document": "...", "metadata": {"title": "..."}, "embedding": [0.1, ...]}
//! ```

use super::filter::MetadataFilter;
use super::{SourceError, SourceResponse, SourceResult, StoredPassage, VectorSource};
use crate::config::DistanceMetric;
use crate::types::{Embedding, Metadata, PassageId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// One embedded passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: PassageId,
    #[serde(default)]
    pub document: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub embedding: Embedding,
}

#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<Vec<StoredRecord>>,
    metric: DistanceMetric,
}

impl MemoryStore {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            metric,
        }
    }

    /// Load a JSONL snapshot. Blank lines are skipped.
    pub fn load_jsonl(path: &Path, metric: DistanceMetric) -> SourceResult<Self> {
        let file = std::fs::File::open(path)?;
        let store = Self::new(metric);

        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: StoredRecord = serde_json::from_str(&line).map_err(|e| {
                SourceError::Protocol(format!("{}:{}: {}", path.display(), line_no + 1, e))
            })?;
            store.upsert(record)?;
        }

        info!(
            "Loaded {} passages from {}",
            store.records.read().len(),
            path.display()
        );
        Ok(store)
    }

    /// Insert a record, replacing any record with the same id in place
    pub fn upsert(&self, record: StoredRecord) -> SourceResult<()> {
        let mut records = self.records.write();
        if let Some(first) = records.first() {
            if first.embedding.len() != record.embedding.len() {
                return Err(SourceError::DimensionMismatch {
                    expected: first.embedding.len(),
                    actual: record.embedding.len(),
                });
            }
        }

        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    /// Dimensionality of stored embeddings, if any are stored
    pub fn dimensions(&self) -> Option<usize> {
        self.records.read().first().map(|r| r.embedding.len())
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            DistanceMetric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            DistanceMetric::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (norm_a * norm_b)
                }
            }
        }
    }
}

impl VectorSource for MemoryStore {
    fn query(
        &self,
        embedding: &Embedding,
        n: usize,
        filter: Option<&Value>,
    ) -> SourceResult<SourceResponse> {
        let filter = filter
            .map(MetadataFilter::parse)
            .transpose()
            .map_err(|e| SourceError::MalformedFilter(e.to_string()))?;

        let records = self.records.read();
        if let Some(first) = records.first() {
            if first.embedding.len() != embedding.len() {
                return Err(SourceError::DimensionMismatch {
                    expected: first.embedding.len(),
                    actual: embedding.len(),
                });
            }
        }

        let mut scored: Vec<(usize, f32)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.as_ref().map_or(true, |f| f.matches(&r.metadata)))
            .map(|(i, r)| (i, self.distance(embedding, &r.embedding)))
            .collect();
        // Stable sort: equal distances keep insertion order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(n);

        debug!(
            "Memory store query: {} of {} passages returned",
            scored.len(),
            records.len()
        );

        let mut response = SourceResponse::default();
        for (i, distance) in scored {
            let record = &records[i];
            response.ids.push(record.id.clone());
            response.documents.push(Some(record.document.clone()));
            response.metadatas.push(Some(record.metadata.clone()));
            response.distances.push(Some(distance));
        }
        Ok(response)
    }

    fn count(&self) -> SourceResult<usize> {
        Ok(self.records.read().len())
    }

    fn peek(&self, limit: usize, offset: usize) -> SourceResult<Vec<StoredPassage>> {
        Ok(self
            .records
            .read()
            .iter()
            .skip(offset)
            .take(limit)
            .map(|r| StoredPassage {
                id: r.id.clone(),
                document: r.document.clone(),
                metadata: r.metadata.clone(),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
