//! Retrieval orchestrator
//!
//! One pass per query, no retries:
//! cache lookup → embed → fetch candidates → MMR → RRF (or MMR order) →
//! truncate to `k` → cache store.

use super::bm25::LexicalRanking;
use super::cache::{cache_key, QueryCache};
use super::error::RetrievalError;
use super::fusion::{reciprocal_rank_fusion, semantic_order, RrfConfig};
use super::metrics::RetrievalMetrics;
use super::mmr::mmr_select;
use crate::config::{Config, RetrievalConfig};
use crate::embedding::{create_backend_from_config, EmbeddingBackend};
use crate::store::{open_store, VectorSource};
use crate::types::{Candidate, Query, RankedResult};
use crate::util::truncate_str;
use anyhow::Context;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Passage retriever combining vector search, MMR diversity and optional
/// BM25 rank fusion, fronted by a TTL cache.
#[derive(Debug)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingBackend>,
    source: Arc<dyn VectorSource>,
    lexical: LexicalRanking,
    cache: Arc<QueryCache>,
    config: RetrievalConfig,
    metrics: RetrievalMetrics,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingBackend>,
        source: Arc<dyn VectorSource>,
        lexical: LexicalRanking,
        cache: Arc<QueryCache>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            source,
            lexical,
            cache,
            config,
            metrics: RetrievalMetrics::new(),
        }
    }

    /// Build the embedding backend, vector source, lexical ranker and cache
    /// named by a loaded config
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let embedder = create_backend_from_config(&config.embedding)
            .context("Failed to create embedding backend")?;
        let source = open_store(&config.store).context("Failed to open vector store")?;
        let lexical = LexicalRanking::from_config(&config.retrieval);
        let cache = Arc::new(QueryCache::new(config.retrieval.cache_ttl()));

        info!(
            "Retriever ready: embedder={}, store={}, lexical={}",
            embedder.name(),
            source.name(),
            lexical.is_present()
        );

        Ok(Self::new(
            embedder,
            source,
            lexical,
            cache,
            config.retrieval.clone(),
        ))
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn source(&self) -> &Arc<dyn VectorSource> {
        &self.source
    }

    pub fn metrics(&self) -> &RetrievalMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Convenience wrapper over [`Retriever::retrieve`]
    pub fn similar(
        &self,
        text: &str,
        k: usize,
        filter: Option<Value>,
    ) -> Result<Arc<RankedResult>, RetrievalError> {
        let mut query = Query::new(text, k);
        query.filter = filter;
        self.retrieve(&query)
    }

    /// Retrieve up to `query.k` passages.
    ///
    /// Successful results (empty ones included) are cached for the cache's
    /// TTL; repeated calls within that window make no downstream requests.
    /// Errors are returned as-is and never cached.
    pub fn retrieve(&self, query: &Query) -> Result<Arc<RankedResult>, RetrievalError> {
        if query.k == 0 {
            self.metrics.rejected_queries.inc();
            return Err(RetrievalError::InvalidQuery(
                "k must be at least 1".to_string(),
            ));
        }

        self.metrics.queries_total.inc();
        let key = cache_key(query);

        if let Some(hit) = self.cache.get(&key) {
            self.metrics.cache_hits.inc();
            debug!("Cache hit for '{}'", truncate_str(&query.text, 50));
            return Ok(hit);
        }
        self.metrics.cache_misses.inc();

        let start = Instant::now();
        let outcome = self.execute(query);
        self.metrics.observe_execution(start.elapsed());

        match outcome {
            Ok(result) => {
                if result.is_empty() {
                    self.metrics.empty_results.inc();
                }
                let result = Arc::new(result);
                self.cache.put(key, Arc::clone(&result));
                info!(
                    "Retrieved {} passages for '{}' in {:?}",
                    result.len(),
                    truncate_str(&query.text, 50),
                    start.elapsed()
                );
                Ok(result)
            }
            Err(err) => {
                if err.is_upstream() {
                    self.metrics.upstream_failures.inc();
                } else {
                    self.metrics.rejected_queries.inc();
                }
                warn!(
                    "Retrieval failed for '{}': {}",
                    truncate_str(&query.text, 50),
                    err
                );
                Err(err)
            }
        }
    }

    fn execute(&self, query: &Query) -> Result<RankedResult, RetrievalError> {
        let embedding = match self
            .embedder
            .embed_batch(&[query.text.clone()])?
            .into_iter()
            .next()
        {
            Some(embedding) if !embedding.is_empty() => embedding,
            _ => {
                warn!("Embedding provider returned no vector for the query");
                return Ok(RankedResult::empty());
            }
        };

        let base_k = self.config.candidate_count(query.k);
        let candidates = self
            .source
            .query(&embedding, base_k, query.effective_filter())?
            .into_candidates()?;
        debug!(
            "Vector source returned {} of {} requested candidates",
            candidates.len(),
            base_k
        );

        if candidates.is_empty() {
            return Ok(RankedResult::empty());
        }

        let k_select = base_k.min(candidates.len());
        let selected = mmr_select(&candidates, k_select, self.config.mmr_lambda);
        debug!("MMR selected {} candidates", selected.len());

        let order = self.rank(&query.text, &candidates, selected, query.k);
        Ok(RankedResult::from_selection(&candidates, &order))
    }

    /// Final candidate order, at most `k` long
    fn rank(
        &self,
        text: &str,
        candidates: &[Candidate],
        selected: Vec<usize>,
        k: usize,
    ) -> Vec<usize> {
        match &self.lexical {
            LexicalRanking::Present(ranker) => {
                let corpus: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
                let lexical = ranker.rank(text, &corpus);
                let semantic = semantic_order(candidates, &selected);
                let rrf = RrfConfig {
                    k: self.config.rrf_k,
                };
                let fused = reciprocal_rank_fusion(&semantic, &lexical, &rrf);
                debug!(
                    "Fused {} semantic and {} lexical ranks with {}",
                    semantic.len(),
                    lexical.len(),
                    ranker.name()
                );
                fused.into_iter().take(k).map(|f| f.index).collect()
            }
            LexicalRanking::Absent => selected.into_iter().take(k).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceMetric;
    use crate::embedding::backend::HashBackend;
    use crate::store::{MemoryStore, StoredRecord};

    fn retriever(lexical: bool) -> Retriever {
        let store = MemoryStore::new(DistanceMetric::L2);
        let texts = [
            "a story about friendship between two boys",
            "the war of the worlds",
            "a cookbook for rainy days",
        ];
        let embedder = HashBackend::new(8);
        for (i, text) in texts.iter().enumerate() {
            store
                .upsert(StoredRecord {
                    id: format!("p{i}"),
                    document: text.to_string(),
                    metadata: Default::default(),
                    embedding: embedder.embed(text).unwrap(),
                })
                .unwrap();
        }

        let config = RetrievalConfig {
            enable_lexical: lexical,
            ..Default::default()
        };
        Retriever::new(
            Arc::new(embedder),
            Arc::new(store),
            LexicalRanking::from_config(&config),
            Arc::new(QueryCache::default()),
            config,
        )
    }

    #[test]
    fn test_zero_k_is_rejected() {
        let retriever = retriever(true);
        let err = retriever.retrieve(&Query::new("anything", 0)).unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidQuery(_)));
        assert!(retriever.cache().is_empty());
    }

    #[test]
    fn test_exact_text_ranks_first_without_lexical() {
        let retriever = retriever(false);
        let result = retriever.similar("the war of the worlds", 2, None).unwrap();
        assert_eq!(result.ids[0], "p1");
        assert_eq!(result.len(), 2);
        assert!(result.is_aligned());
    }

    #[test]
    fn test_second_call_is_cached() {
        let retriever = retriever(true);
        let first = retriever.similar("friendship", 2, None).unwrap();
        let second = retriever.similar("  FRIENDSHIP ", 2, None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let snapshot = retriever.metrics().snapshot();
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 1);
    }

    #[test]
    fn test_malformed_filter_not_cached() {
        let retriever = retriever(true);
        let err = retriever
            .similar("friendship", 2, Some(serde_json::json!({"$nope": 1})))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(retriever.cache().is_empty());
        assert_eq!(retriever.metrics().snapshot().rejected_queries, 1);
    }
}
