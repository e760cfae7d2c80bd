//! Retrieval metrics
//!
//! Lock-free counters updated on every retrieval.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Atomic counter for thread-safe incrementing
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counters kept by a [`Retriever`](super::Retriever)
#[derive(Debug, Default)]
pub struct RetrievalMetrics {
    pub queries_total: Counter,
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    /// Executed retrievals that produced no passages
    pub empty_results: Counter,
    pub upstream_failures: Counter,
    pub rejected_queries: Counter,
    /// Wall time of executed (non-cached) retrievals
    execution_micros: Counter,
}

impl RetrievalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_execution(&self, elapsed: Duration) {
        self.execution_micros.add(elapsed.as_micros() as u64);
    }

    /// Take a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let misses = self.cache_misses.get();
        let mean_execution_ms = if misses == 0 {
            0.0
        } else {
            self.execution_micros.get() as f64 / misses as f64 / 1000.0
        };

        MetricsSnapshot {
            queries_total: self.queries_total.get(),
            cache_hits: self.cache_hits.get(),
            cache_misses: misses,
            empty_results: self.empty_results.get(),
            upstream_failures: self.upstream_failures.get(),
            rejected_queries: self.rejected_queries.get(),
            mean_execution_ms,
        }
    }
}

/// Point-in-time copy of [`RetrievalMetrics`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub queries_total: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub empty_results: u64,
    pub upstream_failures: u64,
    pub rejected_queries: u64,
    pub mean_execution_ms: f64,
}

impl MetricsSnapshot {
    /// Fraction of lookups answered from the cache
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}
