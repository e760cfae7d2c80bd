//! Corpus and retrieval smoke test
//!
//! Counts the collection, lists unique titles and runs a few sample queries,
//! reporting any that came back without passages.

use anyhow::Result;
use lectern::{config::Config, retrieval::MetricsSnapshot, types::Metadata, Retriever};
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

/// Sample queries used when none are given
pub const DEFAULT_QUERIES: [&str; 3] = [
    "o carte despre prietenie",
    "dystopian novel about freedom",
    "fantasy pentru toate vârstele",
];

const PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct HealthcheckOptions {
    /// How many unique titles to list
    pub list_limit: usize,
    pub queries: Vec<String>,
    pub k: usize,
    pub filter: Option<Value>,
    /// Fail when any query returns nothing
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct TitleRow {
    title: String,
    lang: Option<String>,
    genre: Option<String>,
    chunk: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct QueryOutcome {
    query: String,
    titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct HealthReport {
    total: usize,
    titles: Vec<TitleRow>,
    queries: Vec<QueryOutcome>,
    metrics: MetricsSnapshot,
}

impl HealthReport {
    fn failed(&self) -> usize {
        self.queries.iter().filter(|q| q.titles.is_empty()).count()
    }
}

fn field(metadata: &Metadata, key: &str) -> Option<String> {
    metadata.get(key).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// First `limit` unique titles in storage order
fn unique_titles(retriever: &Retriever, limit: usize) -> Result<Vec<TitleRow>> {
    let source = retriever.source();
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    let mut offset = 0;

    while rows.len() < limit {
        let page = source.peek(PAGE_SIZE, offset)?;
        if page.is_empty() {
            break;
        }
        offset += page.len();

        for passage in page {
            let title = field(&passage.metadata, "title").unwrap_or_else(|| "(untitled)".to_string());
            if !seen.insert(title.clone()) {
                continue;
            }
            rows.push(TitleRow {
                title,
                lang: field(&passage.metadata, "lang"),
                genre: field(&passage.metadata, "genre"),
                chunk: field(&passage.metadata, "chunk"),
            });
            if rows.len() >= limit {
                break;
            }
        }
    }
    Ok(rows)
}

fn build_report(retriever: &Retriever, options: &HealthcheckOptions) -> Result<HealthReport> {
    let total = retriever.source().count()?;
    if total == 0 {
        warn!("Collection is empty; check ingestion and the store location");
    }

    let titles = unique_titles(retriever, options.list_limit)?;

    let mut queries = Vec::with_capacity(options.queries.len());
    for query in &options.queries {
        let result = retriever.similar(query, options.k, options.filter.clone())?;
        let titles = result
            .passages()
            .map(|p| p.meta_str("title").unwrap_or("(untitled)").to_string())
            .collect();
        queries.push(QueryOutcome {
            query: query.clone(),
            titles,
        });
    }

    Ok(HealthReport {
        total,
        titles,
        queries,
        metrics: retriever.metrics().snapshot(),
    })
}

fn heading(title: &str) {
    println!("\n{}", title);
    println!("{}", "-".repeat(title.chars().count()));
}

/// Run the healthcheck and print a report
pub fn run_healthcheck(config: &Config, options: &HealthcheckOptions) -> Result<()> {
    let retriever = Retriever::from_config(config)?;

    heading("Store settings");
    println!("Store             : {}", retriever.source().name());
    println!("Embedding model   : {}", config.embedding.model);

    let report = build_report(&retriever, options)?;
    println!("Passage count     : {}", report.total);

    heading(&format!("First {} unique titles", report.titles.len()));
    for (i, row) in report.titles.iter().enumerate() {
        println!(
            "{:>2}. {} [lang={}, genre={}, chunk={}]",
            i + 1,
            row.title,
            row.lang.as_deref().unwrap_or("-"),
            row.genre.as_deref().unwrap_or("-"),
            row.chunk.as_deref().unwrap_or("-"),
        );
    }

    heading("Sample queries");
    for outcome in &report.queries {
        println!("Q: {}", outcome.query);
        println!("   -> passages: {} | titles: {:?}", outcome.titles.len(), outcome.titles);
    }

    heading("Retrieval metrics");
    let metrics = &report.metrics;
    println!("Queries           : {}", metrics.queries_total);
    println!(
        "Cache hits/misses : {}/{} ({:.0}% hit rate)",
        metrics.cache_hits,
        metrics.cache_misses,
        metrics.hit_rate() * 100.0
    );
    println!("Empty results     : {}", metrics.empty_results);
    println!("Mean execution    : {:.2} ms", metrics.mean_execution_ms);

    heading("Result");
    let failed = report.failed();
    if failed == 0 {
        println!("OK: every query returned passages.");
        return Ok(());
    }

    println!(
        "[WARN] {} of {} queries returned no passages. Check ingestion, the retriever or the filter.",
        failed,
        report.queries.len()
    );
    if options.strict {
        anyhow::bail!("{} healthcheck queries returned no passages", failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern::config::{DistanceMetric, RetrievalConfig};
    use lectern::embedding::backend::HashBackend;
    use lectern::embedding::EmbeddingBackend;
    use lectern::retrieval::LexicalRanking;
    use lectern::store::{MemoryStore, StoredRecord};
    use lectern::QueryCache;
    use serde_json::json;
    use std::sync::Arc;

    fn retriever(records: &[(&str, Value)]) -> Retriever {
        let embedder = HashBackend::new(8);
        let store = MemoryStore::new(DistanceMetric::L2);
        for (i, (text, metadata)) in records.iter().enumerate() {
            store
                .upsert(StoredRecord {
                    id: format!("p{i}"),
                    document: text.to_string(),
                    metadata: metadata.as_object().cloned().unwrap_or_default(),
                    embedding: embedder.embed(text).unwrap(),
                })
                .unwrap();
        }
        let config = RetrievalConfig::default();
        Retriever::new(
            Arc::new(embedder),
            Arc::new(store),
            LexicalRanking::from_config(&config),
            Arc::new(QueryCache::default()),
            config,
        )
    }

    fn options(queries: &[&str]) -> HealthcheckOptions {
        HealthcheckOptions {
            list_limit: 30,
            queries: queries.iter().map(|q| q.to_string()).collect(),
            k: 3,
            filter: None,
            strict: false,
        }
    }

    #[test]
    fn test_titles_are_unique_and_limited() {
        let retriever = retriever(&[
            ("chunk one", json!({"title": "Dune", "chunk": 0, "lang": "en"})),
            ("chunk two", json!({"title": "Dune", "chunk": 1})),
            ("other", json!({"title": "Emma", "genre": "classic"})),
            ("untitled", json!({})),
        ]);

        let titles = unique_titles(&retriever, 30).unwrap();
        let names: Vec<_> = titles.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(names, vec!["Dune", "Emma", "(untitled)"]);
        assert_eq!(titles[0].chunk.as_deref(), Some("0"));
        assert_eq!(titles[0].lang.as_deref(), Some("en"));

        assert_eq!(unique_titles(&retriever, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_report_counts_failed_queries() {
        let retriever = retriever(&[("a story", json!({"title": "A"}))]);
        let report = build_report(&retriever, &options(&["story", "anything"])).unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.queries[0].titles, vec!["A"]);
        assert_eq!(report.metrics.queries_total, 2);
        assert_eq!(report.metrics.cache_misses, 2);

        let empty = self::retriever(&[]);
        let report = build_report(&empty, &options(&["story"])).unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.failed(), 1);
        assert!(report.titles.is_empty());
        assert_eq!(report.metrics.empty_results, 1);
    }
}
