//! Configuration for lectern

mod embedding;
mod logging;
mod retrieval;
mod store;

pub use embedding::{BackendConfig, EmbeddingConfig};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use retrieval::{Bm25Config, RetrievalConfig};
pub use store::{DistanceMetric, StoreConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Vector store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML (used by `lectern init`)
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Embedding validation
        if self.embedding.dimensions == 0 {
            errors.push("embedding dimensions must be positive".to_string());
        }
        if self.embedding.dimensions > 4096 {
            errors.push("embedding dimensions must be <= 4096".to_string());
        }
        match self.embedding.backend.as_str() {
            "http" => {
                if self.embedding.endpoint.as_deref().map_or(true, |e| e.trim().is_empty()) {
                    errors.push("embedding endpoint is required for the http backend".to_string());
                }
                if self.embedding.max_batch_size == 0 {
                    errors.push("embedding max_batch_size must be positive".to_string());
                }
            }
            "hash" => {}
            other => errors.push(format!("unknown embedding backend '{}'", other)),
        }

        // Store validation
        if let StoreConfig::Chroma {
            endpoint,
            collection,
            tenant,
            database,
            ..
        } = &self.store
        {
            if url::Url::parse(endpoint).is_err() {
                errors.push(format!("store endpoint '{}' is not a valid URL", endpoint));
            }
            if collection.trim().is_empty() {
                errors.push("store collection must not be empty".to_string());
            }
            if tenant.trim().is_empty() || database.trim().is_empty() {
                errors.push("store tenant and database must not be empty".to_string());
            }
        }

        // Retrieval validation
        let retrieval = &self.retrieval;
        if !(0.0..=1.0).contains(&retrieval.mmr_lambda) {
            errors.push("mmr_lambda must be between 0.0 and 1.0".to_string());
        }
        if retrieval.rrf_k == 0 {
            errors.push("rrf_k must be positive".to_string());
        }
        if retrieval.oversample_factor == 0 {
            errors.push("oversample_factor must be positive".to_string());
        }
        if retrieval.min_candidates == 0 {
            errors.push("min_candidates must be positive".to_string());
        }
        if retrieval.cache_ttl_secs == 0 {
            errors.push("cache_ttl_secs must be positive".to_string());
        }
        if retrieval.default_k == 0 {
            errors.push("default_k must be positive".to_string());
        }
        if retrieval.bm25.k1 < 0.0 {
            errors.push("bm25 k1 must not be negative".to_string());
        }
        if !(0.0..=1.0).contains(&retrieval.bm25.b) {
            errors.push("bm25 b must be between 0.0 and 1.0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
