//! Backend factory for creating embedding backends from configuration

use super::hash::HashBackend;
use super::http::{HttpBackend, HttpConfig};
use super::traits::{EmbeddingBackend, EmbeddingError, EmbeddingResult};
use crate::config::{BackendConfig, EmbeddingConfig};
use std::sync::Arc;
use tracing::{info, warn};

/// Create an embedding backend from a resolved backend configuration
pub fn create_backend(config: &BackendConfig) -> EmbeddingResult<Arc<dyn EmbeddingBackend>> {
    match config {
        BackendConfig::Http {
            endpoint,
            api_key,
            model,
            dimensions,
            timeout_secs,
            max_batch_size,
        } => {
            info!("Creating HTTP embedding backend: endpoint={}", endpoint);

            let http_config = HttpConfig {
                endpoint: endpoint.clone(),
                api_key: api_key.clone(),
                model: model.clone(),
                dimensions: *dimensions,
                timeout_secs: *timeout_secs,
                max_batch_size: *max_batch_size,
            };
            Ok(Arc::new(HttpBackend::new(http_config)?))
        }

        BackendConfig::Hash { dimensions } => {
            warn!("Using hash embeddings: results will not be semantically ranked");
            Ok(Arc::new(HashBackend::new(*dimensions)))
        }
    }
}

/// Create a backend from the flat `[embedding]` config section
pub fn create_backend_from_config(
    config: &EmbeddingConfig,
) -> EmbeddingResult<Arc<dyn EmbeddingBackend>> {
    let backend = config.resolve_backend().ok_or_else(|| {
        EmbeddingError::Config(format!(
            "embedding backend '{}' is unknown or missing its endpoint",
            config.backend
        ))
    })?;
    create_backend(&backend)
}
