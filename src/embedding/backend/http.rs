//! HTTP embedding backend for OpenAI-compatible APIs
//!
//! Works against the OpenAI API, Azure OpenAI, and local servers that speak
//! the same `/v1/embeddings` protocol (LM Studio, vLLM, Ollama,
//! text-embeddings-inference).

use super::traits::{EmbeddingBackend, EmbeddingError, EmbeddingResult};
use crate::types::Embedding;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the HTTP embedding backend
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API endpoint (e.g., "https://api.openai.com/v1/embeddings")
    pub endpoint: String,
    /// API key (falls back to OPENAI_API_KEY)
    pub api_key: Option<String>,
    /// Model name (e.g., "text-embedding-3-small")
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum texts per request
    pub max_batch_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_secs: 30,
            max_batch_size: 100,
        }
    }
}

/// HTTP embedding backend for OpenAI-compatible APIs
#[derive(Debug)]
pub struct HttpBackend {
    client: Client,
    config: HttpConfig,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    encoding_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl HttpBackend {
    /// Create a new HTTP embedding backend. No request is made here.
    pub fn new(config: HttpConfig) -> EmbeddingResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());

        if let Some(key) = &api_key {
            let auth_value = format!("Bearer {}", key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| EmbeddingError::Config(format!("Invalid API key format: {}", e)))?,
            );
        } else if config.endpoint.contains("openai.com") || config.endpoint.contains("azure.com") {
            warn!("No API key provided for {}", config.endpoint);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "HTTP embedding backend ready: endpoint={}, model={}, {} dimensions",
            config.endpoint, config.model, config.dimensions
        );

        Ok(Self { client, config })
    }

    fn request_embeddings(&self, texts: &[&str]) -> EmbeddingResult<Vec<Embedding>> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: texts,
            // Only the text-embedding-3 family accepts a dimensions override
            dimensions: self
                .config
                .model
                .contains("text-embedding-3")
                .then_some(self.config.dimensions),
            encoding_format: "float",
        };

        debug!(
            "Sending embedding request to {} for {} texts",
            self.config.endpoint,
            texts.len()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|s| s * 1000);
            return Err(EmbeddingError::RateLimited { retry_after_ms });
        }

        if !status.is_success() {
            let error_text = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(EmbeddingError::EmbeddingFailed(format!(
                "API error ({}): {}",
                status, message
            )));
        }

        let embedding_response: EmbeddingResponse = response.json().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to parse response: {}", e))
        })?;

        if let Some(usage) = &embedding_response.usage {
            debug!("Embedding request used {} tokens", usage.total_tokens);
        }

        let mut data = embedding_response.data;
        if data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: data.len(),
            });
        }
        data.sort_by_key(|d| d.index);

        Ok(data
            .into_iter()
            .map(|d| normalize_embedding(d.embedding))
            .collect())
    }
}

impl EmbeddingBackend for HttpBackend {
    fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in text_refs.chunks(self.config.max_batch_size.max(1)) {
            all_embeddings.extend(self.request_embeddings(chunk)?);
        }
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Normalize an embedding vector to unit length
fn normalize_embedding(mut embedding: Embedding) -> Embedding {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        embedding.iter_mut().for_each(|x| *x /= norm);
    }
    embedding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_default() {
        let config = HttpConfig::default();
        assert_eq!(config.endpoint, "https://api.openai.com/v1/embeddings");
        assert_eq!(config.model, "text-embedding-3-small");
        assert_eq!(config.dimensions, 1536);
        assert_eq!(config.max_batch_size, 100);
    }

    #[test]
    fn test_normalize_embedding() {
        let normalized = normalize_embedding(vec![3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        assert_eq!(normalize_embedding(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_empty_batch_makes_no_request() {
        // Port 9 (discard) is never contacted because the batch is empty
        let backend = HttpBackend::new(HttpConfig {
            endpoint: "http://127.0.0.1:9/v1/embeddings".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert!(backend.embed_batch(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_request_serializes_openai_shape() {
        let inputs = ["friendship story"];
        let request = EmbeddingRequest {
            model: "text-embedding-3-small",
            input: &inputs,
            dimensions: Some(512),
            encoding_format: "float",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["input"][0], "friendship story");
        assert_eq!(value["dimensions"], 512);
        assert_eq!(value["encoding_format"], "float");
    }
}
