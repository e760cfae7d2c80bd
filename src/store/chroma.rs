//! Chroma vector source over the v2 REST API
//!
//! Collections live under `/api/v2/tenants/{tenant}/databases/{database}`.
//! The collection is resolved by name once, at connect time. Queries ask for
//! documents, metadatas and distances, and the first (only) result row of
//! Chroma's nested lists is returned.

use super::{SourceError, SourceResponse, SourceResult, StoredPassage, VectorSource};
use crate::types::{Embedding, Metadata, PassageId};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const INCLUDE: [&str; 3] = ["documents", "metadatas", "distances"];

/// Connection settings for a Chroma server
#[derive(Debug, Clone)]
pub struct ChromaConfig {
    /// Server base URL (e.g., "http://localhost:8000")
    pub endpoint: String,
    /// Collection name
    pub collection: String,
    /// Tenant owning the database (Chroma's is "default_tenant")
    pub tenant: String,
    /// Database holding the collection (Chroma's is "default_database")
    pub database: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug)]
pub struct ChromaSource {
    client: Client,
    base: Url,
    tenant: String,
    database: String,
    collection: String,
    collection_id: String,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Value>,
    include: &'a [&'a str],
}

/// Query answers are one row per query embedding
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<PassageId>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

#[derive(Debug, Serialize)]
struct GetRequest<'a> {
    limit: usize,
    offset: usize,
    include: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(default)]
    ids: Vec<PassageId>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Metadata>>>,
}

impl QueryResponse {
    fn into_first_row(self) -> SourceResponse {
        fn first<T>(rows: Option<Vec<Vec<T>>>) -> Vec<T> {
            rows.and_then(|rows| rows.into_iter().next()).unwrap_or_default()
        }

        let ids = self.ids.into_iter().next().unwrap_or_default();
        let mut documents = first(self.documents);
        // Chroma omits documents when none were stored; keep rows aligned to ids
        if documents.is_empty() {
            documents = vec![None; ids.len()];
        }

        SourceResponse {
            documents,
            metadatas: first(self.metadatas),
            ids,
            distances: first(self.distances),
        }
    }
}

impl GetResponse {
    fn into_passages(self) -> Vec<StoredPassage> {
        let mut documents = self.documents.unwrap_or_default().into_iter();
        let mut metadatas = self.metadatas.unwrap_or_default().into_iter();
        self.ids
            .into_iter()
            .map(|id| StoredPassage {
                id,
                document: documents.next().flatten().unwrap_or_default(),
                metadata: metadatas.next().flatten().unwrap_or_default(),
            })
            .collect()
    }
}

impl ChromaSource {
    /// Connect and resolve the collection id
    pub fn connect(config: ChromaConfig) -> SourceResult<Self> {
        let base = Url::parse(&config.endpoint).map_err(|e| {
            SourceError::Protocol(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut source = Self {
            client,
            base,
            tenant: config.tenant,
            database: config.database,
            collection: config.collection,
            collection_id: String::new(),
        };

        let url = source.collection_url(&source.collection, None)?;
        let response = source.client.get(url).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::CollectionNotFound(source.collection));
        }
        let info: CollectionInfo = check_status(response)?
            .json()
            .map_err(|e| SourceError::Protocol(format!("collection lookup: {}", e)))?;

        info!(
            "Connected to Chroma collection '{}' ({}) in {}/{} at {}",
            source.collection, info.id, source.tenant, source.database, source.base
        );
        source.collection_id = info.id;
        Ok(source)
    }

    fn collection_url(&self, collection: &str, action: Option<&str>) -> SourceResult<Url> {
        collection_url(&self.base, &self.tenant, &self.database, collection, action)
    }

    fn action_url(&self, action: &str) -> SourceResult<Url> {
        self.collection_url(&self.collection_id, Some(action))
    }
}

/// `{base}/api/v2/tenants/{tenant}/databases/{database}/collections/{collection}[/{action}]`
fn collection_url(
    base: &Url,
    tenant: &str,
    database: &str,
    collection: &str,
    action: Option<&str>,
) -> SourceResult<Url> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| SourceError::Protocol(format!("endpoint cannot be a base: {}", base)))?;
        segments.pop_if_empty().extend([
            "api",
            "v2",
            "tenants",
            tenant,
            "databases",
            database,
            "collections",
            collection,
        ]);
        if let Some(action) = action {
            segments.push(action);
        }
    }
    Ok(url)
}

impl VectorSource for ChromaSource {
    fn query(
        &self,
        embedding: &Embedding,
        n: usize,
        filter: Option<&Value>,
    ) -> SourceResult<SourceResponse> {
        let request = QueryRequest {
            query_embeddings: [embedding.as_slice()],
            n_results: n,
            filter,
            include: &INCLUDE,
        };

        debug!(
            "Chroma query: collection={}, n_results={}, filtered={}",
            self.collection,
            n,
            filter.is_some()
        );

        let response = self
            .client
            .post(self.action_url("query")?)
            .json(&request)
            .send()?;

        let status = response.status();
        if filter.is_some()
            && (status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY)
        {
            let message = response.text().unwrap_or_default();
            return Err(SourceError::MalformedFilter(message));
        }

        let body: QueryResponse = check_status(response)?
            .json()
            .map_err(|e| SourceError::Protocol(format!("query response: {}", e)))?;
        Ok(body.into_first_row())
    }

    fn count(&self) -> SourceResult<usize> {
        let response = self.client.get(self.action_url("count")?).send()?;
        check_status(response)?
            .json()
            .map_err(|e| SourceError::Protocol(format!("count response: {}", e)))
    }

    fn peek(&self, limit: usize, offset: usize) -> SourceResult<Vec<StoredPassage>> {
        let request = GetRequest {
            limit,
            offset,
            include: &INCLUDE[..2],
        };
        let response = self
            .client
            .post(self.action_url("get")?)
            .json(&request)
            .send()?;
        let body: GetResponse = check_status(response)?
            .json()
            .map_err(|e| SourceError::Protocol(format!("get response: {}", e)))?;
        Ok(body.into_passages())
    }

    fn name(&self) -> &str {
        "chroma"
    }
}

fn check_status(response: Response) -> SourceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().unwrap_or_else(|_| "Unknown error".to_string());
    Err(SourceError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_request_shape() {
        let embedding = vec![0.1_f32, 0.2];
        let filter = json!({"lang": "en"});
        let request = QueryRequest {
            query_embeddings: [embedding.as_slice()],
            n_results: 8,
            filter: Some(&filter),
            include: &INCLUDE,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["n_results"], 8);
        assert_eq!(value["where"]["lang"], "en");
        assert_eq!(value["query_embeddings"][0].as_array().unwrap().len(), 2);
        assert_eq!(value["include"], json!(["documents", "metadatas", "distances"]));

        let unfiltered = QueryRequest {
            filter: None,
            ..request
        };
        let value = serde_json::to_value(&unfiltered).unwrap();
        assert!(value.get("where").is_none());
    }

    #[test]
    fn test_collection_urls_use_tenant_and_database() {
        let base = Url::parse("http://localhost:8000/").unwrap();
        let lookup = collection_url(&base, "default_tenant", "default_database", "books", None).unwrap();
        assert_eq!(
            lookup.as_str(),
            "http://localhost:8000/api/v2/tenants/default_tenant/databases/default_database/collections/books"
        );

        let base = Url::parse("http://chroma.internal:8000/proxy").unwrap();
        let query = collection_url(&base, "acme", "library", "3f2a-uuid", Some("query")).unwrap();
        assert_eq!(
            query.as_str(),
            "http://chroma.internal:8000/proxy/api/v2/tenants/acme/databases/library/collections/3f2a-uuid/query"
        );
    }

    #[test]
    fn test_query_response_takes_first_row() {
        let body: QueryResponse = serde_json::from_value(json!({
            "ids": [["b1-0", "b2-3"]],
            "documents": [["first passage", null]],
            "metadatas": [[{"title": "One"}, null]],
            "distances": [[0.25, 0.5]],
            "embeddings": null
        }))
        .unwrap();

        let response = body.into_first_row();
        assert_eq!(response.ids, vec!["b1-0", "b2-3"]);
        assert_eq!(response.documents[1], None);
        assert_eq!(response.distances, vec![Some(0.25), Some(0.5)]);

        let candidates = response.into_candidates().unwrap();
        assert_eq!(candidates[0].metadata["title"], "One");
        assert_eq!(candidates[1].text, "");
    }

    #[test]
    fn test_query_response_without_documents_stays_aligned() {
        let body: QueryResponse = serde_json::from_value(json!({
            "ids": [["x", "y"]],
            "documents": null,
            "metadatas": null,
            "distances": null
        }))
        .unwrap();
        let candidates = body.into_first_row().into_candidates().unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].distance, 0.0);
    }

    #[test]
    fn test_empty_query_response() {
        let body: QueryResponse = serde_json::from_value(json!({"ids": [[]]})).unwrap();
        let response = body.into_first_row();
        assert!(response.ids.is_empty());
        assert!(response.into_candidates().unwrap().is_empty());
    }

    #[test]
    fn test_get_response_into_passages() {
        let body: GetResponse = serde_json::from_value(json!({
            "ids": ["a", "b"],
            "documents": ["alpha", null],
            "metadatas": [{"author": "X"}, {}]
        }))
        .unwrap();
        let passages = body.into_passages();
        assert_eq!(passages[0].document, "alpha");
        assert_eq!(passages[0].metadata["author"], "X");
        assert_eq!(passages[1].document, "");
    }

    #[test]
    fn test_connect_rejects_bad_endpoint() {
        let err = ChromaSource::connect(ChromaConfig {
            endpoint: "not a url".to_string(),
            collection: "books".to_string(),
            tenant: "default_tenant".to_string(),
            database: "default_database".to_string(),
            timeout_secs: 1,
        })
        .unwrap_err();
        assert!(matches!(err, SourceError::Protocol(_)));
    }
}
