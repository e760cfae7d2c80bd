//! Vector store configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_timeout() -> u64 {
    30
}

fn default_tenant() -> String {
    "default_tenant".to_string()
}

fn default_database() -> String {
    "default_database".to_string()
}

/// Distance metric used by the in-memory store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean distance (Chroma's default space)
    #[default]
    L2,
    /// `1 - cosine similarity`
    Cosine,
}

/// Where candidate passages come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Records held in process, optionally loaded from a JSONL snapshot
    Memory {
        #[serde(default)]
        path: Option<PathBuf>,
        #[serde(default)]
        distance: DistanceMetric,
    },
    /// A Chroma server reached over its REST API
    Chroma {
        /// Base URL, e.g. "http://localhost:8000"
        endpoint: String,
        /// Collection name
        collection: String,
        #[serde(default = "default_tenant")]
        tenant: String,
        #[serde(default = "default_database")]
        database: String,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Chroma {
            endpoint: "http://localhost:8000".to_string(),
            collection: "books".to_string(),
            tenant: default_tenant(),
            database: default_database(),
            timeout_secs: default_timeout(),
        }
    }
}
