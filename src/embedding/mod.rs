//! Query embedding providers

pub mod backend;

pub use backend::{
    create_backend, create_backend_from_config, EmbeddingBackend, EmbeddingError,
    EmbeddingResult,
};
