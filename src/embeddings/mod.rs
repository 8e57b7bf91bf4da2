//! Embedding generation via an external HTTP service
//!
//! The service owns the model; this side only ships text over and checks
//! that the vector that comes back has the configured dimensionality.

pub mod http;

pub use http::HttpEmbeddingClient;

use async_trait::async_trait;
use thiserror::Error;

/// An embedding vector (768 dimensions for all-mpnet-base-v2)
pub type Embedding = Vec<f32>;

/// Errors that can occur while obtaining an embedding
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Nothing to embed
    #[error("Cannot embed empty text")]
    EmptyInput,

    /// Network failure or timeout
    #[error("Embedding service request failed: {0}")]
    Request(String),

    /// Non-2xx response
    #[error("Embedding service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the expected JSON shape
    #[error("Malformed embedding response: {0}")]
    Malformed(String),

    /// Vector length differs from the collection's
    #[error("Embedding has {actual} dimensions, expected {expected}")]
    Dimension { expected: usize, actual: usize },
}

/// Anything that can turn text into a fixed-length vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Length of every vector this provider returns
    fn dimensions(&self) -> usize;

    /// Probe the provider, returning a short description on success
    async fn health_check(&self) -> Result<String, EmbeddingError>;
}
