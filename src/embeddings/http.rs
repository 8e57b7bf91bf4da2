//! HTTP client for the embedding service
//!
//! Contract: `POST /embed {"text": ..}` → `{"embedding": [f32]}` and
//! `GET /health` → `{"status": .., "model": .., "vector_size": ..}`.
//! One request per call; no caching, batching, or retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Embedding, EmbeddingError, EmbeddingProvider};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Embedding,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
    model: Option<String>,
    vector_size: Option<usize>,
}

/// Embedding provider backed by the HTTP embedding service
#[derive(Clone)]
pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    base_url: String,
    dimensions: usize,
}

impl HttpEmbeddingClient {
    /// Create a client for the service at `base_url`
    ///
    /// # Arguments
    /// * `base_url` - Service root, e.g. `http://localhost:8000`
    /// * `dimensions` - Expected vector length
    /// * `timeout` - Per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            dimensions,
        })
    }

    /// Service root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, EmbeddingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(EmbeddingError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let preview: String = text.chars().take(100).collect();
        tracing::debug!("Requesting embedding for: {}", preview);

        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&EmbedRequest { text })
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let response = Self::error_for_status(response).await?;

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        if body.embedding.len() != self.dimensions {
            return Err(EmbeddingError::Dimension {
                expected: self.dimensions,
                actual: body.embedding.len(),
            });
        }

        Ok(body.embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<String, EmbeddingError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let response = Self::error_for_status(response).await?;

        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        if let Some(actual) = health.vector_size {
            if actual != self.dimensions {
                return Err(EmbeddingError::Dimension {
                    expected: self.dimensions,
                    actual,
                });
            }
        }

        Ok(format!(
            "status={} model={}",
            health.status,
            health.model.as_deref().unwrap_or("unknown")
        ))
    }
}
