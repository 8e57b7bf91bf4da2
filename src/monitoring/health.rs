//! Health monitoring for production deployments
//!
//! Provides component-level health checks for:
//! - Vector store (Qdrant REST or in-memory)
//! - Embedding service
//!
//! Health states: Healthy, Degraded, Unhealthy

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::embeddings::EmbeddingProvider;
use crate::vector_store::VectorStore;

/// Overall system health status
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall system status
    pub overall: Status,
    /// Vector store component health
    pub vector_store: ComponentHealth,
    /// Embedding service component health
    pub embedding: ComponentHealth,
}

/// Health status levels
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// All systems operational
    Healthy,
    /// Some systems degraded but functional
    Degraded,
    /// Critical systems failing
    Unhealthy,
}

/// Individual component health
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// Component status
    pub status: Status,
    /// Status message
    pub message: String,
    /// Optional latency measurement in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ComponentHealth {
    /// Create healthy component status
    pub fn healthy(message: impl Into<String>, latency_ms: Option<u64>) -> Self {
        Self {
            status: Status::Healthy,
            message: message.into(),
            latency_ms,
        }
    }

    /// Create degraded component status
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: Status::Degraded,
            message: message.into(),
            latency_ms: None,
        }
    }

    /// Create unhealthy component status
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: Status::Unhealthy,
            message: message.into(),
            latency_ms: None,
        }
    }
}

/// Health monitor for the storage and embedding dependencies
pub struct HealthMonitor {
    vector_store: VectorStore,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl HealthMonitor {
    /// Create a new health monitor
    pub fn new(vector_store: VectorStore, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            vector_store,
            embedder,
        }
    }

    /// Perform comprehensive health check
    pub async fn check_health(&self) -> HealthStatus {
        // Run all checks in parallel
        let (vector_health, embedding_health) =
            tokio::join!(self.check_vector_store(), self.check_embedding());

        let overall = calculate_overall_status(&vector_health, &embedding_health);

        HealthStatus {
            overall,
            vector_store: vector_health,
            embedding: embedding_health,
        }
    }

    /// Check vector store reachability and the configured collection
    async fn check_vector_store(&self) -> ComponentHealth {
        let start = Instant::now();

        if let Err(e) = self.vector_store.health_check().await {
            return ComponentHealth::unhealthy(format!("Vector store error: {}", e));
        }

        match self.vector_store.collection_info().await {
            Ok(Some(info)) => {
                let latency = start.elapsed().as_millis() as u64;
                ComponentHealth::healthy(
                    format!(
                        "Collection {} operational ({} points)",
                        info.name,
                        info.points_count
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| "unknown".to_string())
                    ),
                    Some(latency),
                )
            }
            Ok(None) => ComponentHealth::degraded(format!(
                "Vector store reachable but collection {} is missing",
                self.vector_store.collection_name()
            )),
            Err(e) => ComponentHealth::unhealthy(format!("Vector store error: {}", e)),
        }
    }

    /// Check embedding service health
    async fn check_embedding(&self) -> ComponentHealth {
        let start = Instant::now();

        match self.embedder.health_check().await {
            Ok(description) => {
                let latency = start.elapsed().as_millis() as u64;
                ComponentHealth::healthy(
                    format!("Embedding service operational ({})", description),
                    Some(latency),
                )
            }
            Err(e) => ComponentHealth::unhealthy(format!("Embedding service error: {}", e)),
        }
    }
}

/// Calculate overall system status from component statuses
///
/// Nothing works without the vector store. Without embeddings, reads by
/// filter (crate docs, stats, notes) still work, so that is only degraded.
pub fn calculate_overall_status(vector: &ComponentHealth, embedding: &ComponentHealth) -> Status {
    if vector.status == Status::Unhealthy {
        return Status::Unhealthy;
    }

    if vector.status == Status::Degraded || embedding.status != Status::Healthy {
        return Status::Degraded;
    }

    Status::Healthy
}
