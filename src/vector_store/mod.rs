//! Vector database integration
//!
//! Stores records as points in a single collection and searches them by
//! embedding similarity. The Qdrant REST API is the production backend; an
//! in-process backend exists for tests and offline use.

pub mod error;
pub mod memory;
pub mod qdrant;
pub mod traits;
pub mod types;

// Re-exports
pub use error::VectorStoreError;
pub use memory::MemoryBackend;
pub use qdrant::QdrantRestBackend;
pub use traits::VectorStoreBackend;
pub use types::{
    CollectionInfo, FieldCondition, Payload, PayloadFilter, Point, PointRecord, ScoredPoint,
    SearchRequest,
};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{BackendKind, Config};
use crate::embeddings::Embedding;

/// Identifier and timestamp assigned to a freshly stored point
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoreReceipt {
    pub id: String,
    pub created_at: String,
}

/// Vector store bound to one collection
///
/// This is the main entry point for vector operations. It is constructed
/// once at startup and handed to whoever needs it; clones share the backend.
#[derive(Clone)]
pub struct VectorStore {
    backend: Arc<dyn VectorStoreBackend>,
    collection: String,
    vector_size: usize,
}

impl VectorStore {
    /// Wrap an existing backend
    pub fn new(
        backend: Arc<dyn VectorStoreBackend>,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Self {
        Self {
            backend,
            collection: collection.into(),
            vector_size,
        }
    }

    /// In-process store, mostly for tests
    pub fn in_memory(collection: impl Into<String>, vector_size: usize) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), collection, vector_size)
    }

    /// Create from config
    pub fn from_config(config: &Config) -> Result<Self, VectorStoreError> {
        let backend: Arc<dyn VectorStoreBackend> = match config.backend {
            BackendKind::Qdrant => Arc::new(QdrantRestBackend::new(
                config.qdrant_url.clone(),
                config.qdrant_api_key.clone(),
                config.http_timeout,
            )?),
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
        };
        Ok(Self::new(
            backend,
            config.collection_name.clone(),
            config.vector_size,
        ))
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn vector_size(&self) -> usize {
        self.vector_size
    }

    /// Create the collection if it is missing
    ///
    /// Returns `true` when this call created it. Calling it again is a no-op
    /// returning `false`.
    pub async fn ensure_collection_exists(&self) -> Result<bool, VectorStoreError> {
        if let Some(info) = self.backend.collection_info(&self.collection).await? {
            if let Some(size) = info.vector_size.filter(|s| *s != self.vector_size) {
                tracing::warn!(
                    "Collection {} has {} dimensions but {} are configured",
                    self.collection,
                    size,
                    self.vector_size
                );
            }
            tracing::debug!("Collection {} already exists", self.collection);
            return Ok(false);
        }

        match self
            .backend
            .create_collection(&self.collection, self.vector_size)
            .await
        {
            Ok(()) => {
                tracing::info!("Created collection {}", self.collection);
                Ok(true)
            }
            // Lost a race with another creator
            Err(e) if e.status() == Some(409) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Store one point with a fresh UUID and `created_at` timestamp
    ///
    /// No deduplication: identical payloads produce distinct points.
    pub async fn store(
        &self,
        mut payload: Payload,
        vector: Embedding,
    ) -> Result<StoreReceipt, VectorStoreError> {
        if vector.len() != self.vector_size {
            return Err(VectorStoreError::invalid_input(format!(
                "vector has {} dimensions, collection {} expects {}",
                vector.len(),
                self.collection,
                self.vector_size
            )));
        }

        let receipt = StoreReceipt {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        payload.insert(
            "created_at".to_string(),
            Value::String(receipt.created_at.clone()),
        );

        self.backend
            .upsert(
                &self.collection,
                vec![Point {
                    id: receipt.id.clone(),
                    vector,
                    payload,
                }],
            )
            .await?;

        tracing::debug!("Stored point {} in {}", receipt.id, self.collection);
        Ok(receipt)
    }

    /// Search for similar points using a query vector
    ///
    /// Hits below `min_score` are dropped even if the backend returns them.
    pub async fn search(
        &self,
        query_vector: Embedding,
        filter: Option<PayloadFilter>,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let request = SearchRequest {
            vector: query_vector,
            filter,
            limit,
            min_score,
        };

        let mut hits = self.backend.search(&self.collection, &request).await?;
        if let Some(min) = min_score {
            hits.retain(|hit| hit.score >= min);
        }
        hits.truncate(limit);
        Ok(hits)
    }

    /// Fetch points matching a payload filter
    pub async fn scroll(
        &self,
        filter: Option<PayloadFilter>,
        limit: usize,
    ) -> Result<Vec<PointRecord>, VectorStoreError> {
        self.backend
            .scroll(&self.collection, filter.as_ref(), limit)
            .await
    }

    /// Count points, optionally restricted by a filter
    pub async fn count(&self, filter: Option<PayloadFilter>) -> Result<u64, VectorStoreError> {
        self.backend.count(&self.collection, filter.as_ref()).await
    }

    /// Describe the bound collection
    pub async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        self.backend.collection_info(&self.collection).await
    }

    /// Check if the backend is healthy/connected
    pub async fn health_check(&self) -> Result<(), VectorStoreError> {
        self.backend.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_ensure_collection_is_idempotent() {
        let store = VectorStore::in_memory("snippets", 4);

        assert!(store.ensure_collection_exists().await.unwrap());
        assert!(!store.ensure_collection_exists().await.unwrap());
        assert!(!store.ensure_collection_exists().await.unwrap());

        let info = store.collection_info().await.unwrap().unwrap();
        assert_eq!(info.vector_size, Some(4));
    }

    #[tokio::test]
    async fn test_store_assigns_distinct_ids() {
        let store = VectorStore::in_memory("snippets", 4);
        store.ensure_collection_exists().await.unwrap();

        let p = payload(json!({"code": "print('hi')"}));
        let first = store.store(p.clone(), vec![0.1, 0.2, 0.3, 0.4]).await.unwrap();
        let second = store.store(p, vec![0.1, 0.2, 0.3, 0.4]).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(uuid::Uuid::parse_str(&first.id).is_ok());
        assert_eq!(store.count(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_store_then_search_returns_payload() {
        let store = VectorStore::in_memory("snippets", 4);
        store.ensure_collection_exists().await.unwrap();

        let receipt = store
            .store(
                payload(json!({"code": "fn main() {}", "language": "rust"})),
                vec![1.0, 0.0, 0.0, 0.0],
            )
            .await
            .unwrap();

        let hits = store
            .search(vec![1.0, 0.0, 0.0, 0.0], None, 5, Some(0.5))
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, receipt.id);
        assert_eq!(hits[0].payload["language"], json!("rust"));
        assert_eq!(hits[0].payload["created_at"], json!(receipt.created_at));
    }

    #[tokio::test]
    async fn test_store_rejects_wrong_vector_size() {
        let store = VectorStore::in_memory("snippets", 4);
        store.ensure_collection_exists().await.unwrap();

        let err = store
            .store(Payload::new(), vec![1.0, 0.0])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::InvalidInput(_)));
    }
}
