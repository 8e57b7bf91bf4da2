//! Vector store backend trait definition
//!
//! Defines the interface that all vector storage backends must implement.

use async_trait::async_trait;

use super::error::VectorStoreError;
use super::types::{CollectionInfo, PayloadFilter, Point, PointRecord, ScoredPoint, SearchRequest};

/// Trait for vector storage backends
///
/// Implementations must be Send + Sync for use with async runtimes.
/// Every call names its collection so one backend can serve several.
#[async_trait]
pub trait VectorStoreBackend: Send + Sync {
    /// Describe a collection, `None` when it does not exist
    async fn collection_info(
        &self,
        collection: &str,
    ) -> Result<Option<CollectionInfo>, VectorStoreError>;

    /// Create a collection with cosine distance
    async fn create_collection(
        &self,
        collection: &str,
        vector_size: usize,
    ) -> Result<(), VectorStoreError>;

    /// Drop a collection, returning whether it existed
    async fn delete_collection(&self, collection: &str) -> Result<bool, VectorStoreError>;

    /// Insert or overwrite points
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), VectorStoreError>;

    /// Similarity search
    async fn search(
        &self,
        collection: &str,
        request: &SearchRequest,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError>;

    /// Fetch up to `limit` points by payload filter without a query vector
    ///
    /// Backends page internally; callers get every match up to the limit.
    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&PayloadFilter>,
        limit: usize,
    ) -> Result<Vec<PointRecord>, VectorStoreError>;

    /// Count points, optionally restricted by a filter
    async fn count(
        &self,
        collection: &str,
        filter: Option<&PayloadFilter>,
    ) -> Result<u64, VectorStoreError>;

    /// Check if the backend is healthy/connected
    async fn health_check(&self) -> Result<(), VectorStoreError>;
}
