//! In-process vector store
//!
//! Brute-force cosine similarity over a map of points. Mirrors Qdrant's
//! filter and score-threshold semantics so handlers behave the same against
//! either backend. Nothing is persisted.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::error::VectorStoreError;
use super::traits::VectorStoreBackend;
use super::types::{CollectionInfo, PayloadFilter, Point, PointRecord, ScoredPoint, SearchRequest};

struct MemoryCollection {
    vector_size: usize,
    points: BTreeMap<String, Point>,
}

/// Memory-backed implementation of [`VectorStoreBackend`]
#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine similarity; zero-length vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn missing(collection: &str) -> VectorStoreError {
    VectorStoreError::not_found(format!("Collection `{}` doesn't exist", collection))
}

/// Qdrant answers malformed requests with 400 "Wrong input: .."
fn wrong_input(message: impl std::fmt::Display) -> VectorStoreError {
    VectorStoreError::http(400, format!("Wrong input: {}", message))
}

#[async_trait]
impl VectorStoreBackend for MemoryBackend {
    async fn collection_info(
        &self,
        collection: &str,
    ) -> Result<Option<CollectionInfo>, VectorStoreError> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        Ok(collections.get(collection).map(|c| CollectionInfo {
            name: collection.to_string(),
            vector_size: Some(c.vector_size),
            points_count: Some(c.points.len() as u64),
        }))
    }

    async fn create_collection(
        &self,
        collection: &str,
        vector_size: usize,
    ) -> Result<(), VectorStoreError> {
        if vector_size == 0 {
            return Err(wrong_input("Vector size must be greater than zero"));
        }

        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        if collections.contains_key(collection) {
            return Err(VectorStoreError::http(
                409,
                format!("Collection `{}` already exists!", collection),
            ));
        }

        collections.insert(
            collection.to_string(),
            MemoryCollection {
                vector_size,
                points: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<bool, VectorStoreError> {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        Ok(collections.remove(collection).is_some())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), VectorStoreError> {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;

        // Validate the whole batch before touching anything
        if let Some(bad) = points.iter().find(|p| p.vector.len() != target.vector_size) {
            return Err(wrong_input(format!(
                "Vector dimension error: expected dim: {}, got {}",
                target.vector_size,
                bad.vector.len()
            )));
        }

        for point in points {
            target.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        request: &SearchRequest,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        let target = collections.get(collection).ok_or_else(|| missing(collection))?;

        if request.vector.len() != target.vector_size {
            return Err(wrong_input(format!(
                "Vector dimension error: expected dim: {}, got {}",
                target.vector_size,
                request.vector.len()
            )));
        }

        let mut hits: Vec<ScoredPoint> = target
            .points
            .values()
            .filter(|p| request.filter.as_ref().is_none_or(|f| f.matches(&p.payload)))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine_similarity(&request.vector, &p.vector),
                payload: p.payload.clone(),
            })
            .filter(|hit| request.min_score.is_none_or(|min| hit.score >= min))
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(request.limit);
        Ok(hits)
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&PayloadFilter>,
        limit: usize,
    ) -> Result<Vec<PointRecord>, VectorStoreError> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        let target = collections.get(collection).ok_or_else(|| missing(collection))?;

        Ok(target
            .points
            .values()
            .filter(|p| filter.is_none_or(|f| f.matches(&p.payload)))
            .take(limit)
            .map(|p| PointRecord {
                id: p.id.clone(),
                payload: p.payload.clone(),
            })
            .collect())
    }

    async fn count(
        &self,
        collection: &str,
        filter: Option<&PayloadFilter>,
    ) -> Result<u64, VectorStoreError> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        let target = collections.get(collection).ok_or_else(|| missing(collection))?;

        Ok(target
            .points
            .values()
            .filter(|p| filter.is_none_or(|f| f.matches(&p.payload)))
            .count() as u64)
    }

    async fn health_check(&self) -> Result<(), VectorStoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(id: &str, vector: Vec<f32>, language: &str) -> Point {
        Point {
            id: id.to_string(),
            vector,
            payload: json!({"language": language}).as_object().cloned().unwrap(),
        }
    }

    async fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.create_collection("c", 2).await.unwrap();
        backend
            .upsert(
                "c",
                vec![
                    point("a", vec![1.0, 0.0], "rust"),
                    point("b", vec![0.0, 1.0], "python"),
                    point("c", vec![0.7, 0.7], "rust"),
                ],
            )
            .await
            .unwrap();
        backend
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_by_score_and_limits() {
        let backend = seeded().await;
        let hits = backend
            .search(
                "c",
                &SearchRequest {
                    vector: vec![1.0, 0.0],
                    filter: None,
                    limit: 2,
                    min_score: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "c");
    }

    #[tokio::test]
    async fn test_search_filter_and_min_score() {
        let backend = seeded().await;
        let hits = backend
            .search(
                "c",
                &SearchRequest {
                    vector: vec![1.0, 0.0],
                    filter: Some(PayloadFilter::new().equals("language", "rust")),
                    limit: 10,
                    min_score: Some(0.9),
                },
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
        assert!(hits.iter().all(|h| h.score >= 0.9));
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dimension() {
        let backend = seeded().await;
        let err = backend
            .upsert("c", vec![point("d", vec![1.0, 0.0, 0.0], "go")])
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("Vector dimension error"));
        assert_eq!(backend.count("c", None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let backend = MemoryBackend::new();
        backend.create_collection("c", 2).await.unwrap();
        let err = backend.create_collection("c", 2).await.unwrap_err();
        assert_eq!(err.status(), Some(409));

        let err = backend.create_collection("zero", 0).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_missing_collection() {
        let backend = MemoryBackend::new();
        assert!(backend.collection_info("nope").await.unwrap().is_none());
        assert!(matches!(
            backend.count("nope", None).await.unwrap_err(),
            VectorStoreError::NotFound(_)
        ));
        assert!(!backend.delete_collection("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_scroll_and_count_with_filter() {
        let backend = seeded().await;
        let filter = PayloadFilter::new().equals("language", "rust");

        let records = backend.scroll("c", Some(&filter), 10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(backend.count("c", Some(&filter)).await.unwrap(), 2);
        assert_eq!(backend.scroll("c", None, 1).await.unwrap().len(), 1);
    }
}
