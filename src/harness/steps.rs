//! Individual conformance steps

use anyhow::{Context, bail, ensure};
use futures::future::join_all;
use reqwest::StatusCode;
use serde_json::{Value, json};

use super::ConformanceHarness;
use crate::config::{ErrorContextExt, errors::is_retryable};
use crate::retry::retry_with_backoff_if;
use crate::vector_store::{
    Payload, PayloadFilter, Point, SearchRequest, VectorStoreBackend, VectorStoreError,
    qdrant::API_KEY_HEADER,
};

/// Points written by `insert_points`; the second one is in group "b"
const SEED_POINTS: usize = 3;

/// Unit vector along axis `index % dim`
pub(crate) fn basis_vector(dim: usize, index: usize) -> Vec<f32> {
    let mut vector = vec![0.0; dim];
    if dim > 0 {
        vector[index % dim] = 1.0;
    }
    vector
}

fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

fn new_point(vector: Vec<f32>, payload: Payload) -> Point {
    Point {
        id: uuid::Uuid::new_v4().to_string(),
        vector,
        payload,
    }
}

/// 4xx means Qdrant understood and refused the request
fn is_client_rejection(error: &VectorStoreError) -> bool {
    matches!(error.status(), Some(status) if (400..500).contains(&status))
}

impl ConformanceHarness {
    fn collection(&self) -> &str {
        &self.options.collection
    }

    /// Plain GET, bypassing the backend so status and body are visible
    async fn raw_get(&self, path: &str, with_key: bool) -> anyhow::Result<(StatusCode, String)> {
        let url = format!("{}{}", self.options.url.trim_end_matches('/'), path);
        let op = || {
            let mut request = self.http.get(&url);
            if with_key {
                if let Some(key) = &self.options.api_key {
                    request = request.header(API_KEY_HEADER, key);
                }
            }
            async move {
                let response = request
                    .send()
                    .await
                    .with_context(|| format!("GET {}", path))?;
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                Ok::<_, anyhow::Error>((status, body))
            }
        };

        retry_with_backoff_if(
            op,
            self.options.retry_attempts,
            self.options.retry_delay,
            is_retryable,
        )
        .await
    }

    pub(super) async fn check_health(&self) -> anyhow::Result<()> {
        self.with_retry(|| self.backend.health_check())
            .await
            .vector_store_context("GET /healthz")
    }

    /// A request without the key must be refused, one with it accepted
    pub(super) async fn check_auth(&self) -> anyhow::Result<()> {
        let (status, _) = self.raw_get("/collections", false).await?;
        ensure!(
            status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN,
            "request without API key returned {}, expected 401 or 403",
            status
        );

        let (status, body) = self.raw_get("/collections", true).await?;
        ensure!(
            status.is_success(),
            "request with API key returned {}: {}",
            status,
            body.trim()
        );
        Ok(())
    }

    pub(super) async fn create_collection(&self) -> anyhow::Result<()> {
        let size = self.options.vector_size;
        self.with_retry(|| self.backend.create_collection(self.collection(), size))
            .await
            .vector_store_context("create collection")?;

        let info = self
            .with_retry(|| self.backend.collection_info(self.collection()))
            .await
            .vector_store_context("read collection")?
            .context("collection missing right after creation")?;

        ensure!(
            info.vector_size == Some(size),
            "collection reports vector size {:?}, expected {}",
            info.vector_size,
            size
        );
        Ok(())
    }

    /// A zero-dimension collection must be refused with a 4xx
    pub(super) async fn reject_invalid_config(&self) -> anyhow::Result<()> {
        let name = format!("{}_invalid", self.collection());

        match self.backend.create_collection(&name, 0).await {
            Err(e) if is_client_rejection(&e) => {
                tracing::debug!("Invalid config rejected as expected: {}", e);
                Ok(())
            }
            Err(e) => Err::<(), _>(e).vector_store_context("create zero-size collection"),
            Ok(()) => {
                if let Err(e) = self.backend.delete_collection(&name).await {
                    tracing::warn!("Failed to remove accepted invalid collection {}: {}", name, e);
                }
                bail!("collection with vector size 0 was accepted")
            }
        }
    }

    /// Seed a few orthogonal points and verify the count
    pub(super) async fn insert_points(&self) -> anyhow::Result<Vec<Point>> {
        let dim = self.options.vector_size;
        let seeds: Vec<Point> = (0..SEED_POINTS)
            .map(|i| {
                new_point(
                    basis_vector(dim, i),
                    payload(json!({
                        "group": if i == 1 { "b" } else { "a" },
                        "label": format!("seed-{}", i),
                    })),
                )
            })
            .collect();

        self.with_retry(|| self.backend.upsert(self.collection(), seeds.clone()))
            .await
            .vector_store_context("upsert seed points")?;

        let count = self
            .with_retry(|| self.backend.count(self.collection(), None))
            .await
            .vector_store_context("count points")?;
        ensure!(
            count == SEED_POINTS as u64,
            "collection holds {} points after inserting {}",
            count,
            SEED_POINTS
        );

        Ok(seeds)
    }

    /// A vector of the wrong length must be refused with a 4xx
    pub(super) async fn reject_invalid_point(&self) -> anyhow::Result<()> {
        let bad = new_point(
            vec![0.5; self.options.vector_size + 1],
            payload(json!({ "group": "invalid" })),
        );

        match self.backend.upsert(self.collection(), vec![bad]).await {
            Err(e) if is_client_rejection(&e) => Ok(()),
            Err(e) => Err::<(), _>(e).vector_store_context("upsert wrong-dimension point"),
            Ok(()) => bail!(
                "point with {} dimensions was accepted by a {}-dimension collection",
                self.options.vector_size + 1,
                self.options.vector_size
            ),
        }
    }

    /// Querying with a seed's own vector must rank that seed first
    pub(super) async fn search(&self, seeds: &[Point]) -> anyhow::Result<()> {
        let target = seeds.first().context("no seed points to search for")?;
        let request = SearchRequest {
            vector: target.vector.clone(),
            filter: None,
            limit: SEED_POINTS,
            min_score: None,
        };

        let hits = self
            .with_retry(|| self.backend.search(self.collection(), &request))
            .await
            .vector_store_context("search")?;

        let top = hits.first().context("search returned no hits")?;
        ensure!(
            top.id == target.id,
            "top hit {} is not the query point {}",
            top.id,
            target.id
        );
        ensure!(
            top.score > 0.99,
            "self-similarity score {} is below 0.99",
            top.score
        );
        ensure!(
            hits.windows(2).all(|w| w[0].score >= w[1].score),
            "hits are not ordered by descending score"
        );
        ensure!(
            top.payload.get("label") == target.payload.get("label"),
            "payload did not round-trip"
        );
        Ok(())
    }

    /// A payload filter must restrict hits to matching points
    pub(super) async fn filtered_search(&self, seeds: &[Point]) -> anyhow::Result<()> {
        let target = seeds.get(1).context("no seed point in group b")?;
        let request = SearchRequest {
            vector: basis_vector(self.options.vector_size, 0),
            filter: Some(PayloadFilter::new().equals("group", "b")),
            limit: SEED_POINTS,
            min_score: None,
        };

        let hits = self
            .with_retry(|| self.backend.search(self.collection(), &request))
            .await
            .vector_store_context("filtered search")?;

        ensure!(!hits.is_empty(), "filtered search returned no hits");
        if let Some(stray) = hits
            .iter()
            .find(|h| h.payload.get("group").and_then(Value::as_str) != Some("b"))
        {
            bail!("hit {} does not match filter group=b", stray.id);
        }
        ensure!(
            hits.iter().any(|h| h.id == target.id),
            "filtered search missed point {}",
            target.id
        );
        Ok(())
    }

    /// Parallel single-point upserts must all land
    pub(super) async fn concurrent_insert(&self, existing: u64) -> anyhow::Result<()> {
        let writers = self.options.concurrent_writers;
        let dim = self.options.vector_size;

        let writes = (0..writers).map(|i| {
            let mut vector = vec![1.0; dim];
            vector[i % dim] += 0.5;
            let point = new_point(vector, payload(json!({ "group": "concurrent", "writer": i })));
            async move {
                self.with_retry(|| self.backend.upsert(self.collection(), vec![point.clone()]))
                    .await
            }
        });

        let failures: Vec<String> = join_all(writes)
            .await
            .into_iter()
            .filter_map(|r| r.err().map(|e| e.to_string()))
            .collect();
        ensure!(
            failures.is_empty(),
            "{} of {} concurrent upserts failed: {}",
            failures.len(),
            writers,
            failures.join("; ")
        );

        let count = self
            .with_retry(|| self.backend.count(self.collection(), None))
            .await
            .vector_store_context("count points")?;
        let expected = existing + writers as u64;
        ensure!(
            count == expected,
            "collection holds {} points, expected {}",
            count,
            expected
        );
        Ok(())
    }

    /// Errors must come back as JSON `{"status": {"error": ".."}}`
    pub(super) async fn check_error_format(&self) -> anyhow::Result<()> {
        let missing = format!("{}_missing_{}", self.collection(), uuid::Uuid::new_v4().simple());
        let (status, body) = self
            .raw_get(&format!("/collections/{}", missing), true)
            .await?;

        ensure!(
            status == StatusCode::NOT_FOUND,
            "missing collection returned {}, expected 404",
            status
        );

        let json: Value = serde_json::from_str(&body)
            .with_context(|| format!("error body is not JSON: {}", body.trim()))?;
        match json.pointer("/status/error").and_then(Value::as_str) {
            Some(message) if !message.is_empty() => Ok(()),
            _ => bail!("error body lacks status.error: {}", body.trim()),
        }
    }

    /// Drop the test collection
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        let deleted = self
            .with_retry(|| self.backend.delete_collection(self.collection()))
            .await
            .vector_store_context("delete collection")?;
        ensure!(deleted, "collection {} was already gone", self.collection());
        tracing::info!("Deleted collection {}", self.collection());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_vector() {
        assert_eq!(basis_vector(4, 1), vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(basis_vector(3, 4), vec![0.0, 1.0, 0.0]);
        assert!(basis_vector(0, 2).is_empty());
    }

    #[test]
    fn test_client_rejection() {
        assert!(is_client_rejection(&VectorStoreError::http(422, "bad")));
        assert!(!is_client_rejection(&VectorStoreError::http(500, "oops")));
        assert!(!is_client_rejection(&VectorStoreError::connection("down")));
    }
}
