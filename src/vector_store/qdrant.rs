//! Qdrant backend over the REST API
//!
//! Talks to `/collections/{name}/...` directly with reqwest. Every response
//! is wrapped in Qdrant's `{"result": .., "status": .., "time": ..}` envelope;
//! errors carry `{"status": {"error": ".."}}`.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

use super::error::VectorStoreError;
use super::traits::VectorStoreBackend;
use super::types::{
    CollectionInfo, Payload, PayloadFilter, Point, PointRecord, ScoredPoint, SearchRequest,
};

/// Header Qdrant reads the API key from
pub const API_KEY_HEADER: &str = "api-key";

/// Points requested per scroll page
pub const SCROLL_PAGE_SIZE: usize = 256;

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct RawScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Deserialize)]
struct RawRecord {
    id: Value,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<RawRecord>,
    #[serde(default)]
    next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
struct CountResult {
    count: u64,
}

/// Qdrant ids are UUID strings or unsigned integers
fn id_to_string(id: Value) -> String {
    match id {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Pull the human-readable message out of a Qdrant error body
pub fn qdrant_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/status/error")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// REST client for a Qdrant server
#[derive(Clone)]
pub struct QdrantRestBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantRestBackend {
    /// Create a backend for the server at `base_url`
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, VectorStoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VectorStoreError::connection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    /// Send and return the raw response, mapping non-2xx to `Http` errors
    async fn send_raw(&self, builder: RequestBuilder) -> Result<reqwest::Response, VectorStoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| VectorStoreError::connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(VectorStoreError::http(
            status.as_u16(),
            qdrant_error_message(&body),
        ))
    }

    /// Send and unwrap the `result` field of the envelope
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, VectorStoreError> {
        let response = self.send_raw(builder).await?;
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| VectorStoreError::serialization(e.to_string()))?;
        Ok(envelope.result)
    }
}

#[async_trait]
impl VectorStoreBackend for QdrantRestBackend {
    async fn collection_info(
        &self,
        collection: &str,
    ) -> Result<Option<CollectionInfo>, VectorStoreError> {
        let result: Result<Value, _> = self
            .send(self.request(Method::GET, &format!("/collections/{}", collection)))
            .await;

        match result {
            Ok(info) => Ok(Some(CollectionInfo {
                name: collection.to_string(),
                vector_size: info
                    .pointer("/config/params/vectors/size")
                    .and_then(Value::as_u64)
                    .map(|s| s as usize),
                points_count: info.get("points_count").and_then(Value::as_u64),
            })),
            Err(VectorStoreError::Http { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_collection(
        &self,
        collection: &str,
        vector_size: usize,
    ) -> Result<(), VectorStoreError> {
        let body = json!({
            "vectors": { "size": vector_size, "distance": "Cosine" }
        });

        let _: Value = self
            .send(
                self.request(Method::PUT, &format!("/collections/{}", collection))
                    .json(&body),
            )
            .await?;

        tracing::info!("Created Qdrant collection {} ({} dims)", collection, vector_size);
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<bool, VectorStoreError> {
        let result: Result<bool, _> = self
            .send(self.request(Method::DELETE, &format!("/collections/{}", collection)))
            .await;

        match result {
            Ok(deleted) => Ok(deleted),
            Err(VectorStoreError::Http { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), VectorStoreError> {
        let count = points.len();
        let body = json!({ "points": points });

        let _: Value = self
            .send(
                self.request(
                    Method::PUT,
                    &format!("/collections/{}/points?wait=true", collection),
                )
                .json(&body),
            )
            .await?;

        tracing::debug!("Upserted {} point(s) into {}", count, collection);
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        request: &SearchRequest,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let mut body = json!({
            "vector": request.vector,
            "limit": request.limit,
            "with_payload": true,
        });
        if let Some(filter) = request.filter.as_ref().filter(|f| !f.is_empty()) {
            body["filter"] = filter.to_qdrant();
        }
        if let Some(min_score) = request.min_score {
            body["score_threshold"] = json!(min_score);
        }

        let hits: Vec<RawScoredPoint> = self
            .send(
                self.request(
                    Method::POST,
                    &format!("/collections/{}/points/search", collection),
                )
                .json(&body),
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| ScoredPoint {
                id: id_to_string(hit.id),
                score: hit.score,
                payload: hit.payload.unwrap_or_default(),
            })
            .collect())
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&PayloadFilter>,
        limit: usize,
    ) -> Result<Vec<PointRecord>, VectorStoreError> {
        let mut records = Vec::new();
        let mut offset = Value::Null;

        // Follow next_page_offset until the limit is met or pages run out
        while records.len() < limit {
            let mut body = json!({
                "limit": (limit - records.len()).min(SCROLL_PAGE_SIZE),
                "offset": offset,
                "with_payload": true,
                "with_vector": false,
            });
            if let Some(filter) = filter.filter(|f| !f.is_empty()) {
                body["filter"] = filter.to_qdrant();
            }

            let page: ScrollResult = self
                .send(
                    self.request(
                        Method::POST,
                        &format!("/collections/{}/points/scroll", collection),
                    )
                    .json(&body),
                )
                .await?;

            records.extend(page.points.into_iter().map(|record| PointRecord {
                id: id_to_string(record.id),
                payload: record.payload.unwrap_or_default(),
            }));

            match page.next_page_offset {
                Some(next) if !next.is_null() => offset = next,
                _ => break,
            }
        }

        records.truncate(limit);
        Ok(records)
    }

    async fn count(
        &self,
        collection: &str,
        filter: Option<&PayloadFilter>,
    ) -> Result<u64, VectorStoreError> {
        let mut body = json!({ "exact": true });
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            body["filter"] = filter.to_qdrant();
        }

        let result: CountResult = self
            .send(
                self.request(
                    Method::POST,
                    &format!("/collections/{}/points/count", collection),
                )
                .json(&body),
            )
            .await?;

        Ok(result.count)
    }

    async fn health_check(&self) -> Result<(), VectorStoreError> {
        self.send_raw(self.request(Method::GET, "/healthz")).await?;
        Ok(())
    }
}
