//! HTTP client for the Endee vector database.
//!
//! Endee OSS exposes a small JSON API under `/api/v1`:
//! `GET /health`, `PUT /points` (upsert), `POST /search`,
//! `GET /points/{id}`, `DELETE /index/{name}`. Indexes are created
//! implicitly on first write. The client owns exactly one logical
//! collection.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use paperlink_core::config::Settings;
use paperlink_core::types::Metadata;

use crate::types::{PointRecord, StoreError, StoreHit, VectorRecord, VectorStore};

/// Endee rejects oversized payloads; writes go out in batches of this size.
pub const UPSERT_BATCH_SIZE: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct EndeeClient {
    http: reqwest::Client,
    base_url: String,
    collection: String,
}

#[derive(Serialize)]
struct UpsertPayload<'a> {
    index: &'a str,
    points: &'a [VectorRecord],
}

#[derive(Serialize)]
struct SearchPayload<'a> {
    index: &'a str,
    vector: &'a [f32],
    k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Metadata>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<StoreHit>,
}

impl EndeeClient {
    pub fn new(
        base_url: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let base_url = base_url.into();
        let collection = collection.into();
        if collection.is_empty() {
            return Err(StoreError::Config("collection name must not be empty".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        info!("initialized Endee client: {base_url} (collection={collection})");
        Ok(Self {
            http,
            base_url,
            collection,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, StoreError> {
        Self::new(settings.endee_base_url(), settings.endee_collection.clone())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn put_batch(&self, points: &[VectorRecord]) -> Result<(), StoreError> {
        let url = format!("{}/api/v1/points", self.base_url);
        let payload = UpsertPayload {
            index: &self.collection,
            points,
        };

        let response = self
            .http
            .put(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 200 || status.as_u16() == 201 {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl VectorStore for EndeeClient {
    async fn ensure_collection(&self, dimension: usize, metric: &str) -> Result<(), StoreError> {
        if dimension == 0 {
            return Err(StoreError::Config(
                "collection dimension must be positive".into(),
            ));
        }
        // Endee creates the index implicitly on first write; nothing to do
        // server-side, and repeating this call changes nothing.
        debug!(
            "collection {} ready (dim={dimension}, metric={metric}, created implicitly)",
            self.collection
        );
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), StoreError> {
        let mut written = 0usize;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            if let Err(e) = self.put_batch(batch).await {
                error!(
                    "upsert failed after {written}/{} records: {e}",
                    records.len()
                );
                if written > 0 {
                    return Err(StoreError::PartialWrite {
                        written,
                        remaining: records.len() - written,
                        source: Box::new(e),
                    });
                }
                return Err(e);
            }
            written += batch.len();
        }
        info!("successfully upserted {written} vectors");
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<StoreHit>, StoreError> {
        let url = format!("{}/api/v1/search", self.base_url);
        let payload = SearchPayload {
            index: &self.collection,
            vector: query_vector,
            k: top_k,
            filter,
        };

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("search transport error: {e}");
                StoreError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            error!("search failed [{status}]: {body}");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| StoreError::MalformedResponse(e.to_string()))?;
        Ok(parsed.results)
    }

    async fn fetch_point(&self, id: &str) -> Result<Option<PointRecord>, StoreError> {
        let url = format!("{}/api/v1/points/{id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("index", self.collection.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        match status.as_u16() {
            200 => {
                let record: PointRecord = response
                    .json()
                    .await
                    .map_err(|e| StoreError::MalformedResponse(e.to_string()))?;
                Ok(Some(record))
            }
            404 => Ok(None),
            code => {
                let body = response.text().await.unwrap_or_default();
                error!("fetch point {id} failed [{code}]: {body}");
                Err(StoreError::Status { status: code, body })
            }
        }
    }

    async fn delete_collection(&self) -> Result<(), StoreError> {
        let url = format!("{}/api/v1/index/{}", self.base_url, self.collection);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        // 404 means the collection was already absent: same end state.
        match response.status().as_u16() {
            200 | 204 | 404 => {
                info!("deleted collection {}", self.collection);
                Ok(())
            }
            code => {
                let body = response.text().await.unwrap_or_default();
                error!("delete collection failed [{code}]: {body}");
                Err(StoreError::Status { status: code, body })
            }
        }
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/v1/health", self.base_url);
        match self.http.get(&url).send().await {
            Ok(response) => response.status().as_u16() == 200,
            Err(e) => {
                error!("health check failed: {e}");
                false
            }
        }
    }
}
