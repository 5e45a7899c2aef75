//! Wire types and the store-facing trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use paperlink_core::types::Metadata;

/// A vector + metadata record to be persisted.
///
/// `id` is deterministically derived as `{paper_id}_chunk_{chunk_index}`,
/// so records are addressable without a side index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

/// A single search hit as returned by the store, ordered by descending
/// similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHit {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A stored point fetched by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointRecord {
    pub id: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Errors crossing the vector-store boundary.
///
/// "No matches" is an empty hit list, never an error; an error always means
/// the store could not be consulted, keeping the two conditions
/// distinguishable for callers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A multi-batch upsert failed partway. Earlier batches are NOT rolled
    /// back; `written` records are persisted, `remaining` are not.
    #[error("partial write: {written} records persisted, {remaining} not written")]
    PartialWrite {
        written: usize,
        remaining: usize,
        #[source]
        source: Box<StoreError>,
    },
}

/// Thin interface over one logical named collection of same-dimension
/// vectors.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent. The backing store creates collections implicitly on
    /// first write, so this validates configuration rather than issuing a
    /// create call.
    async fn ensure_collection(&self, dimension: usize, metric: &str) -> Result<(), StoreError>;

    /// Write records in bounded batches. A batch failure aborts the call;
    /// earlier batches stay written (see [`StoreError::PartialWrite`]).
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), StoreError>;

    /// Top-k similarity search, ordered by descending score as returned by
    /// the store.
    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<StoreHit>, StoreError>;

    /// Fetch one stored record by id; `None` when absent.
    async fn fetch_point(&self, id: &str) -> Result<Option<PointRecord>, StoreError>;

    /// Delete the whole collection. Deleting an absent collection is
    /// success.
    async fn delete_collection(&self) -> Result<(), StoreError>;

    /// Liveness probe only, not a content guarantee.
    async fn health_check(&self) -> bool;
}
