//! Vector store gateway for paperlink.
//!
//! One logical collection of `(id, vector, metadata)` records behind the
//! [`VectorStore`] trait, implemented by the HTTP [`EndeeClient`]. The
//! gateway owns the authoritative copy of all vectors; everything else in
//! the system works on transient derived views.

pub mod endee;
pub mod types;

pub use endee::{EndeeClient, UPSERT_BATCH_SIZE};
pub use types::{PointRecord, StoreError, StoreHit, VectorRecord, VectorStore};
