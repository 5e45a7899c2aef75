//! Ingestion and retrieval engine for paperlink.
//!
//! ```text
//! Document -> DocumentProcessor -> Embedder -> VectorStore
//!                                                  |
//! Query -> Embedder -> SearchEngine <--------------+
//!                          |
//!                   ranked SearchMatches -> (optional) LlmSummarizer
//! ```
//!
//! [`IngestionPipeline`] composes the chunker, embedder and store gateway
//! to persist documents; [`SearchEngine`] answers semantic, related-paper
//! and contradiction queries over the same store.

pub mod pipeline;
pub mod search;
pub mod summarize;

pub use pipeline::{default_file_metadata, IngestReport, IngestionPipeline};
pub use search::{contradiction_query, SearchEngine};
pub use summarize::{LlmProvider, LlmSummarizer};
