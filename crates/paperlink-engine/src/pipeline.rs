//! Ingestion pipeline: document -> chunks -> vectors -> store.
//!
//! Failures are isolated per document: one paper failing never aborts the
//! ingestion of its siblings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use paperlink_core::processor::DocumentProcessor;
use paperlink_core::types::Metadata;
use paperlink_embed::Embedder;
use paperlink_store::{VectorRecord, VectorStore};

/// File extensions eligible for directory ingestion.
const INGESTIBLE_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

/// Per-file outcome of a batch ingestion, in processing order.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub statuses: Vec<(PathBuf, bool)>,
}

impl IngestReport {
    pub fn record(&mut self, path: PathBuf, ok: bool) {
        self.statuses.push((path, ok));
    }

    pub fn total(&self) -> usize {
        self.statuses.len()
    }

    pub fn successful(&self) -> usize {
        self.statuses.iter().filter(|(_, ok)| *ok).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.successful()
    }

    pub fn failed_paths(&self) -> impl Iterator<Item = &Path> {
        self.statuses
            .iter()
            .filter(|(_, ok)| !*ok)
            .map(|(path, _)| path.as_path())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    pub fn merge(&mut self, other: IngestReport) {
        self.statuses.extend(other.statuses);
    }
}

/// End-to-end pipeline for ingesting papers into the vector store.
///
/// The embedder and store handles are shared, long-lived resources built
/// once in the composition root.
pub struct IngestionPipeline {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    processor: DocumentProcessor,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        processor: DocumentProcessor,
    ) -> Self {
        Self {
            store,
            embedder,
            processor,
        }
    }

    /// Validate the collection configuration against the embedder's
    /// dimension. Idempotent; the store creates the collection implicitly
    /// on first write.
    pub async fn initialize_collection(&self) -> Result<()> {
        self.store
            .ensure_collection(self.embedder.dim(), "cosine")
            .await?;
        info!("collection ready (dim={})", self.embedder.dim());
        Ok(())
    }

    /// Ingest one paper. Returns `true` only if every chunk was embedded
    /// and the upsert succeeded; all intermediate errors are logged and
    /// reported as failure for this document only.
    pub async fn ingest_single_paper(
        &self,
        file_path: &Path,
        paper_id: Option<String>,
        metadata: Metadata,
    ) -> bool {
        let paper_id = paper_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        match self.try_ingest(file_path, &paper_id, metadata).await {
            Ok(chunk_count) => {
                info!(
                    "successfully ingested {chunk_count} chunks from {}",
                    file_path.display()
                );
                true
            }
            Err(e) => {
                error!("failed to ingest {}: {e}", file_path.display());
                false
            }
        }
    }

    async fn try_ingest(
        &self,
        file_path: &Path,
        paper_id: &str,
        mut metadata: Metadata,
    ) -> Result<usize> {
        metadata.insert(
            "file_path".to_string(),
            json!(file_path.display().to_string()),
        );
        metadata.insert(
            "file_name".to_string(),
            json!(file_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()),
        );

        info!("ingesting paper {paper_id}: {}", file_path.display());

        let chunks = self.processor.process_document(file_path, paper_id, metadata);
        if chunks.is_empty() {
            // Fail before touching the store.
            bail!("no chunks created for {}", file_path.display());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;

        // Chunking and batch embedding both preserve input order, so the
        // positional pairing below is what keeps vectors attached to the
        // right chunk text. Reordering either side corrupts the store.
        if embeddings.len() != chunks.len() {
            bail!(
                "embedding count {} does not match chunk count {}",
                embeddings.len(),
                chunks.len()
            );
        }

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, vector)| VectorRecord {
                id: format!("{paper_id}_chunk_{}", chunk.chunk_index),
                vector,
                metadata: chunk.metadata.clone(),
            })
            .collect();

        self.store.upsert(&records).await?;
        Ok(records.len())
    }

    /// Ingest every eligible file directly inside `directory` (no
    /// recursion, no glob: a plain listing sorted lexically for
    /// deterministic order). Continues past per-file failures.
    pub async fn ingest_from_directory(
        &self,
        directory: &Path,
        metadata_extractor: Option<&(dyn Fn(&Path) -> Metadata + Sync)>,
    ) -> IngestReport {
        let mut report = IngestReport::default();

        if !directory.is_dir() {
            error!("directory does not exist: {}", directory.display());
            return report;
        }

        let mut files: Vec<PathBuf> = WalkDir::new(directory)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|s| s.to_str())
                    .map(|ext| {
                        INGESTIBLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                    })
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        info!(
            "found {} files for ingestion in {}",
            files.len(),
            directory.display()
        );

        for file_path in files {
            let metadata = match metadata_extractor {
                Some(extract) => extract(&file_path),
                None => default_file_metadata(&file_path),
            };
            let ok = self
                .ingest_single_paper(&file_path, None, metadata)
                .await;
            report.record(file_path, ok);
        }

        if report.failed() > 0 {
            warn!(
                "ingestion complete: {}/{} papers successful",
                report.successful(),
                report.total()
            );
        } else {
            info!(
                "ingestion complete: {}/{} papers successful",
                report.successful(),
                report.total()
            );
        }
        report
    }
}

/// Default metadata for a file ingested without an explicit extractor.
pub fn default_file_metadata(path: &Path) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(
        "title".to_string(),
        json!(path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()),
    );
    metadata.insert("source".to_string(), json!("local_file"));
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts() {
        let mut report = IngestReport::default();
        report.record(PathBuf::from("a.txt"), true);
        report.record(PathBuf::from("b.txt"), false);
        report.record(PathBuf::from("c.pdf"), true);

        assert_eq!(report.total(), 3);
        assert_eq!(report.successful(), 2);
        assert_eq!(report.failed(), 1);
        assert!(!report.all_succeeded());
        let failed: Vec<_> = report.failed_paths().collect();
        assert_eq!(failed, vec![Path::new("b.txt")]);
    }

    #[test]
    fn default_metadata_uses_file_stem() {
        let metadata = default_file_metadata(Path::new("/papers/attention.pdf"));
        assert_eq!(metadata["title"], json!("attention"));
        assert_eq!(metadata["source"], json!("local_file"));
    }
}
