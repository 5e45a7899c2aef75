//! Domain types shared across the ingestion and retrieval crates.

use serde::{Deserialize, Serialize};

/// Free-form metadata attached to documents, chunks and stored vectors.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A chunk of a source document that is independently embedded and indexed.
///
/// `chunk_index` values for one document are dense: exactly `0..total-1` in
/// lexical document order. `metadata` is a superset of the parent document's
/// metadata plus `paper_id`, `chunk_index`, `total_chunks` and `chunk_text`
/// (the chunk's own text, stored for retrieval-time display).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub chunk_index: usize,
    pub metadata: Metadata,
}

/// Enriched search result, derived from a store hit at query time.
/// Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMatch {
    pub paper_id: String,
    pub paper_title: String,
    pub chunk_text: String,
    pub chunk_index: usize,
    pub similarity_score: f32,
    pub metadata: Metadata,
}

/// Read a string field out of a metadata map, with a fallback.
pub fn metadata_str<'a>(metadata: &'a Metadata, key: &str, default: &'a str) -> &'a str {
    metadata
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
}

/// Read an unsigned integer field out of a metadata map, defaulting to 0.
pub fn metadata_usize(metadata: &Metadata, key: &str) -> usize {
    metadata
        .get(key)
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_accessors() {
        let mut meta = Metadata::new();
        meta.insert("title".to_string(), json!("Attention Is All You Need"));
        meta.insert("chunk_index".to_string(), json!(3));

        assert_eq!(
            metadata_str(&meta, "title", "Untitled"),
            "Attention Is All You Need"
        );
        assert_eq!(metadata_str(&meta, "missing", "Untitled"), "Untitled");
        assert_eq!(metadata_usize(&meta, "chunk_index"), 3);
        assert_eq!(metadata_usize(&meta, "missing"), 0);
    }
}
