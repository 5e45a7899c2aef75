//! Document processing: cleaning and chunking.
//!
//! The default strategy packs whole paragraphs greedily into chunks close
//! to (but not over) a target character size. A fixed-size character window
//! with overlap is available as a fallback when paragraph structure is
//! absent or undesired.

use std::path::Path;

use serde_json::json;
use tracing::{info, warn};

use crate::config::Settings;
use crate::extract;
use crate::types::{DocumentChunk, Metadata};

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target maximum chunk size in characters. A single paragraph larger
    /// than this is kept whole, exceeding the bound.
    pub chunk_size: usize,
    /// Overlap in characters, used only by the fixed-window fallback.
    pub chunk_overlap: usize,
    /// Paragraphs at or below this length are discarded as noise
    /// (headers, stray numerals).
    pub min_paragraph_len: usize,
    /// Hard cap on paragraphs considered per document.
    pub max_paragraphs: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            min_paragraph_len: 50,
            max_paragraphs: 500,
        }
    }
}

impl ChunkingConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            min_paragraph_len: settings.min_paragraph_len,
            max_paragraphs: settings.max_paragraphs_per_paper,
        }
    }
}

/// Turns raw document text into ordered, metadata-carrying chunks.
#[derive(Default)]
pub struct DocumentProcessor {
    config: ChunkingConfig,
}

impl DocumentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Split cleaned text into paragraphs.
    ///
    /// Blank lines delimit paragraphs. Within a paragraph, runs of
    /// whitespace collapse to a single space; lines that are nothing but
    /// digits (page numbers) are dropped. Paragraphs at or below the
    /// minimum length are discarded.
    pub fn split_into_paragraphs(&self, text: &str) -> Vec<String> {
        let mut paragraphs = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                self.flush_paragraph(&mut current, &mut paragraphs);
            } else if is_page_number(line) {
                continue;
            } else {
                current.push(line);
            }
        }
        self.flush_paragraph(&mut current, &mut paragraphs);

        if paragraphs.len() > self.config.max_paragraphs {
            warn!(
                "truncating document from {} to {} paragraphs",
                paragraphs.len(),
                self.config.max_paragraphs
            );
            paragraphs.truncate(self.config.max_paragraphs);
        }

        paragraphs
    }

    fn flush_paragraph(&self, current: &mut Vec<&str>, out: &mut Vec<String>) {
        if current.is_empty() {
            return;
        }
        let joined = current.join(" ");
        let normalized = joined.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.len() > self.config.min_paragraph_len {
            out.push(normalized);
        }
        current.clear();
    }

    /// Split text into chunk strings in lexical document order.
    ///
    /// With `use_paragraphs`, consecutive paragraphs are packed greedily
    /// while the running length stays under `chunk_size`; otherwise a
    /// fixed character window with overlap is used.
    pub fn split_into_chunks(&self, text: &str, use_paragraphs: bool) -> Vec<String> {
        if use_paragraphs {
            self.pack_paragraphs(&self.split_into_paragraphs(text))
        } else {
            self.split_fixed_windows(text)
        }
    }

    fn pack_paragraphs(&self, paragraphs: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for para in paragraphs {
            if current.len() + para.len() < self.config.chunk_size {
                current.push_str(para);
                current.push_str("\n\n");
            } else {
                if !current.is_empty() {
                    chunks.push(current.trim().to_string());
                }
                current = format!("{para}\n\n");
            }
        }
        if !current.is_empty() {
            chunks.push(current.trim().to_string());
        }

        chunks
    }

    fn split_fixed_windows(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }
        // Overlap >= size would stall the window.
        let step = self
            .config
            .chunk_size
            .saturating_sub(self.config.chunk_overlap)
            .max(1);

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.config.chunk_size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            if !chunk.trim().is_empty() {
                chunks.push(chunk);
            }
            start += step;
        }
        chunks
    }

    /// Full pipeline for one file: extract, clean, chunk, attach metadata.
    ///
    /// An unreadable or empty source yields an empty chunk sequence, not an
    /// error; the caller decides whether zero chunks is an ingestion
    /// failure.
    pub fn process_document(
        &self,
        file_path: &Path,
        paper_id: &str,
        metadata: Metadata,
    ) -> Vec<DocumentChunk> {
        info!("processing document: {}", file_path.display());

        let raw_text = extract::extract_text(file_path);
        if raw_text.trim().is_empty() {
            warn!("no text extracted from {}", file_path.display());
            return Vec::new();
        }

        let chunks = self.process_text(&raw_text, paper_id, metadata);
        info!(
            "created {} chunks from {}",
            chunks.len(),
            file_path.display()
        );
        chunks
    }

    /// Same as [`process_document`](Self::process_document) but starting
    /// from already-extracted raw text.
    pub fn process_text(
        &self,
        raw_text: &str,
        paper_id: &str,
        base_metadata: Metadata,
    ) -> Vec<DocumentChunk> {
        let chunk_texts = self.split_into_chunks(raw_text, true);
        let total_chunks = chunk_texts.len();

        chunk_texts
            .into_iter()
            .enumerate()
            .map(|(idx, text)| {
                let mut metadata = base_metadata.clone();
                metadata.insert("paper_id".to_string(), json!(paper_id));
                metadata.insert("chunk_index".to_string(), json!(idx));
                metadata.insert("total_chunks".to_string(), json!(total_chunks));
                // Stored so hits can be displayed without refetching the file.
                metadata.insert("chunk_text".to_string(), json!(text));
                DocumentChunk {
                    text,
                    chunk_index: idx,
                    metadata,
                }
            })
            .collect()
    }
}

fn is_page_number(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}
