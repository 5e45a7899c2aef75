//! Retrieval engine: semantic, related-paper and contradiction search.
//!
//! Stateless across calls; holds only the shared embedder and store
//! handles. Store failures are logged here and degraded to empty result
//! sets, so the gateway's typed errors never cross the engine boundary.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info, warn};

use paperlink_core::config::Settings;
use paperlink_core::types::{metadata_str, metadata_usize, Metadata, SearchMatch};
use paperlink_embed::Embedder;
use paperlink_store::{StoreHit, VectorStore};

pub struct SearchEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    default_top_k: usize,
    default_threshold: f32,
}

impl SearchEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        settings: &Settings,
    ) -> Self {
        Self {
            store,
            embedder,
            default_top_k: settings.top_k_results,
            default_threshold: settings.similarity_threshold,
        }
    }

    /// Semantic search: embed the query, ask the store for `top_k` hits,
    /// then drop hits under the similarity threshold client-side (the
    /// store has no score-cutoff concept). Store order is preserved;
    /// sub-threshold entries are removed in place with no re-sort.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        min_similarity: Option<f32>,
        filter: Option<&Metadata>,
    ) -> Vec<SearchMatch> {
        let k = top_k.unwrap_or(self.default_top_k);
        let threshold = min_similarity.unwrap_or(self.default_threshold);

        info!("searching for: '{query}'");

        let query_embedding = match self.embedder.embed_text(query) {
            Ok(v) => v,
            Err(e) => {
                error!("failed to embed query: {e}");
                return Vec::new();
            }
        };

        let raw_hits = match self.store.search(&query_embedding, k, filter).await {
            Ok(hits) => hits,
            Err(e) => {
                error!("store search failed: {e}");
                return Vec::new();
            }
        };

        let matches: Vec<SearchMatch> = raw_hits
            .into_iter()
            .filter(|hit| hit.score >= threshold)
            .map(hit_to_match)
            .collect();

        info!("found {} matches above threshold {threshold}", matches.len());
        matches
    }

    /// Find papers related to `paper_id`, using the stored vector of its
    /// first chunk as the query. Over-fetches 3x to compensate for the
    /// same-paper and duplicate-paper filtering; returns at most one match
    /// per distinct related paper and never the seed paper itself.
    pub async fn find_related_papers(&self, paper_id: &str, top_k: usize) -> Vec<SearchMatch> {
        let vector_id = format!("{paper_id}_chunk_0");

        let point = match self.store.fetch_point(&vector_id).await {
            Ok(Some(point)) => point,
            Ok(None) => {
                warn!("paper {paper_id} not found");
                return Vec::new();
            }
            Err(e) => {
                error!("failed to fetch {vector_id}: {e}");
                return Vec::new();
            }
        };

        let raw_hits = match self.store.search(&point.vector, top_k * 3, None).await {
            Ok(hits) => hits,
            Err(e) => {
                error!("store search failed: {e}");
                return Vec::new();
            }
        };

        let mut matches = Vec::new();
        let mut seen_papers: HashSet<String> = HashSet::new();

        for hit in raw_hits {
            let hit_paper = metadata_str(&hit.metadata, "paper_id", "unknown").to_string();
            if hit_paper == paper_id || seen_papers.contains(&hit_paper) {
                continue;
            }
            seen_papers.insert(hit_paper);
            matches.push(hit_to_match(hit));
            if matches.len() >= top_k {
                break;
            }
        }

        info!("found {} related papers for {paper_id}", matches.len());
        matches
    }

    /// Heuristic contradiction search: a negation-augmented query is
    /// delegated to plain semantic search. This relies on the embedding
    /// space placing opposed statements near negated queries; it makes no
    /// claim of true logical contradiction.
    pub async fn find_contradictions(&self, query: &str, top_k: usize) -> Vec<SearchMatch> {
        info!("searching for contradictions to: '{query}'");
        self.search(&contradiction_query(query), Some(top_k), None, None)
            .await
    }

    /// Group matches by paper id, preserving encounter order for papers;
    /// within each group matches are sorted by descending similarity
    /// (stable, so ties keep their prior relative order).
    pub fn aggregate_results_by_paper(
        matches: &[SearchMatch],
    ) -> Vec<(String, Vec<SearchMatch>)> {
        let mut groups: Vec<(String, Vec<SearchMatch>)> = Vec::new();

        for m in matches {
            match groups.iter_mut().find(|(id, _)| id == &m.paper_id) {
                Some((_, group)) => group.push(m.clone()),
                None => groups.push((m.paper_id.clone(), vec![m.clone()])),
            }
        }

        for (_, group) in &mut groups {
            group.sort_by(|a, b| {
                b.similarity_score
                    .partial_cmp(&a.similarity_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        groups
    }

    /// Render matches for terminal display; pure presentation.
    pub fn format_results(matches: &[SearchMatch], max_text_length: usize) -> String {
        if matches.is_empty() {
            return "No results found.".to_string();
        }

        let mut output = Vec::new();
        output.push(format!("\nFound {} matches:\n", matches.len()));
        output.push("=".repeat(80));

        for (idx, m) in matches.iter().enumerate() {
            let text = if m.chunk_text.chars().count() > max_text_length {
                let truncated: String = m.chunk_text.chars().take(max_text_length).collect();
                format!("{truncated}...")
            } else {
                m.chunk_text.clone()
            };

            output.push(format!("\n{}. Paper: {}", idx + 1, m.paper_title));
            output.push(format!("   Paper ID: {}", m.paper_id));
            output.push(format!("   Similarity: {:.4}", m.similarity_score));
            output.push(format!("   Chunk {}:", m.chunk_index + 1));
            output.push(format!("   {text}"));
            output.push("-".repeat(80));
        }

        output.join("\n")
    }
}

/// Augment a query with negation cues for contradiction search.
pub fn contradiction_query(query: &str) -> String {
    format!("NOT {query} OR contrary OR opposite OR different from")
}

fn hit_to_match(hit: StoreHit) -> SearchMatch {
    SearchMatch {
        paper_id: metadata_str(&hit.metadata, "paper_id", "unknown").to_string(),
        paper_title: metadata_str(&hit.metadata, "title", "Untitled").to_string(),
        chunk_text: metadata_str(&hit.metadata, "chunk_text", "").to_string(),
        chunk_index: metadata_usize(&hit.metadata, "chunk_index"),
        similarity_score: hit.score,
        metadata: hit.metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_match(paper_id: &str, score: f32, text: &str) -> SearchMatch {
        SearchMatch {
            paper_id: paper_id.to_string(),
            paper_title: format!("Paper {paper_id}"),
            chunk_text: text.to_string(),
            chunk_index: 0,
            similarity_score: score,
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn contradiction_query_shape() {
        assert_eq!(
            contradiction_query("coffee improves memory"),
            "NOT coffee improves memory OR contrary OR opposite OR different from"
        );
    }

    #[test]
    fn hit_conversion_defaults() {
        let hit = StoreHit {
            id: "x_chunk_0".to_string(),
            score: 0.8,
            metadata: Metadata::new(),
        };
        let m = hit_to_match(hit);
        assert_eq!(m.paper_id, "unknown");
        assert_eq!(m.paper_title, "Untitled");
        assert_eq!(m.chunk_text, "");
        assert_eq!(m.chunk_index, 0);
    }

    #[test]
    fn hit_conversion_reads_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("paper_id".to_string(), json!("p7"));
        metadata.insert("title".to_string(), json!("Sleep and Memory"));
        metadata.insert("chunk_text".to_string(), json!("some text"));
        metadata.insert("chunk_index".to_string(), json!(4));

        let m = hit_to_match(StoreHit {
            id: "p7_chunk_4".to_string(),
            score: 0.66,
            metadata,
        });
        assert_eq!(m.paper_id, "p7");
        assert_eq!(m.paper_title, "Sleep and Memory");
        assert_eq!(m.chunk_index, 4);
    }

    #[test]
    fn aggregation_preserves_encounter_order_and_sorts_groups() {
        let matches = vec![
            sample_match("b", 0.5, "b low"),
            sample_match("a", 0.9, "a high"),
            sample_match("b", 0.8, "b high"),
            sample_match("a", 0.7, "a low"),
        ];

        let groups = SearchEngine::aggregate_results_by_paper(&matches);

        let keys: Vec<&str> = groups.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"], "encounter order for paper keys");

        for (_, group) in &groups {
            for pair in group.windows(2) {
                assert!(
                    pair[0].similarity_score >= pair[1].similarity_score,
                    "scores non-increasing within a group"
                );
            }
        }
        assert_eq!(groups[0].1[0].chunk_text, "b high");
    }

    #[test]
    fn aggregation_tie_keeps_prior_order() {
        let mut first = sample_match("a", 0.8, "first");
        first.chunk_index = 1;
        let mut second = sample_match("a", 0.8, "second");
        second.chunk_index = 2;

        let groups = SearchEngine::aggregate_results_by_paper(&[first, second]);
        assert_eq!(groups[0].1[0].chunk_text, "first");
        assert_eq!(groups[0].1[1].chunk_text, "second");
    }

    #[test]
    fn formatting_truncates_and_counts() {
        let long = sample_match("a", 0.91234, &"x".repeat(400));
        let rendered = SearchEngine::format_results(&[long], 300);
        assert!(rendered.contains("Found 1 matches"));
        assert!(rendered.contains("0.9123"));
        assert!(rendered.contains(&format!("{}...", "x".repeat(300))));

        assert_eq!(SearchEngine::format_results(&[], 300), "No results found.");
    }
}
