//! Optional LLM summarization of search results.
//!
//! A lightweight add-on behind one call shape: the core system works
//! without it. Construction-time validation turns any missing credential
//! or unknown provider into a *disabled* summarizer whose calls return
//! `None`, so callers never branch on provider kind.

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use paperlink_core::config::Settings;
use paperlink_core::types::SearchMatch;

const MAX_SUMMARY_TOKENS: u32 = 500;
const MAX_CONTEXT_CHARS: usize = 2000;
const MAX_CONTEXT_RESULTS: usize = 5;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Supported completion backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    None,
}

impl LlmProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(LlmProvider::OpenAi),
            "anthropic" => Some(LlmProvider::Anthropic),
            "none" => Some(LlmProvider::None),
            _ => None,
        }
    }
}

pub struct LlmSummarizer {
    provider: LlmProvider,
    model: String,
    api_key: String,
    api_base: String,
    enabled: bool,
    http: Client,
}

impl LlmSummarizer {
    pub fn from_settings(settings: &Settings) -> Self {
        if !settings.use_llm_summarization {
            info!("LLM summarization disabled");
            return Self::disabled();
        }

        let provider = match LlmProvider::parse(&settings.llm_provider) {
            Some(p) => p,
            None => {
                warn!(
                    "unknown llm_provider '{}', disabling summarization",
                    settings.llm_provider
                );
                return Self::disabled();
            }
        };

        let api_key = match provider {
            LlmProvider::OpenAi => settings.openai_api_key.clone(),
            LlmProvider::Anthropic => settings.anthropic_api_key.clone(),
            LlmProvider::None => None,
        };

        match api_key {
            Some(key) if !key.is_empty() => {
                Self::new(provider, settings.llm_model.clone(), key)
            }
            _ => {
                if provider != LlmProvider::None {
                    warn!("no API key configured for {provider:?}, disabling summarization");
                }
                Self::disabled()
            }
        }
    }

    pub fn new(provider: LlmProvider, model: String, api_key: String) -> Self {
        let api_base = match provider {
            LlmProvider::OpenAi => "https://api.openai.com".to_string(),
            LlmProvider::Anthropic => "https://api.anthropic.com".to_string(),
            LlmProvider::None => String::new(),
        };
        let enabled = provider != LlmProvider::None;
        if enabled {
            info!("{provider:?} summarizer initialized (model={model})");
        }
        Self {
            provider,
            model,
            api_key,
            api_base,
            enabled,
            http: Client::new(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            provider: LlmProvider::None,
            model: String::new(),
            api_key: String::new(),
            api_base: String::new(),
            enabled: false,
            http: Client::new(),
        }
    }

    /// Point API calls at a different host (tests).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Summarize search results against the original query. `None` when
    /// disabled or when the provider call fails.
    pub async fn summarize_search_results(
        &self,
        query: &str,
        results: &[SearchMatch],
    ) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let context = prepare_context(results);
        let prompt = format!(
            "Based on the following research paper excerpts, provide a brief summary \
             addressing the query: \"{query}\"\n\nExcerpts:\n{context}\n\nSummary:"
        );
        self.complete(&prompt).await
    }

    /// Ask the provider to point out conflicting findings. Needs at least
    /// two results to have anything to compare.
    pub async fn identify_contradictions(&self, results: &[SearchMatch]) -> Option<String> {
        if !self.enabled || results.len() < 2 {
            return None;
        }

        let context = prepare_context(results);
        let prompt = format!(
            "Analyze these research paper excerpts and identify any contradictions \
             or conflicting findings:\n\n{context}\n\nAnalysis:"
        );
        self.complete(&prompt).await
    }

    async fn complete(&self, prompt: &str) -> Option<String> {
        match self.provider {
            LlmProvider::OpenAi => self.call_openai(prompt).await,
            LlmProvider::Anthropic => self.call_anthropic(prompt).await,
            LlmProvider::None => None,
        }
    }

    async fn call_openai(&self, prompt: &str) -> Option<String> {
        let url = format!("{}/v1/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a research assistant helping to summarize findings from academic papers."
                },
                {"role": "user", "content": prompt}
            ],
            "max_tokens": MAX_SUMMARY_TOKENS,
            "temperature": 0.7
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => {
                let v: Value = r.json().await.ok()?;
                v["choices"][0]["message"]["content"]
                    .as_str()
                    .map(str::to_string)
            }
            Ok(r) => {
                error!("OpenAI API error: status {}", r.status());
                None
            }
            Err(e) => {
                error!("OpenAI API error: {e}");
                None
            }
        }
    }

    async fn call_anthropic(&self, prompt: &str) -> Option<String> {
        let url = format!("{}/v1/messages", self.api_base);
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_SUMMARY_TOKENS,
            "messages": [{"role": "user", "content": prompt}]
        });

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => {
                let v: Value = r.json().await.ok()?;
                v["content"][0]["text"].as_str().map(str::to_string)
            }
            Ok(r) => {
                error!("Anthropic API error: status {}", r.status());
                None
            }
            Err(e) => {
                error!("Anthropic API error: {e}");
                None
            }
        }
    }
}

/// Build the excerpt block sent to the provider: at most
/// [`MAX_CONTEXT_RESULTS`] results, capped at [`MAX_CONTEXT_CHARS`]
/// characters overall.
fn prepare_context(results: &[SearchMatch]) -> String {
    let mut context_parts = Vec::new();
    let mut total_chars = 0;

    for (idx, result) in results.iter().take(MAX_CONTEXT_RESULTS).enumerate() {
        let excerpt = format!(
            "{}. From '{}':\n{}\n",
            idx + 1,
            result.paper_title,
            result.chunk_text
        );
        if total_chars + excerpt.len() > MAX_CONTEXT_CHARS {
            break;
        }
        total_chars += excerpt.len();
        context_parts.push(excerpt);
    }

    context_parts.join("\n")
}
