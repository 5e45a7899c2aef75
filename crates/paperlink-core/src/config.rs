//! Configuration loader and path helpers.
//!
//! Uses Figment to merge defaults + `paperlink.toml` + `paperlink.<env>.toml`
//! + `PAPERLINK_*` env vars into a typed [`Settings`]. Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a base
//! directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Application settings.
///
/// Every field has a default, so a missing config file is not an error;
/// individual keys can be overridden by `paperlink.toml` or `PAPERLINK_*`
/// environment variables (e.g. `PAPERLINK_ENDEE_HOST`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Endee vector database
    pub endee_host: String,
    pub endee_port: u16,
    pub endee_collection: String,
    /// Must match the embedding model output (all-MiniLM-L6-v2 -> 384).
    pub endee_dimension: usize,

    // Embedding model
    pub embedding_model: String,
    pub embedding_batch_size: usize,
    /// Local snapshot directory holding tokenizer.json + weights.
    /// Falls back to `PAPERLINK_MODEL_DIR` / `MODEL_DIR` when unset.
    pub model_dir: Option<String>,

    // Document processing
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_paragraph_len: usize,
    pub max_paragraphs_per_paper: usize,

    // Search
    pub top_k_results: usize,
    pub similarity_threshold: f32,

    // Optional LLM summarization
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub use_llm_summarization: bool,
    pub llm_provider: String,
    pub llm_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endee_host: "localhost".to_string(),
            endee_port: 3000,
            endee_collection: "research_papers".to_string(),
            endee_dimension: 384,
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            embedding_batch_size: 32,
            model_dir: None,
            chunk_size: 500,
            chunk_overlap: 50,
            min_paragraph_len: 50,
            max_paragraphs_per_paper: 500,
            top_k_results: 10,
            similarity_threshold: 0.5,
            openai_api_key: None,
            anthropic_api_key: None,
            use_llm_summarization: false,
            llm_provider: "openai".to_string(),
            llm_model: "gpt-3.5-turbo".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let env_name = env::var("PAPERLINK_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("paperlink.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("paperlink.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("paperlink.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("paperlink.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("PAPERLINK_"));

        let settings: Settings = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn endee_base_url(&self) -> String {
        format!("http://{}:{}", self.endee_host, self.endee_port)
    }

    fn validate(&self) -> Result<()> {
        if self.endee_host.is_empty() {
            return Err(Error::InvalidConfig("endee_host must not be empty".into()));
        }
        if self.endee_port == 0 {
            return Err(Error::InvalidConfig("endee_port must be positive".into()));
        }
        if self.endee_dimension == 0 {
            return Err(Error::InvalidConfig(
                "endee_dimension must be positive".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after
/// expansion. If `p` is absolute it is returned as-is.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
