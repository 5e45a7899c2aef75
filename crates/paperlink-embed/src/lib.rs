//! Sentence embeddings for paperlink.
//!
//! The real provider runs all-MiniLM-L6-v2 (384-dim) locally through
//! candle, loaded once from a pinned snapshot directory. Model
//! initialization is expensive, so one instance is built in the
//! composition root and shared. A deterministic hash-based fake embedder
//! with the same shape is available for tests and offline runs, selected
//! via `PAPERLINK_USE_FAKE_EMBEDDINGS`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::info;

use paperlink_core::config::Settings;

mod device;
mod pool;
mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

/// Text embedding provider. One instance per process; `&self` methods are
/// safe to share behind an [`Arc`].
pub trait Embedder: Send + Sync {
    /// Output dimension, fixed for the lifetime of the instance.
    fn dim(&self) -> usize;

    fn model_name(&self) -> &str;

    fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts, preserving input order and length. Empty input
    /// yields empty output.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }

    /// Cosine similarity between two vectors produced by this provider.
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }
}

/// Cosine similarity in `[-1, 1]`; 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

const MAX_TOKENS: usize = 256;

/// all-MiniLM-L6-v2 via candle, loaded from a local snapshot directory
/// (tokenizer.json + config.json + model.safetensors or pytorch_model.bin).
pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: candle_core::Device,
    dim: usize,
    model_name: String,
    batch_size: usize,
}

impl SentenceEmbedder {
    /// Load the model once. Missing snapshot or malformed weights are fatal
    /// here: the system cannot operate without an embedding space.
    pub fn load(settings: &Settings) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(settings)?;
        info!("loading embedding model from {}", model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            anyhow!(
                "failed to load tokenizer from {}: {}",
                tokenizer_path.display(),
                e
            )
        })?;

        let config_path = model_dir.join("config.json");
        let config: BertConfig =
            serde_json::from_str(&std::fs::read_to_string(&config_path).with_context(|| {
                format!("failed to read model config {}", config_path.display())
            })?)?;

        let safetensors_path = model_dir.join("model.safetensors");
        let vb = if safetensors_path.exists() {
            // Safety: the snapshot file is mmapped read-only for the model's lifetime.
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors_path], DTYPE, &device)? }
        } else {
            let weights_path = model_dir.join("pytorch_model.bin");
            let weights = candle_core::pickle::read_all(&weights_path).with_context(|| {
                format!("failed to read model weights {}", weights_path.display())
            })?;
            VarBuilder::from_tensors(weights.into_iter().collect(), DTYPE, &device)
        };

        let model = BertModel::load(vb, &config)?;
        let dim = config.hidden_size;
        info!("embedding model loaded (dim={dim})");

        Ok(Self {
            model,
            tokenizer,
            device,
            dim,
            model_name: settings.embedding_model.clone(),
            batch_size: settings.embedding_batch_size.max(1),
        })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) =
            tokenize_on_device(&self.tokenizer, text, MAX_TOKENS, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let embedding: Vec<f32> = pooled
            .to_device(&candle_core::Device::Cpu)?
            .squeeze(0)?
            .to_vec1()?;
        if embedding.len() != self.dim {
            return Err(anyhow!(
                "embedding dimension mismatch: got {}, expected {}",
                embedding.len(),
                self.dim
            ));
        }
        Ok(embedding)
    }
}

impl Embedder for SentenceEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            for text in batch {
                embeddings.push(self.embed_one(text)?);
            }
            info!(
                "embedded batch {} ({}/{} texts)",
                i + 1,
                embeddings.len(),
                texts.len()
            );
        }
        Ok(embeddings)
    }
}

/// Deterministic embedder for tests: hashes whitespace tokens into buckets
/// and L2-normalizes. Same input always yields the same vector.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        "fake-hash-embedder"
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

/// Build the process-wide embedder from settings.
///
/// `PAPERLINK_USE_FAKE_EMBEDDINGS=1` forces the deterministic fake (sized
/// to the configured store dimension) so tests and dry runs never touch
/// model weights.
pub fn default_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("PAPERLINK_USE_FAKE_EMBEDDINGS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        info!("using FakeEmbedder (dim={})", settings.endee_dimension);
        return Ok(Arc::new(FakeEmbedder::new(settings.endee_dimension)));
    }
    Ok(Arc::new(SentenceEmbedder::load(settings)?))
}

fn resolve_model_dir(settings: &Settings) -> Result<PathBuf> {
    if let Some(dir) = &settings.model_dir {
        let p = paperlink_core::config::expand_path(dir);
        if p.exists() {
            return Ok(p);
        }
        return Err(anyhow!("configured model_dir not found: {}", p.display()));
    }
    for var in ["PAPERLINK_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() {
                info!("using {var}: {}", p.display());
                return Ok(p);
            }
        }
    }
    for candidate in ["models/all-MiniLM-L6-v2", "../models/all-MiniLM-L6-v2"] {
        let p = Path::new(candidate);
        if p.exists() {
            info!("using model dir: {}", p.display());
            return Ok(p.to_path_buf());
        }
    }
    Err(anyhow!(
        "could not locate embedding model directory; set model_dir or PAPERLINK_MODEL_DIR"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_is_one() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = vec![0.3, -0.2, 0.9];
        let b = vec![-0.5, 0.1, 0.4];
        assert!((cosine_similarity(&a, &b) - cosine_similarity(&b, &a)).abs() < 1e-7);
    }

    #[test]
    fn cosine_zero_norm_is_zero() {
        let zero = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&zero, &b), 0.0);
        assert_eq!(cosine_similarity(&b, &zero), 0.0);
    }

    #[test]
    fn cosine_opposite_is_minus_one() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }
}
