//! FastEmbed embedding provider.
//!
//! Runs sentence-transformer models locally through the `fastembed` crate.
//! The default model, `all-minilm-l6-v2`, produces 384-dimensional vectors.
//!
//! # Thread Safety
//!
//! `fastembed::TextEmbedding` is not `Sync`, so it lives behind
//! `Arc<Mutex<>>` and every call runs on `tokio::task::spawn_blocking`.
//!
//! # Feature Gate
//!
//! This module requires the `fastembed` feature.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lifelog_core::{Error, Result};

use crate::embedding::EmbeddingProvider;

const PROVIDER: &str = "fastembed";

/// Map a model name string to a fastembed `EmbeddingModel` enum variant.
fn resolve_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" | "AllMiniLML6V2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" | "BGESmallENV15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" | "BGEBaseENV15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        other => Err(Error::config(format!(
            "Unknown embedding model: '{other}'. Supported: all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5"
        ))),
    }
}

/// FastEmbed-based embedding provider.
///
/// The model is downloaded on first use (into `cache_path` when given) and
/// kept loaded for the provider's lifetime.
pub struct FastEmbedProvider {
    model: Arc<Mutex<fastembed::TextEmbedding>>,
    dimension: usize,
    model_name: String,
}

impl FastEmbedProvider {
    /// Load `model_name`, probing its output dimension.
    pub fn new(model_name: &str, cache_path: Option<&str>) -> Result<Self> {
        let mut init = fastembed::InitOptions::new(resolve_model(model_name)?);
        if let Some(path) = cache_path {
            init = init.with_cache_dir(std::path::PathBuf::from(path));
        }

        let mut text_embedding = fastembed::TextEmbedding::try_new(init)
            .map_err(|e| Error::embedding(PROVIDER, format!("model init failed: {e}")))?;

        let dimension = text_embedding
            .embed(vec!["dimension probe"], None)
            .map_err(|e| Error::embedding(PROVIDER, format!("dimension probe failed: {e}")))?
            .first()
            .map(Vec::len)
            .ok_or_else(|| Error::embedding(PROVIDER, "dimension probe returned nothing"))?;

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            dimension,
            model_name: model_name.to_string(),
        })
    }

    /// Embed owned texts on the blocking pool.
    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| Error::embedding(PROVIDER, format!("model lock poisoned: {e}")))?;
            model
                .embed(texts, None)
                .map_err(|e| Error::embedding(PROVIDER, e.to_string()))
        })
        .await
        .map_err(|e| Error::embedding(PROVIDER, format!("blocking task failed: {e}")))?
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding(PROVIDER, "no embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(texts.iter().map(|t| t.to_string()).collect()).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
