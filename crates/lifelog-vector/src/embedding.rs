//! Embedding provider trait, mock implementation, and factory.
//!
//! The retrieval service only needs one thing from an embedder: a stable
//! vector dimension for every text of one corpus.
//!
//! # Providers
//!
//! - `MockEmbeddingProvider`: Deterministic hashed bag-of-words vectors
//! - `FastEmbedProvider`: Local embedding via fastembed (requires `fastembed` feature)

use std::sync::Arc;

use async_trait::async_trait;
use lifelog_core::{Error, Result};

use crate::types::EmbedderConfig;

/// Trait for generating text embeddings.
///
/// Implementations must be `Send + Sync` so one provider can be shared by
/// the retriever and any number of concurrent searches.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts, in input order.
    ///
    /// Default implementation calls `embed` for each text sequentially.
    /// Backends that support native batching should override this.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// The embedding dimension.
    fn dimension(&self) -> usize;

    /// The provider name for diagnostics.
    fn name(&self) -> &str;
}

/// A deterministic embedding provider for tests and offline use.
///
/// Each lowercase alphanumeric token is hashed into one of `dimension`
/// buckets and the resulting count vector is unit-normalized. Texts that
/// share words land close together; blank text maps to the zero vector.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    /// Create a new mock provider with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn bucket(&self, token: &str) -> usize {
        let hash = blake3::hash(token.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(prefix) % self.dimension as u64) as usize
    }

    fn hashed_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return embedding;
        }

        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            embedding[self.bucket(token)] += 1.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut embedding {
                *val /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.hashed_embedding(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.hashed_embedding(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Create the embedding provider named by `config.provider`.
///
/// # Errors
///
/// Returns [`Error::Config`] for an unknown provider, a zero mock
/// dimension, or `"fastembed"` when the `fastembed` feature is disabled.
pub fn create_embedding_provider(config: &EmbedderConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "mock" => {
            if config.dimension == 0 {
                return Err(Error::config("mock embedder dimension must be greater than zero"));
            }
            log::debug!("Using mock embedder (dimension {})", config.dimension);
            Ok(Arc::new(MockEmbeddingProvider::new(config.dimension)))
        }
        #[cfg(feature = "fastembed")]
        "fastembed" => {
            let provider =
                crate::fastembed::FastEmbedProvider::new(&config.model, config.cache_path.as_deref())?;
            log::info!(
                "Loaded fastembed model {} (dimension {})",
                config.model,
                provider.dimension()
            );
            Ok(Arc::new(provider))
        }
        #[cfg(not(feature = "fastembed"))]
        "fastembed" => Err(Error::config(
            "embedder provider 'fastembed' requires the `fastembed` feature",
        )),
        other => Err(Error::config(format!(
            "Unknown embedder provider: '{other}'. Supported: mock, fastembed"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
