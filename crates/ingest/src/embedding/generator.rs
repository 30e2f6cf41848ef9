//! Prefixing, batching, and normalization on top of a raw [`Embedder`].

use std::sync::{Arc, Mutex};

use parentkb_core::config::EmbeddingConfig;
use tracing::{debug, info};

use super::cache::QueryCache;
use super::ollama::OllamaEmbedder;
use super::openai::OpenAiEmbedder;
use super::traits::{Embedder, EmbeddingError};

/// e5 models are trained with asymmetric prefixes; passages and queries
/// must never share one.
pub const PASSAGE_PREFIX: &str = "passage: ";
pub const QUERY_PREFIX: &str = "query: ";

/// Build the backend selected by `EMBEDDING_PROVIDER`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
            config.dimensions,
        ))),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(
            config.base_url.clone(),
            config.model.clone(),
            config.dimensions,
        ))),
        other => Err(EmbeddingError::UnknownProvider(other.to_string())),
    }
}

/// Turns passages and questions into unit-length vectors.
pub struct EmbeddingGenerator {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    query_cache: Mutex<QueryCache>,
}

impl EmbeddingGenerator {
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize, query_cache_size: usize) -> Self {
        Self {
            embedder,
            batch_size: batch_size.max(1),
            query_cache: Mutex::new(QueryCache::new(query_cache_size)),
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let embedder = create_embedder(config)?;
        Ok(Self::new(embedder, config.batch_size, config.query_cache_size))
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model()
    }

    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// One round trip to the backend to confirm the model answers with the
    /// configured dimensionality.
    pub async fn probe(&self) -> Result<(), EmbeddingError> {
        self.encode(vec![format!("{QUERY_PREFIX}probe")]).await?;
        info!(
            model = self.model_id(),
            dimensions = self.dimensions(),
            "embedding model available"
        );
        Ok(())
    }

    /// Embed document chunks. An empty slice never reaches the backend.
    pub async fn embed_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let inputs = batch
                .iter()
                .map(|t| format!("{PASSAGE_PREFIX}{t}"))
                .collect();
            vectors.extend(self.encode(inputs).await?);
        }
        debug!(count = vectors.len(), "embedded passages");
        Ok(vectors)
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let cached = self.cache().get(text);
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let mut vectors = self.encode(vec![format!("{QUERY_PREFIX}{text}")]).await?;
        let vector = vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            actual: 0,
        })?;
        self.cache().put(text, vector.clone());
        Ok(vector)
    }

    /// Query cache hits and misses since startup.
    pub fn cache_stats(&self) -> (u64, u64) {
        let cache = self.cache();
        (cache.hits(), cache.misses())
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, QueryCache> {
        self.query_cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn encode(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
        let mut vectors = self.embedder.embed_batch(&refs).await?;

        if vectors.len() != inputs.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: inputs.len(),
                actual: vectors.len(),
            });
        }
        let expected = self.embedder.dimensions();
        for v in vectors.iter_mut() {
            if v.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: v.len(),
                });
            }
            l2_normalize(v);
        }
        Ok(vectors)
    }
}

/// Scale `v` to unit length. The zero vector is left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
