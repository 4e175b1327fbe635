//! Semantic similarity between a student's free text and the catalogue.
//!
//! The provider is an external collaborator: any failure (network, quota,
//! missing key) means "no embedding available" and the ranking carries on
//! without semantic scores. Query embeddings are cached by normalized-text
//! prefix in a bounded LRU so repeated searches don't re-hit the provider.

pub mod cache;
pub mod index;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

pub use cache::QueryCache;
pub use index::EmbeddingIndex;
pub use openai::OpenAiEmbedding;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("embedding API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("embedding API returned no vectors")]
    EmptyResponse,
    #[error("invalid input text: {0}")]
    InvalidInput(String),
    #[error("embedding provider misconfigured: {0}")]
    Config(String),
}

pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Anything that can turn text into a vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

/// Provider plus query cache, as used by a search.
pub struct QueryEmbedder {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    cache: QueryCache,
}

impl QueryEmbedder {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>, cache: QueryCache) -> Self {
        Self { provider, cache }
    }

    /// An embedder that never produces vectors.
    pub fn disabled() -> Self {
        Self::new(None, QueryCache::new(0, 1))
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Embedding for `text`, from cache when possible. `None` on any failure.
    pub async fn embed_query(&self, text: &str) -> Option<Arc<Vec<f32>>> {
        let provider = self.provider.as_ref()?;
        let normalized = cache::normalize_query(text);
        if normalized.is_empty() {
            return None;
        }

        let key = self.cache.key_for(&normalized);
        if let Some(hit) = self.cache.get(&key) {
            debug!(key_len = key.len(), "query embedding cache hit");
            return Some(hit);
        }
        debug!(key_len = key.len(), "query embedding cache miss");

        match provider.embed(&normalized).await {
            Ok(vector) if !vector.is_empty() => {
                let vector = Arc::new(vector);
                self.cache.insert(key, vector.clone());
                Some(vector)
            }
            Ok(_) => {
                warn!(model = provider.model_name(), "provider returned an empty embedding");
                None
            }
            Err(e) => {
                warn!(
                    model = provider.model_name(),
                    error = %e,
                    "embedding unavailable, ranking without semantic scores"
                );
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Returns a fixed vector and counts calls.
    pub struct CountingProvider {
        pub vector: Vec<f32>,
        pub calls: AtomicUsize,
    }

    impl CountingProvider {
        pub fn new(vector: Vec<f32>) -> Self {
            Self {
                vector,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed(&self, _text: &str) -> EmbeddingResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector.clone())
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    /// Always fails.
    pub struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        async fn embed(&self, _text: &str) -> EmbeddingResult<Vec<f32>> {
            Err(EmbeddingError::Config("no API key".into()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }
}
