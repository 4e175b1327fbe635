//! Application state shared by every request handler.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::Config;
use crate::data::programs::Catalogue;
use crate::data::taxonomy::Taxonomy;
use crate::embedding::{EmbeddingProvider, OpenAiEmbedding, QueryCache, QueryEmbedder};
use crate::matching::Recommender;
use crate::roadmap::{OpenAiChat, TextGenerator};

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(recommender: Recommender, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            recommender: Arc::new(recommender),
            generator,
            started_at: Instant::now(),
        }
    }

    /// Load taxonomy and catalogue and construct upstream clients from `config`.
    ///
    /// Without an API key, embeddings and roadmap generation are disabled but
    /// ranking still works.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let taxonomy = Taxonomy::load(config.taxonomy_path.as_deref())
            .context("Failed to load taxonomy")?;
        let catalogue = Catalogue::from_path(&config.catalogue_path)
            .context("Failed to load program catalogue")?;
        if catalogue.is_empty() {
            warn!(path = %config.catalogue_path.display(), "Program catalogue is empty");
        }

        let cache = QueryCache::new(
            config.embedding_cache_capacity,
            config.scoring.cache_key_chars,
        );

        let (embedder, generator) = match config.api_key() {
            Some(key) => {
                let provider: Arc<dyn EmbeddingProvider> = Arc::new(
                    OpenAiEmbedding::new(
                        key,
                        &config.openai_base_url,
                        &config.embedding_model,
                        config.request_timeout,
                    )
                    .context("Failed to create embedding client")?,
                );
                let generator: Arc<dyn TextGenerator> = Arc::new(
                    OpenAiChat::new(
                        key,
                        &config.openai_base_url,
                        &config.generation_model,
                        config.request_timeout,
                    )
                    .context("Failed to create generation client")?,
                );
                info!(
                    embedding_model = %config.embedding_model,
                    generation_model = %config.generation_model,
                    "Upstream model clients configured"
                );
                (QueryEmbedder::new(Some(provider), cache), Some(generator))
            }
            None => {
                warn!("No OpenAI API key configured; semantic scores and roadmaps are disabled");
                (QueryEmbedder::new(None, cache), None)
            }
        };

        let recommender = Recommender::new(
            Arc::new(taxonomy),
            config.scoring.clone(),
            Arc::new(catalogue),
            embedder,
        );
        Ok(Self::new(recommender, generator))
    }
}
