//! Embedding generation.
//!
//! [`Embedder`] is the handle the pipelines use. It is built once from
//! configuration and shared; every vector it hands out has the configured
//! width and unit length, for documents and queries alike.

pub mod config;
pub mod pooling;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use codexplain_core::{AppError, AppResult};
use futures::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;

/// Shared embedding handle enforcing width and normalization.
#[derive(Debug, Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimensions: usize) -> Self {
        Self {
            provider,
            dimensions,
        }
    }

    /// Build the provider described by `config`.
    pub fn from_config(config: &EmbeddingConfig) -> AppResult<Self> {
        let provider = create_provider(config)?;
        tracing::debug!(
            "Embedder ready: provider={}, model={}, dimensions={}",
            provider.provider_name(),
            provider.model_name(),
            config.dimensions
        );
        Ok(Self::new(provider, config.dimensions))
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed one text.
    ///
    /// # Errors
    /// `AppError::Embedding` when the provider fails or returns a vector
    /// whose length differs from the configured dimensions.
    pub async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vector = self.provider.embed(text).await.map_err(as_embedding_error)?;

        if vector.len() != self.dimensions {
            return Err(AppError::Embedding(format!(
                "Expected {} dimensions from '{}', got {}",
                self.dimensions,
                self.provider.model_name(),
                vector.len()
            )));
        }

        pooling::l2_normalize(&mut vector);
        Ok(vector)
    }

    /// Embed many texts, at most `concurrency` in flight. Output order
    /// matches input order; the first failure aborts the whole call.
    pub async fn embed_all(&self, texts: &[String], concurrency: usize) -> AppResult<Vec<Vec<f32>>> {
        stream::iter(texts.iter().enumerate())
            .map(|(i, text)| async move {
                tracing::debug!("Embedding chunk {}/{}", i + 1, texts.len());
                self.embed(text).await
            })
            .buffered(concurrency.max(1))
            .try_collect()
            .await
    }
}

fn as_embedding_error(err: AppError) -> AppError {
    match err {
        AppError::Embedding(_) => err,
        other => AppError::Embedding(other.to_string()),
    }
}
