//! Feature-extraction embeddings over HTTP.
//!
//! Talks to a text-embeddings-inference style server exposing
//! `POST /embed_all`, which returns one vector per token. Sentence vectors
//! are produced here by mean pooling and L2 normalization, the recipe
//! gte-small was trained for.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::pooling::{l2_normalize, mean_pool};
use crate::embeddings::provider::EmbeddingProvider;
use codexplain_core::{AppError, AppResult};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_FEATURE_EXTRACTION_URL: &str = "http://localhost:8080";

const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct EmbedAllRequest<'a> {
    inputs: &'a [String],
    truncate: bool,
}

/// Token-level feature extraction with client-side mean pooling.
#[derive(Debug, Clone)]
pub struct FeatureExtractionProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl FeatureExtractionProvider {
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_FEATURE_EXTRACTION_URL.to_string()),
            model: config.model.clone(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }

    fn embed_all_url(&self) -> String {
        format!("{}/embed_all", self.base_url.trim_end_matches('/'))
    }

    /// Pool and normalize the token vectors of each input.
    fn pool_batch(&self, token_batches: Vec<Vec<Vec<f32>>>) -> AppResult<Vec<Vec<f32>>> {
        token_batches
            .iter()
            .map(|tokens| {
                let mut pooled = mean_pool(tokens)?;
                if pooled.len() != self.dimensions {
                    return Err(AppError::Embedding(format!(
                        "Model '{}' returned {} dimensions, expected {}",
                        self.model,
                        pooled.len(),
                        self.dimensions
                    )));
                }
                l2_normalize(&mut pooled);
                Ok(pooled)
            })
            .collect()
    }

    async fn request(&self, texts: &[String]) -> AppResult<Vec<Vec<Vec<f32>>>> {
        let response = self
            .client
            .post(self.embed_all_url())
            .json(&EmbedAllRequest {
                inputs: texts,
                truncate: true,
            })
            .send()
            .await
            .map_err(|e| {
                AppError::Embedding(format!("Failed to reach embedding service: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Embedding(format!(
                "Embedding service error ({}): {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            AppError::Embedding(format!("Failed to parse embedding response: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FeatureExtractionProvider {
    fn provider_name(&self) -> &str {
        "feature-extraction"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            tracing::debug!("Embedding batch of {} texts via {}", batch.len(), self.base_url);
            let tokens = self.request(batch).await?;
            if tokens.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "Embedding service returned {} results for {} inputs",
                    tokens.len(),
                    batch.len()
                )));
            }
            embeddings.extend(self.pool_batch(tokens)?);
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(dimensions: usize) -> FeatureExtractionProvider {
        FeatureExtractionProvider::new(&EmbeddingConfig {
            dimensions,
            endpoint: Some("http://embedder:8080/".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_and_defaults() {
        let provider = provider(384);
        assert_eq!(provider.embed_all_url(), "http://embedder:8080/embed_all");
        assert_eq!(provider.model_name(), "Supabase/gte-small");
    }

    #[test]
    fn test_pool_batch_mean_pools_and_normalizes() {
        let provider = provider(2);
        let pooled = provider
            .pool_batch(vec![vec![vec![2.0, 0.0], vec![4.0, 0.0]], vec![vec![0.0, 5.0]]])
            .unwrap();

        assert_eq!(pooled, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_pool_batch_rejects_wrong_width() {
        let provider = provider(384);
        let result = provider.pool_batch(vec![vec![vec![1.0; 383]]]);
        assert!(matches!(result, Err(AppError::Embedding(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let inputs = vec!["hello".to_string()];
        let body = serde_json::to_value(EmbedAllRequest {
            inputs: &inputs,
            truncate: true,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"inputs": ["hello"], "truncate": true}));
    }
}
