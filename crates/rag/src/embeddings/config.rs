//! Embedding model configuration.

use codexplain_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Which embedding model to use and where it is served.
///
/// The same configuration must be used for ingestion and for queries;
/// vectors from different models are not comparable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "feature-extraction", "ollama", "mock"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_model")]
    pub model: String,

    /// Service base URL; `None` uses the provider default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Embedding vector dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Texts sent per HTTP request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_provider() -> String {
    "feature-extraction".to_string()
}

fn default_model() -> String {
    "Supabase/gte-small".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_batch_size() -> usize {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            endpoint: None,
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    /// Deterministic offline configuration.
    pub fn mock(dimensions: usize) -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            endpoint: None,
            dimensions,
            batch_size: default_batch_size(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(AppError::Config(
                "embedding batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_gte_small() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "feature-extraction");
        assert_eq!(config.model, "Supabase/gte-small");
        assert_eq!(config.dimensions, 384);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: EmbeddingConfig = serde_yaml::from_str("provider: ollama\nmodel: all-minilm\n").unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.dimensions, 384);
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let config = EmbeddingConfig {
            dimensions: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
