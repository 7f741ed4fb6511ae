//! Embedding provider implementations.

pub mod feature_extraction;
pub mod mock;
pub mod ollama;

pub use feature_extraction::FeatureExtractionProvider;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
