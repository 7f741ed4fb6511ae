//! LLM integration crate for Codexplain.
//!
//! Provider-agnostic completion interface used by the retrieval pipeline
//! and the code explainer.
//!
//! # Providers
//! - **OpenAI-compatible**: any `/chat/completions` endpoint (default: Nebius)
//! - **Ollama**: local LLM runtime
//!
//! # Example
//! ```no_run
//! use codexplain_llm::{create_client, LlmRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_client("ollama", None, None)?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, ProviderType};
pub use providers::{OllamaClient, OpenAiClient};
