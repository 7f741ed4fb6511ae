//! Command handlers for the Codexplain CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod documents;
pub mod explain;
pub mod ingest;

pub use ask::AskCommand;
pub use documents::{ClearCommand, DeleteCommand, ListCommand};
pub use explain::ExplainCommand;
pub use ingest::IngestCommand;

use codexplain_core::{config::AppConfig, AppResult};
use codexplain_llm::{create_client, LlmClient};
use codexplain_rag::{open_store, DocumentStore, RagConfig, RagPipeline};
use serde::Serialize;
use std::sync::Arc;

/// LLM client for the configured provider.
pub(crate) fn build_llm(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    config.validate()?;
    let endpoint = config.endpoint();
    let api_key = config.resolve_api_key(&config.provider);
    create_client(&config.provider, endpoint.as_deref(), api_key.as_deref())
}

/// Full pipeline: store, embedder and LLM.
pub(crate) fn build_pipeline(config: &AppConfig) -> AppResult<RagPipeline> {
    let rag_config = RagConfig::load(&config.workspace)?;
    let llm = build_llm(config)?;
    RagPipeline::from_config(rag_config, llm, config.model.clone())
}

/// Store alone, for commands that never call the LLM.
pub(crate) fn open_document_store(config: &AppConfig) -> AppResult<Arc<dyn DocumentStore>> {
    let rag_config = RagConfig::load(&config.workspace)?;
    open_store(&rag_config)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
