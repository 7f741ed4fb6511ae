//! Retrieval: question to grounded, cited answer.

use crate::composer;
use crate::pipeline::RagPipeline;
use crate::store::SearchFilter;
use crate::types::RagAnswer;
use codexplain_core::{AppError, AppResult};
use codexplain_llm::LlmRequest;

impl RagPipeline {
    /// Answer `query` from the `top_k` most similar stored chunks.
    ///
    /// An empty store is not an error: the answer is
    /// [`composer::NO_DOCUMENTS_ANSWER`] with no sources.
    ///
    /// # Errors
    /// - `Validation` for a blank query or `top_k == 0`
    /// - `Embedding` if the query cannot be embedded
    /// - `Retrieval` if the similarity search or the LLM call fails
    pub async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<RagAnswer> {
        if query.trim().is_empty() {
            return Err(AppError::Validation("Query is required".to_string()));
        }
        if top_k == 0 {
            return Err(AppError::Validation(
                "top_k must be greater than zero".to_string(),
            ));
        }

        tracing::info!("Searching for documents relevant to: {}", query);
        let query_embedding = self.embedder.embed(query).await?;

        let results = self
            .store
            .similarity_search(&query_embedding, top_k, &SearchFilter::default())
            .map_err(|e| AppError::Retrieval(format!("Similarity search failed: {}", e)))?;

        if results.is_empty() {
            tracing::info!("No documents found");
            return Ok(RagAnswer::new(composer::NO_DOCUMENTS_ANSWER, Vec::new()));
        }

        tracing::info!("Found {} relevant chunks", results.len());
        for (i, result) in results.iter().enumerate() {
            tracing::debug!(
                "Source {}: {} chunk {} ({:.1}% similar)",
                i + 1,
                result.metadata.filename,
                result.metadata.chunk_index,
                result.similarity * 100.0
            );
        }

        let context = composer::build_context(&results)?;
        let prompt = composer::build_user_prompt(&context, query)?;
        let request = LlmRequest::new(prompt, self.model.clone())
            .with_system(composer::system_prompt())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        tracing::info!("Generating answer with {}", self.llm.provider_name());
        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| AppError::Retrieval(format!("Answer generation failed: {}", e)))?;

        Ok(RagAnswer::new(
            composer::finalize_answer(&response.content),
            composer::format_sources(&results, self.config.snippet_chars),
        ))
    }

    /// [`RagPipeline::retrieve`] with the configured `top_k`.
    pub async fn retrieve_default(&self, query: &str) -> AppResult<RagAnswer> {
        self.retrieve(query, self.config.top_k).await
    }
}
