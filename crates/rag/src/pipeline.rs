//! The document pipeline handle.
//!
//! `RagPipeline` owns the collaborators every operation needs: the
//! embedder, the document store, the LLM client and the PDF extractor.
//! Build it once and share it; all operations take `&self`.
//! Ingestion lives in [`crate::ingest`], answering in [`crate::retrieve`].

use crate::config::RagConfig;
use crate::embeddings::Embedder;
use crate::pdf::{PdfExtractor, PdfTextExtractor};
use crate::splitter::TextSplitter;
use crate::store::{open_store, DeleteFilter, DocumentStore, FileSummary, StoreStats};
use codexplain_core::{AppError, AppResult};
use codexplain_llm::LlmClient;
use std::sync::Arc;

pub struct RagPipeline {
    pub(crate) config: RagConfig,
    pub(crate) splitter: TextSplitter,
    pub(crate) embedder: Embedder,
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) llm: Arc<dyn LlmClient>,
    pub(crate) pdf: Arc<dyn PdfExtractor>,
    pub(crate) model: String,
}

impl RagPipeline {
    /// Assemble a pipeline from explicit collaborators.
    ///
    /// # Errors
    /// `AppError::Config` if the configuration is invalid or the embedder
    /// and store disagree on vector width.
    pub fn new(
        config: RagConfig,
        embedder: Embedder,
        store: Arc<dyn DocumentStore>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> AppResult<Self> {
        config.validate()?;

        if embedder.dimensions() != store.dimensions() {
            return Err(AppError::Config(format!(
                "Embedder produces {}-dimensional vectors but the store holds {}",
                embedder.dimensions(),
                store.dimensions()
            )));
        }

        Ok(Self {
            splitter: TextSplitter::new(config.splitter())?,
            config,
            embedder,
            store,
            llm,
            pdf: Arc::new(PdfTextExtractor::new()),
            model: model.into(),
        })
    }

    /// Build the embedder and store described by `config`.
    pub fn from_config(
        config: RagConfig,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> AppResult<Self> {
        let embedder = Embedder::from_config(&config.embedding)?;
        let store = open_store(&config)?;
        Self::new(config, embedder, store, llm, model)
    }

    /// Replace the PDF extractor.
    pub fn with_pdf_extractor(mut self, pdf: Arc<dyn PdfExtractor>) -> Self {
        self.pdf = pdf;
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Remove every chunk of `filename`, leaving other files untouched.
    pub fn delete_by_filename(&self, filename: &str) -> AppResult<usize> {
        if filename.trim().is_empty() {
            return Err(AppError::Validation("Filename is required".to_string()));
        }

        let deleted = self
            .store
            .delete_where(&DeleteFilter::Filename(filename.to_string()))?;
        tracing::info!("Deleted {} chunks of '{}'", deleted, filename);
        Ok(deleted)
    }

    /// Remove every chunk. Calling it on an empty store is a no-op.
    pub fn clear_all(&self) -> AppResult<usize> {
        let deleted = self.store.delete_where(&DeleteFilter::All)?;
        tracing::info!("Cleared {} chunks", deleted);
        Ok(deleted)
    }

    pub fn list_documents(&self) -> AppResult<Vec<FileSummary>> {
        self.store.list_filenames()
    }

    pub fn stats(&self) -> AppResult<StoreStats> {
        self.store.stats()
    }
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("embedder", &self.embedder)
            .field("llm", &self.llm.provider_name())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
