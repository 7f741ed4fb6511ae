//! Ingestion: PDF bytes to stored, embedded chunks.

use crate::pipeline::RagPipeline;
use crate::store::{ChunkMetadata, NewDocument};
use crate::types::IngestResult;
use codexplain_core::{AppError, AppResult};

impl RagPipeline {
    /// Parse, split, embed and store a PDF.
    ///
    /// All chunks are written in one batch; on error nothing from this
    /// call is stored. Re-ingesting the same filename adds a second copy,
    /// use [`RagPipeline::replace`] to swap it instead.
    ///
    /// # Errors
    /// - `Validation` for a blank filename, empty payload or one over
    ///   `max_pdf_bytes`
    /// - `Parse` when no text can be extracted
    /// - `Embedding` / `Store` from the respective stage
    pub async fn ingest(&self, pdf_bytes: &[u8], filename: &str) -> AppResult<IngestResult> {
        let text = self.extract(pdf_bytes, filename).await?;
        self.ingest_text(&text, filename).await
    }

    /// Ingest already-extracted text under `filename`.
    pub async fn ingest_text(&self, text: &str, filename: &str) -> AppResult<IngestResult> {
        let documents = self.prepare(text, filename).await?;
        if documents.is_empty() {
            return Ok(IngestResult {
                filename: filename.to_string(),
                chunk_count: 0,
                document_ids: Vec::new(),
            });
        }

        tracing::info!("Inserting {} documents into the store", documents.len());
        let document_ids = self.store.insert_many(&documents)?;

        tracing::info!(
            "Ingested '{}': {} chunks stored",
            filename,
            document_ids.len()
        );

        Ok(IngestResult {
            filename: filename.to_string(),
            chunk_count: documents.len(),
            document_ids,
        })
    }

    /// Ingest a PDF in place of any chunks already stored for `filename`.
    ///
    /// Parsing and embedding finish before the store is touched, and the
    /// swap itself is a single store operation, so any failure leaves the
    /// previous version in place.
    pub async fn replace(&self, pdf_bytes: &[u8], filename: &str) -> AppResult<IngestResult> {
        let text = self.extract(pdf_bytes, filename).await?;
        let documents = self.prepare(&text, filename).await?;

        let (removed, document_ids) = self.store.replace_file(filename, &documents)?;
        tracing::info!(
            "Replaced {} chunks of '{}' with {}",
            removed,
            filename,
            document_ids.len()
        );

        Ok(IngestResult {
            filename: filename.to_string(),
            chunk_count: documents.len(),
            document_ids,
        })
    }

    /// Split and embed `text` into documents tagged with their position.
    async fn prepare(&self, text: &str, filename: &str) -> AppResult<Vec<NewDocument>> {
        validate_filename(filename)?;

        let chunks = self.splitter.split(text);
        tracing::info!("Split '{}' into {} chunks", filename, chunks.len());
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!("Generating embeddings for {} chunks", chunks.len());
        let embeddings = self
            .embedder
            .embed_all(&chunks, self.config.embedding_concurrency)
            .await?;

        let total_chunks = chunks.len();
        Ok(chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (content, embedding))| NewDocument {
                content,
                embedding,
                metadata: ChunkMetadata {
                    filename: filename.to_string(),
                    chunk_index,
                    total_chunks,
                },
            })
            .collect())
    }

    async fn extract(&self, pdf_bytes: &[u8], filename: &str) -> AppResult<String> {
        validate_filename(filename)?;

        if pdf_bytes.is_empty() {
            return Err(AppError::Validation("No PDF data provided".to_string()));
        }
        if pdf_bytes.len() > self.config.max_pdf_bytes {
            return Err(AppError::Validation(format!(
                "'{}' is {} bytes, the limit is {}",
                filename,
                pdf_bytes.len(),
                self.config.max_pdf_bytes
            )));
        }

        tracing::info!("Parsing PDF '{}' ({} bytes)", filename, pdf_bytes.len());
        self.pdf.extract_text(pdf_bytes).await
    }
}

fn validate_filename(filename: &str) -> AppResult<()> {
    if filename.trim().is_empty() {
        return Err(AppError::Validation("Filename is required".to_string()));
    }
    Ok(())
}
