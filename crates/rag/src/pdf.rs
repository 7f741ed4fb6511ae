//! PDF text extraction.

use codexplain_core::{AppError, AppResult};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Turns a PDF binary into plain text.
#[async_trait::async_trait]
pub trait PdfExtractor: Send + Sync {
    /// # Errors
    /// `AppError::Parse` when the input is not a PDF or holds no
    /// extractable text.
    async fn extract_text(&self, bytes: &[u8]) -> AppResult<String>;
}

/// Extractor backed by the `pdf-extract` crate.
///
/// Parsing is CPU-bound and runs on the blocking thread pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl PdfExtractor for PdfTextExtractor {
    async fn extract_text(&self, bytes: &[u8]) -> AppResult<String> {
        check_header(bytes)?;

        let owned = bytes.to_vec();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
            .await
            .map_err(|e| AppError::Parse(format!("PDF parser crashed: {}", e)))?
            .map_err(|e| AppError::Parse(format!("Failed to parse PDF: {}", e)))?;

        ensure_text(text)
    }
}

/// Reject input that does not start with the PDF signature.
pub fn check_header(bytes: &[u8]) -> AppResult<()> {
    if bytes.starts_with(PDF_MAGIC) {
        Ok(())
    } else {
        Err(AppError::Parse("Input is not a PDF file".to_string()))
    }
}

/// Reject extraction results with no visible text.
pub fn ensure_text(text: String) -> AppResult<String> {
    if text.trim().is_empty() {
        return Err(AppError::Parse(
            "PDF contains no extractable text".to_string(),
        ));
    }
    tracing::debug!("Extracted {} characters from PDF", text.chars().count());
    Ok(text)
}
