//! Test doubles shared by the pipeline scenarios.

use crate::config::RagConfig;
use crate::embeddings::{Embedder, EmbeddingConfig};
use crate::pdf::{check_header, ensure_text, PdfExtractor};
use crate::pipeline::RagPipeline;
use crate::store::{
    DeleteFilter, DocumentStore, FileSummary, MemoryStore, NewDocument, RetrievalResult,
    SearchFilter, StoredDocument,
};
use codexplain_core::{AppError, AppResult};
use codexplain_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::sync::{Arc, Mutex};

pub const DIMS: usize = 384;

/// LLM double that replies from a script and records every request.
pub struct ScriptedLlm {
    reply: Result<String, String>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn answering(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Ok(content) => Ok(LlmResponse {
                content: content.clone(),
                model: request.model.clone(),
                usage: LlmUsage::new(10, 5),
                done: true,
            }),
            Err(message) => Err(AppError::Llm(message.clone())),
        }
    }
}

/// Extractor treating everything after the `%PDF-` signature as the
/// document text.
pub struct TextPdf;

#[async_trait::async_trait]
impl PdfExtractor for TextPdf {
    async fn extract_text(&self, bytes: &[u8]) -> AppResult<String> {
        check_header(bytes)?;
        ensure_text(String::from_utf8_lossy(&bytes[5..]).into_owned())
    }
}

/// Bytes `TextPdf` extracts `text` from.
pub fn fake_pdf(text: &str) -> Vec<u8> {
    let mut bytes = b"%PDF-".to_vec();
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

/// One-page PDF showing `text` in Helvetica, with a valid xref table.
pub fn minimal_pdf(text: &str) -> Vec<u8> {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)");
    let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", escaped);

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_start = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_start
    ));
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}

/// Store whose every operation fails.
pub struct BrokenStore;

impl DocumentStore for BrokenStore {
    fn dimensions(&self) -> usize {
        DIMS
    }

    fn insert_many(&self, _documents: &[NewDocument]) -> AppResult<Vec<i64>> {
        Err(AppError::Store("disk full".to_string()))
    }

    fn similarity_search(
        &self,
        _query: &[f32],
        _k: usize,
        _filter: &SearchFilter,
    ) -> AppResult<Vec<RetrievalResult>> {
        Err(AppError::Store("connection reset".to_string()))
    }

    fn delete_where(&self, _filter: &DeleteFilter) -> AppResult<usize> {
        Err(AppError::Store("read-only".to_string()))
    }

    fn replace_file(
        &self,
        _filename: &str,
        _documents: &[NewDocument],
    ) -> AppResult<(usize, Vec<i64>)> {
        Err(AppError::Store("read-only".to_string()))
    }

    fn count(&self, _filter: &SearchFilter) -> AppResult<usize> {
        Ok(0)
    }

    fn documents(&self, _filter: &SearchFilter) -> AppResult<Vec<StoredDocument>> {
        Ok(Vec::new())
    }

    fn list_filenames(&self) -> AppResult<Vec<FileSummary>> {
        Ok(Vec::new())
    }
}

pub fn test_config() -> RagConfig {
    RagConfig {
        store: "memory".to_string(),
        embedding: EmbeddingConfig::mock(DIMS),
        ..Default::default()
    }
}

pub fn mock_embedder() -> Embedder {
    Embedder::from_config(&EmbeddingConfig::mock(DIMS)).unwrap()
}

/// Pipeline over the given store and LLM with mock embeddings.
pub fn pipeline_with(
    config: RagConfig,
    store: Arc<dyn DocumentStore>,
    llm: Arc<dyn LlmClient>,
) -> RagPipeline {
    RagPipeline::new(config, mock_embedder(), store, llm, "test-model")
        .unwrap()
        .with_pdf_extractor(Arc::new(TextPdf))
}

/// In-memory pipeline plus handles to its store and LLM.
pub fn memory_pipeline(reply: &str) -> (RagPipeline, Arc<MemoryStore>, Arc<ScriptedLlm>) {
    let store = Arc::new(MemoryStore::new(DIMS));
    let llm = Arc::new(ScriptedLlm::answering(reply));
    let pipeline = pipeline_with(test_config(), store.clone(), llm.clone());
    (pipeline, store, llm)
}

/// Document text on one topic, long enough to yield several chunks.
pub fn topic_text(topic: &str, sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("Fact {} about {} is recorded here.", i, topic))
        .collect::<Vec<_>>()
        .join(" ")
}
