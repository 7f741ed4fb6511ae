//! Result types returned by the pipelines.

use serde::{Deserialize, Serialize};

/// Outcome of ingesting one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResult {
    pub filename: String,

    #[serde(rename = "chunks_count")]
    pub chunk_count: usize,

    /// Ids of the stored chunks, in chunk order
    pub document_ids: Vec<i64>,
}

/// Grounded answer with the sources it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

impl RagAnswer {
    pub fn new(answer: impl Into<String>, sources: Vec<SourceRef>) -> Self {
        Self {
            answer: answer.into(),
            sources,
        }
    }
}

/// Source reference shown alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Truncated chunk text
    pub content: String,
    pub filename: String,
    pub similarity: f32,
}

/// Plain-language explanation of a code snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExplanation {
    pub explanation: String,
    pub language: String,
}
