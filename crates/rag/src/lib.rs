//! Document ingestion and retrieval-augmented generation.
//!
//! PDFs are parsed to text, split into overlapping chunks, embedded and
//! stored with their filename and position. Questions are embedded with
//! the same model, matched against the store by cosine similarity, and
//! answered by an LLM from the retrieved context with `[Source N]`
//! citations.

pub mod composer;
pub mod config;
pub mod embeddings;
pub mod explain;
pub mod ingest;
pub mod pdf;
pub mod pipeline;
pub mod retrieve;
pub mod splitter;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::RagConfig;
pub use embeddings::{Embedder, EmbeddingProvider};
pub use explain::{explain_code, explain_text};
pub use pdf::{PdfExtractor, PdfTextExtractor};
pub use pipeline::RagPipeline;
pub use splitter::{SplitterConfig, TextSplitter};
pub use store::{
    open_store, ChunkMetadata, DeleteFilter, DocumentStore, FileSummary, MemoryStore,
    NewDocument, RetrievalResult, SearchFilter, SqliteStore, StoreStats, StoredDocument,
};
pub use types::{CodeExplanation, IngestResult, RagAnswer, SourceRef};
