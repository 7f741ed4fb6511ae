//! Document store: chunk text, embeddings and metadata with
//! nearest-neighbour search by cosine similarity.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::RagConfig;
use chrono::{DateTime, Utc};
use codexplain_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Attribution carried by every stored chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// Chunk ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Chunk as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: i64,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
    pub created_at: DateTime<Utc>,
}

/// One similarity search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: i64,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity to the query
    pub similarity: f32,
}

/// Restricts searches and counts to one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub filename: Option<String>,
}

impl SearchFilter {
    pub fn filename(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
        }
    }

    fn matches(&self, metadata: &ChunkMetadata) -> bool {
        self.filename
            .as_deref()
            .map_or(true, |name| metadata.filename == name)
    }
}

/// Which chunks to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteFilter {
    All,
    Filename(String),
}

impl DeleteFilter {
    fn matches(&self, metadata: &ChunkMetadata) -> bool {
        match self {
            DeleteFilter::All => true,
            DeleteFilter::Filename(name) => &metadata.filename == name,
        }
    }
}

/// Per-file chunk count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub filename: String,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub documents: usize,
    pub files: usize,
    pub dimensions: usize,
}

/// Vector store backend.
///
/// Implementations take `&self` and handle their own locking so one store
/// can be shared by concurrent ingestion and retrieval calls.
pub trait DocumentStore: Send + Sync {
    /// Width every stored and queried vector must have.
    fn dimensions(&self) -> usize;

    /// Insert a batch atomically, returning ids in input order. Either
    /// every document is written or none is.
    fn insert_many(&self, documents: &[NewDocument]) -> AppResult<Vec<i64>>;

    /// Up to `k` documents by descending cosine similarity, ties broken by
    /// ascending id.
    fn similarity_search(
        &self,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> AppResult<Vec<RetrievalResult>>;

    /// Remove matching documents, returning how many were removed.
    fn delete_where(&self, filter: &DeleteFilter) -> AppResult<usize>;

    /// Swap every document of `filename` for `documents` in one atomic
    /// step. Returns the number removed and the new ids in input order.
    /// On error the store is unchanged.
    fn replace_file(
        &self,
        filename: &str,
        documents: &[NewDocument],
    ) -> AppResult<(usize, Vec<i64>)>;

    fn count(&self, filter: &SearchFilter) -> AppResult<usize>;

    /// Matching documents in id order.
    fn documents(&self, filter: &SearchFilter) -> AppResult<Vec<StoredDocument>>;

    /// Files present in the store, sorted by name.
    fn list_filenames(&self) -> AppResult<Vec<FileSummary>>;

    fn stats(&self) -> AppResult<StoreStats> {
        Ok(StoreStats {
            documents: self.count(&SearchFilter::default())?,
            files: self.list_filenames()?.len(),
            dimensions: self.dimensions(),
        })
    }
}

/// Open the store backend named in the configuration.
pub fn open_store(config: &RagConfig) -> AppResult<Arc<dyn DocumentStore>> {
    let dimensions = config.embedding.dimensions;
    match config.store.as_str() {
        "sqlite" => Ok(Arc::new(SqliteStore::open(&config.database, dimensions)?)),
        "memory" => Ok(Arc::new(MemoryStore::new(dimensions))),
        other => Err(AppError::Config(format!(
            "Unknown store backend: '{}'. Supported: sqlite, memory",
            other
        ))),
    }
}

/// Fail with a store error when a vector has the wrong width.
pub(crate) fn check_dimensions(expected: usize, actual: usize, what: &str) -> AppResult<()> {
    if expected != actual {
        return Err(AppError::Store(format!(
            "{} has {} dimensions, store expects {}",
            what, actual, expected
        )));
    }
    Ok(())
}

/// Cosine similarity; zero when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score candidates against the query and keep the best `k`.
pub(crate) fn rank<I>(query: &[f32], candidates: I, k: usize) -> Vec<RetrievalResult>
where
    I: IntoIterator<Item = (i64, String, ChunkMetadata, Vec<f32>)>,
{
    let mut results: Vec<RetrievalResult> = candidates
        .into_iter()
        .map(|(id, content, metadata, embedding)| RetrievalResult {
            id,
            content,
            metadata,
            similarity: cosine_similarity(query, &embedding),
        })
        .collect();

    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    results.truncate(k);
    results
}
