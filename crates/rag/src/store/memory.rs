//! In-process document store.

use super::{
    check_dimensions, rank, DeleteFilter, DocumentStore, FileSummary, NewDocument,
    RetrievalResult, SearchFilter, StoredDocument,
};
use chrono::Utc;
use codexplain_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    documents: Vec<StoredDocument>,
}

impl Inner {
    fn push(&mut self, documents: &[NewDocument]) -> Vec<i64> {
        let created_at = Utc::now();
        documents
            .iter()
            .map(|doc| {
                let id = self.next_id;
                self.next_id += 1;
                self.documents.push(StoredDocument {
                    id,
                    content: doc.content.clone(),
                    embedding: doc.embedding.clone(),
                    metadata: doc.metadata.clone(),
                    created_at,
                });
                id
            })
            .collect()
    }
}

/// Volatile store with the same contract as [`super::SqliteStore`].
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    dimensions: usize,
}

impl MemoryStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                documents: Vec::new(),
            }),
            dimensions,
        }
    }

    fn check_batch(&self, documents: &[NewDocument]) -> AppResult<()> {
        for (i, doc) in documents.iter().enumerate() {
            check_dimensions(self.dimensions, doc.embedding.len(), &format!("Document {}", i))?;
        }
        Ok(())
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| AppError::Store("Document store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| AppError::Store("Document store lock poisoned".to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn insert_many(&self, documents: &[NewDocument]) -> AppResult<Vec<i64>> {
        self.check_batch(documents)?;
        let mut inner = self.write()?;
        Ok(inner.push(documents))
    }

    fn similarity_search(
        &self,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> AppResult<Vec<RetrievalResult>> {
        check_dimensions(self.dimensions, query.len(), "Query embedding")?;

        let inner = self.read()?;
        let candidates = inner
            .documents
            .iter()
            .filter(|doc| filter.matches(&doc.metadata))
            .map(|doc| {
                (
                    doc.id,
                    doc.content.clone(),
                    doc.metadata.clone(),
                    doc.embedding.clone(),
                )
            });

        Ok(rank(query, candidates, k))
    }

    fn delete_where(&self, filter: &DeleteFilter) -> AppResult<usize> {
        let mut inner = self.write()?;
        let before = inner.documents.len();
        inner.documents.retain(|doc| !filter.matches(&doc.metadata));
        Ok(before - inner.documents.len())
    }

    fn replace_file(
        &self,
        filename: &str,
        documents: &[NewDocument],
    ) -> AppResult<(usize, Vec<i64>)> {
        self.check_batch(documents)?;

        let mut inner = self.write()?;
        let before = inner.documents.len();
        inner.documents.retain(|doc| doc.metadata.filename != filename);
        let removed = before - inner.documents.len();

        Ok((removed, inner.push(documents)))
    }

    fn count(&self, filter: &SearchFilter) -> AppResult<usize> {
        Ok(self
            .read()?
            .documents
            .iter()
            .filter(|doc| filter.matches(&doc.metadata))
            .count())
    }

    fn documents(&self, filter: &SearchFilter) -> AppResult<Vec<StoredDocument>> {
        Ok(self
            .read()?
            .documents
            .iter()
            .filter(|doc| filter.matches(&doc.metadata))
            .cloned()
            .collect())
    }

    fn list_filenames(&self) -> AppResult<Vec<FileSummary>> {
        let inner = self.read()?;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &inner.documents {
            *counts.entry(doc.metadata.filename.as_str()).or_insert(0) += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(filename, chunk_count)| FileSummary {
                filename: filename.to_string(),
                chunk_count,
            })
            .collect())
    }
}
