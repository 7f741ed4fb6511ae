//! SQLite-backed document store.
//!
//! Embeddings are stored as little-endian f32 blobs and searched with an
//! exact cosine scan. The vector width is recorded in `store_meta` when
//! the database is created; opening it with another width fails.

use super::{
    check_dimensions, rank, ChunkMetadata, DeleteFilter, DocumentStore, FileSummary, NewDocument,
    RetrievalResult, SearchFilter, StoredDocument,
};
use chrono::{DateTime, Utc};
use codexplain_core::{AppError, AppResult};
use rusqlite::{params, params_from_iter, Connection, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    metadata TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_filename
    ON documents (json_extract(metadata, '$.filename'));

CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const FILENAME_CLAUSE: &str = "json_extract(metadata, '$.filename') = ?1";

/// Row as read from `documents`, before decoding.
type RawRow = (i64, String, Vec<u8>, String, String);

pub struct SqliteStore {
    conn: Mutex<Connection>,
    dimensions: usize,
}

impl SqliteStore {
    /// Open or create a store at `path`.
    pub fn open(path: &Path, dimensions: usize) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Store(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Store(format!("Failed to open SQLite store: {}", e)))?;

        let store = Self::init(conn, dimensions)?;
        tracing::debug!("Opened SQLite store at {:?} ({} dims)", path, dimensions);
        Ok(store)
    }

    /// Store that lives only as long as the value.
    pub fn open_in_memory(dimensions: usize) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Store(format!("Failed to open SQLite store: {}", e)))?;
        Self::init(conn, dimensions)
    }

    fn init(conn: Connection, dimensions: usize) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        conn.execute(
            "INSERT OR IGNORE INTO store_meta (key, value) VALUES ('dimensions', ?1)",
            params![dimensions.to_string()],
        )
        .map_err(|e| AppError::Store(format!("Failed to record store dimensions: {}", e)))?;

        let recorded: String = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = 'dimensions'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Store(format!("Failed to read store dimensions: {}", e)))?;

        let recorded: usize = recorded.parse().map_err(|e| {
            AppError::Store(format!("Corrupt store dimensions '{}': {}", recorded, e))
        })?;

        if recorded != dimensions {
            return Err(AppError::Store(format!(
                "Store was created for {}-dimensional embeddings but the embedder produces {}",
                recorded, dimensions
            )));
        }

        Ok(Self {
            conn: Mutex::new(conn),
            dimensions,
        })
    }

    fn check_batch(&self, documents: &[NewDocument]) -> AppResult<()> {
        for (i, doc) in documents.iter().enumerate() {
            check_dimensions(self.dimensions, doc.embedding.len(), &format!("Document {}", i))?;
        }
        Ok(())
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Store("Document store lock poisoned".to_string()))
    }

    fn select_rows(&self, filter: &SearchFilter) -> AppResult<Vec<RawRow>> {
        let conn = self.lock()?;
        let sql = match filter.filename {
            Some(_) => format!(
                "SELECT id, content, embedding, metadata, created_at FROM documents WHERE {} ORDER BY id",
                FILENAME_CLAUSE
            ),
            None => "SELECT id, content, embedding, metadata, created_at FROM documents ORDER BY id"
                .to_string(),
        };

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params_from_iter(filter.filename.iter()), |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })
            .map_err(|e| AppError::Store(format!("Failed to query documents: {}", e)))?;

        rows.collect::<Result<Vec<RawRow>, _>>()
            .map_err(|e| AppError::Store(format!("Failed to read document row: {}", e)))
    }
}

impl DocumentStore for SqliteStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn insert_many(&self, documents: &[NewDocument]) -> AppResult<Vec<i64>> {
        self.check_batch(documents)?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;
        let ids = insert_rows(&tx, documents)?;
        tx.commit()
            .map_err(|e| AppError::Store(format!("Failed to commit insert: {}", e)))?;

        tracing::debug!("Inserted {} documents", ids.len());
        Ok(ids)
    }

    fn similarity_search(
        &self,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> AppResult<Vec<RetrievalResult>> {
        check_dimensions(self.dimensions, query.len(), "Query embedding")?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self
            .select_rows(filter)?
            .into_iter()
            .map(|(id, content, blob, metadata, _)| {
                Ok((id, content, decode_metadata(&metadata)?, bytes_to_embedding(&blob)?))
            })
            .collect::<AppResult<Vec<_>>>()?;

        let results = rank(query, candidates, k);
        tracing::debug!("Similarity search returned {} of top-{}", results.len(), k);
        Ok(results)
    }

    fn delete_where(&self, filter: &DeleteFilter) -> AppResult<usize> {
        let conn = self.lock()?;
        let deleted = match filter {
            DeleteFilter::All => conn.execute("DELETE FROM documents", []),
            DeleteFilter::Filename(name) => conn.execute(
                &format!("DELETE FROM documents WHERE {}", FILENAME_CLAUSE),
                params![name],
            ),
        }
        .map_err(|e| AppError::Store(format!("Failed to delete documents: {}", e)))?;

        tracing::debug!("Deleted {} documents ({:?})", deleted, filter);
        Ok(deleted)
    }

    fn replace_file(
        &self,
        filename: &str,
        documents: &[NewDocument],
    ) -> AppResult<(usize, Vec<i64>)> {
        self.check_batch(documents)?;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

        let removed = tx
            .execute(
                &format!("DELETE FROM documents WHERE {}", FILENAME_CLAUSE),
                params![filename],
            )
            .map_err(|e| AppError::Store(format!("Failed to delete documents: {}", e)))?;
        let ids = insert_rows(&tx, documents)?;

        tx.commit()
            .map_err(|e| AppError::Store(format!("Failed to commit replace: {}", e)))?;

        tracing::debug!(
            "Replaced {} documents of '{}' with {}",
            removed,
            filename,
            ids.len()
        );
        Ok((removed, ids))
    }

    fn count(&self, filter: &SearchFilter) -> AppResult<usize> {
        let conn = self.lock()?;
        let count: i64 = match &filter.filename {
            Some(name) => conn.query_row(
                &format!("SELECT COUNT(*) FROM documents WHERE {}", FILENAME_CLAUSE),
                params![name],
                |row| row.get::<_, i64>(0),
            ),
            None => conn.query_row("SELECT COUNT(*) FROM documents", [], |row| {
                row.get::<_, i64>(0)
            }),
        }
        .map_err(|e| AppError::Store(format!("Failed to count documents: {}", e)))?;

        Ok(count as usize)
    }

    fn documents(&self, filter: &SearchFilter) -> AppResult<Vec<StoredDocument>> {
        self.select_rows(filter)?
            .into_iter()
            .map(|(id, content, blob, metadata, created_at)| {
                Ok(StoredDocument {
                    id,
                    content,
                    embedding: bytes_to_embedding(&blob)?,
                    metadata: decode_metadata(&metadata)?,
                    created_at: decode_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    fn list_filenames(&self) -> AppResult<Vec<FileSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT json_extract(metadata, '$.filename') AS filename, COUNT(*)
                 FROM documents GROUP BY filename ORDER BY filename",
            )
            .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let filename: Option<String> = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok(FileSummary {
                    filename: filename.unwrap_or_default(),
                    chunk_count: count as usize,
                })
            })
            .map_err(|e| AppError::Store(format!("Failed to list files: {}", e)))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Store(format!("Failed to read file row: {}", e)))
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

/// Insert rows inside an open transaction, returning ids in input order.
fn insert_rows(tx: &Transaction<'_>, documents: &[NewDocument]) -> AppResult<Vec<i64>> {
    let created_at = Utc::now().to_rfc3339();
    let mut stmt = tx
        .prepare(
            "INSERT INTO documents (content, embedding, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(|e| AppError::Store(format!("Failed to prepare insert: {}", e)))?;

    let mut ids = Vec::with_capacity(documents.len());
    for doc in documents {
        let metadata = serde_json::to_string(&doc.metadata)?;
        stmt.execute(params![
            doc.content,
            embedding_to_bytes(&doc.embedding),
            metadata,
            created_at
        ])
        .map_err(|e| AppError::Store(format!("Failed to insert document: {}", e)))?;
        ids.push(tx.last_insert_rowid());
    }
    Ok(ids)
}

fn decode_metadata(json: &str) -> AppResult<ChunkMetadata> {
    serde_json::from_str(json)
        .map_err(|e| AppError::Store(format!("Corrupt document metadata: {}", e)))
}

fn decode_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Store(format!("Corrupt created_at '{}': {}", value, e)))
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Store(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    fn doc(filename: &str, index: usize, embedding: Vec<f32>) -> NewDocument {
        NewDocument {
            content: format!("{} chunk {}", filename, index),
            embedding,
            metadata: ChunkMetadata {
                filename: filename.to_string(),
                chunk_index: index,
                total_chunks: 2,
            },
        }
    }

    #[test]
    fn test_init_creates_tables() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = SqliteStore::open(temp_file.path(), 3).unwrap();

        let table_count: i64 = store
            .lock()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('documents', 'store_meta')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 2);
    }

    #[test]
    fn test_insert_and_search() {
        let store = SqliteStore::open_in_memory(3).unwrap();
        let ids = store
            .insert_many(&[
                doc("a.pdf", 0, vec![1.0, 0.0, 0.0]),
                doc("a.pdf", 1, vec![0.0, 1.0, 0.0]),
            ])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);

        let results = store
            .similarity_search(&[0.9, 0.1, 0.0], 5, &SearchFilter::default())
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, ids[0]);
        assert_eq!(results[0].metadata.chunk_index, 0);
        assert!(results[0].similarity > results[1].similarity);
    }

    #[test]
    fn test_search_filter_by_filename() {
        let store = SqliteStore::open_in_memory(2).unwrap();
        store
            .insert_many(&[doc("a.pdf", 0, vec![1.0, 0.0]), doc("b.pdf", 0, vec![1.0, 0.0])])
            .unwrap();

        let results = store
            .similarity_search(&[1.0, 0.0], 5, &SearchFilter::filename("b.pdf"))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata.filename, "b.pdf");
    }

    #[test]
    fn test_wrong_width_insert_writes_nothing() {
        let store = SqliteStore::open_in_memory(384).unwrap();
        let result = store.insert_many(&[
            doc("a.pdf", 0, vec![0.1; 384]),
            doc("a.pdf", 1, vec![0.1; 383]),
        ]);

        assert!(matches!(result, Err(AppError::Store(_))));
        assert_eq!(store.count(&SearchFilter::default()).unwrap(), 0);
    }

    #[test]
    fn test_wrong_width_query() {
        let store = SqliteStore::open_in_memory(3).unwrap();
        let result = store.similarity_search(&[1.0, 0.0], 1, &SearchFilter::default());
        assert!(matches!(result, Err(AppError::Store(_))));
    }

    #[test]
    fn test_delete_and_count() {
        let store = SqliteStore::open_in_memory(2).unwrap();
        store
            .insert_many(&[
                doc("a.pdf", 0, vec![1.0, 0.0]),
                doc("a.pdf", 1, vec![0.0, 1.0]),
                doc("b.pdf", 0, vec![1.0, 1.0]),
            ])
            .unwrap();

        assert_eq!(
            store
                .delete_where(&DeleteFilter::Filename("a.pdf".to_string()))
                .unwrap(),
            2
        );
        assert_eq!(store.count(&SearchFilter::default()).unwrap(), 1);
        assert_eq!(store.count(&SearchFilter::filename("b.pdf")).unwrap(), 1);

        assert_eq!(store.delete_where(&DeleteFilter::All).unwrap(), 1);
        assert_eq!(store.delete_where(&DeleteFilter::All).unwrap(), 0);
    }

    #[test]
    fn test_list_filenames_and_documents() {
        let store = SqliteStore::open_in_memory(2).unwrap();
        store
            .insert_many(&[
                doc("b.pdf", 0, vec![1.0, 0.0]),
                doc("a.pdf", 0, vec![1.0, 0.0]),
                doc("a.pdf", 1, vec![0.0, 1.0]),
            ])
            .unwrap();

        let files = store.list_filenames().unwrap();
        assert_eq!(
            files,
            vec![
                FileSummary {
                    filename: "a.pdf".to_string(),
                    chunk_count: 2
                },
                FileSummary {
                    filename: "b.pdf".to_string(),
                    chunk_count: 1
                },
            ]
        );

        let docs = store.documents(&SearchFilter::filename("a.pdf")).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].embedding, vec![0.0, 1.0]);
        assert_eq!(docs[1].metadata.chunk_index, 1);
    }

    #[test]
    fn test_reopen_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("documents.sqlite");

        {
            let store = SqliteStore::open(&path, 2).unwrap();
            store.insert_many(&[doc("a.pdf", 0, vec![0.6, 0.8])]).unwrap();
        }

        let store = SqliteStore::open(&path, 2).unwrap();
        assert_eq!(store.count(&SearchFilter::default()).unwrap(), 1);
    }

    #[test]
    fn test_reopen_with_other_width_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("documents.sqlite");
        SqliteStore::open(&path, 384).unwrap();

        match SqliteStore::open(&path, 768) {
            Err(AppError::Store(msg)) => assert!(msg.contains("384")),
            other => panic!("expected store error, got {:?}", other),
        }
    }

    #[test]
    fn test_replace_file_is_atomic() {
        let store = SqliteStore::open_in_memory(2).unwrap();
        store
            .insert_many(&[
                doc("a.pdf", 0, vec![1.0, 0.0]),
                doc("a.pdf", 1, vec![0.0, 1.0]),
                doc("b.pdf", 0, vec![1.0, 1.0]),
            ])
            .unwrap();

        let (removed, ids) = store
            .replace_file("a.pdf", &[doc("a.pdf", 0, vec![0.6, 0.8])])
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(ids.len(), 1);

        let docs = store.documents(&SearchFilter::filename("a.pdf")).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, ids[0]);
        assert_eq!(store.count(&SearchFilter::filename("b.pdf")).unwrap(), 1);

        let bad = store.replace_file("a.pdf", &[doc("a.pdf", 0, vec![1.0])]);
        assert!(matches!(bad, Err(AppError::Store(_))));
        assert_eq!(store.count(&SearchFilter::filename("a.pdf")).unwrap(), 1);
    }

    #[test]
    fn test_embedding_bytes() {
        let bytes = embedding_to_bytes(&[1.5, -2.0]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), vec![1.5, -2.0]);
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
    }
}
