//! Retrieval pipeline configuration.
//!
//! Loaded from the `rag:` section of `.codexplain/rag.yaml` in the
//! workspace. Every field has a default, so a missing file or a partial
//! section is fine.

use crate::embeddings::EmbeddingConfig;
use crate::splitter::SplitterConfig;
use codexplain_core::config::DATA_DIR;
use codexplain_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "rag.yaml";

/// Tunables for ingestion, retrieval and storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Sources retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Sampling temperature for answers
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Answer length cap in tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Characters of each source shown in the answer
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,

    /// Largest accepted PDF upload in bytes
    #[serde(default = "default_max_pdf_bytes")]
    pub max_pdf_bytes: usize,

    /// Chunk embeddings in flight during ingestion
    #[serde(default = "default_embedding_concurrency")]
    pub embedding_concurrency: usize,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Store backend: "sqlite" or "memory"
    #[serde(default = "default_store")]
    pub store: String,

    /// SQLite database path, relative paths resolve against the workspace
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    5
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    800
}

fn default_snippet_chars() -> usize {
    200
}

fn default_max_pdf_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_embedding_concurrency() -> usize {
    1
}

fn default_store() -> String {
    "sqlite".to_string()
}

fn default_database() -> PathBuf {
    PathBuf::from(DATA_DIR).join("documents.sqlite")
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            snippet_chars: default_snippet_chars(),
            max_pdf_bytes: default_max_pdf_bytes(),
            embedding_concurrency: default_embedding_concurrency(),
            embedding: EmbeddingConfig::default(),
            store: default_store(),
            database: default_database(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RagFile {
    #[serde(default)]
    rag: RagConfig,
}

impl RagConfig {
    /// Load the workspace configuration, falling back to defaults when
    /// `.codexplain/rag.yaml` does not exist. The database path is
    /// resolved against `workspace`.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        let path = config_path(workspace);

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                AppError::Config(format!("Failed to read config at {:?}: {}", path, e))
            })?;
            let file: RagFile = serde_yaml::from_str(&content).map_err(|e| {
                AppError::Config(format!("Failed to parse config at {:?}: {}", path, e))
            })?;
            tracing::debug!("Loaded RAG config from {:?}", path);
            file.rag
        } else {
            tracing::debug!("No RAG config at {:?}, using defaults", path);
            Self::default()
        };

        if config.database.is_relative() {
            config.database = workspace.join(&config.database);
        }

        config.validate()?;
        Ok(config)
    }

    /// Write this configuration to `.codexplain/rag.yaml`.
    pub fn save(&self, workspace: &Path) -> AppResult<()> {
        let path = config_path(workspace);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let yaml = serde_yaml::to_string(&RagFile { rag: self.clone() })?;
        fs::write(&path, yaml).map_err(|e| {
            AppError::Config(format!("Failed to write config to {:?}: {}", path, e))
        })?;

        tracing::debug!("Saved RAG config to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be greater than zero".to_string()));
        }
        self.embedding.validate()
    }

    pub fn splitter(&self) -> SplitterConfig {
        SplitterConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }
}

/// Path of the RAG config file inside a workspace.
pub fn config_path(workspace: &Path) -> PathBuf {
    workspace.join(DATA_DIR).join(CONFIG_FILE)
}
