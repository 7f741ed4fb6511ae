//! Ingest command handler.
//!
//! Collects PDFs from the given paths and feeds them through the
//! ingestion pipeline one at a time.

use super::{build_pipeline, print_json};
use clap::Args;
use codexplain_core::{config::AppConfig, AppError, AppResult};
use codexplain_rag::IngestResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Ingest PDF files or directories of PDFs
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// PDF files, or directories searched recursively for *.pdf
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Replace chunks already stored under the same filename
    #[arg(long)]
    pub replace: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct IngestFailure {
    path: PathBuf,
    error: String,
}

#[derive(Serialize)]
struct IngestSummary {
    ingested: Vec<IngestResult>,
    failed: Vec<IngestFailure>,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");

        let files = collect_pdfs(&self.paths)?;
        if files.is_empty() {
            return Err(AppError::Validation(
                "No PDF files found in the given paths".to_string(),
            ));
        }
        tracing::info!("Found {} PDF files", files.len());

        let pipeline = build_pipeline(config)?;
        let mut summary = IngestSummary {
            ingested: Vec::new(),
            failed: Vec::new(),
        };

        for path in files {
            let filename = display_name(&path);
            let outcome = match tokio::fs::read(&path).await {
                Ok(bytes) if self.replace => pipeline.replace(&bytes, &filename).await,
                Ok(bytes) => pipeline.ingest(&bytes, &filename).await,
                Err(e) => Err(AppError::Io(e)),
            };

            match outcome {
                Ok(result) => {
                    if !self.json {
                        println!("Ingested {} ({} chunks)", result.filename, result.chunk_count);
                    }
                    summary.ingested.push(result);
                }
                Err(e) => {
                    tracing::warn!("Failed to ingest {:?}: {}", path, e);
                    if !self.json {
                        eprintln!("Failed to ingest {}: {}", path.display(), e);
                    }
                    summary.failed.push(IngestFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        if self.json {
            print_json(&summary)?;
        }

        if summary.ingested.is_empty() {
            return Err(AppError::Other(format!(
                "All {} files failed to ingest",
                summary.failed.len()
            )));
        }
        Ok(())
    }
}

/// Expand `paths` into PDF files. Explicit files are taken as given;
/// directories are walked for `*.pdf` (case-insensitive), sorted.
fn collect_pdfs(paths: &[PathBuf]) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            return Err(AppError::Validation(format!(
                "Path not found: {}",
                path.display()
            )));
        }

        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && is_pdf(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Name stored with each chunk: the file's base name.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
