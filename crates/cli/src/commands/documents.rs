//! Document store maintenance: delete, clear and list.
//!
//! These commands touch only the store, so they work without LLM
//! credentials.

use super::{open_document_store, print_json};
use clap::Args;
use codexplain_core::{config::AppConfig, AppError, AppResult};
use codexplain_rag::DeleteFilter;

/// Delete every chunk of one file
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Filename as shown by `list`
    pub filename: String,
}

impl DeleteCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing delete command for '{}'", self.filename);

        if self.filename.trim().is_empty() {
            return Err(AppError::Validation("Filename is required".to_string()));
        }

        let store = open_document_store(config)?;
        let deleted = store.delete_where(&DeleteFilter::Filename(self.filename.clone()))?;

        if deleted == 0 {
            println!("No chunks found for '{}'", self.filename);
        } else {
            println!("Deleted {} chunks of '{}'", deleted, self.filename);
        }
        Ok(())
    }
}

/// Delete all ingested documents
#[derive(Args, Debug)]
pub struct ClearCommand {}

impl ClearCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clear command");

        let store = open_document_store(config)?;
        let deleted = store.delete_where(&DeleteFilter::All)?;
        println!("Cleared {} chunks", deleted);
        Ok(())
    }
}

/// List ingested files
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing list command");

        let store = open_document_store(config)?;
        let files = store.list_filenames()?;

        if self.json {
            let stats = store.stats()?;
            return print_json(&serde_json::json!({
                "files": files,
                "documents": stats.documents,
                "dimensions": stats.dimensions,
            }));
        }

        if files.is_empty() {
            println!("No documents ingested");
            return Ok(());
        }

        for file in &files {
            println!("{}  ({} chunks)", file.filename, file.chunk_count);
        }
        Ok(())
    }
}
