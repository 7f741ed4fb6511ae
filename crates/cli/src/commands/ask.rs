//! Ask command handler.
//!
//! Answers a question from the ingested documents and prints the cited
//! sources.

use super::{build_pipeline, print_json};
use clap::Args;
use codexplain_core::{config::AppConfig, AppResult};

/// Ask a question answered from the ingested documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Number of chunks to retrieve (default from rag.yaml)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let pipeline = build_pipeline(config)?;
        let answer = match self.top_k {
            Some(k) => pipeline.retrieve(&self.query, k).await?,
            None => pipeline.retrieve_default(&self.query).await?,
        };

        if self.json {
            return print_json(&answer);
        }

        println!("Answer:");
        println!("{}", answer.answer);
        println!();

        if answer.sources.is_empty() {
            println!("Sources: (no sources available)");
        } else {
            println!("Sources:");
            for (i, source) in answer.sources.iter().enumerate() {
                println!(
                    "[Source {}] {} ({:.1}% similar)",
                    i + 1,
                    source.filename,
                    source.similarity * 100.0
                );
                println!("    {}", source.content.replace('\n', " "));
            }
        }

        Ok(())
    }
}
