//! Explain command handler.
//!
//! Reads code from a file or stdin and asks the model for a
//! beginner-friendly explanation.

use super::{build_llm, print_json};
use clap::Args;
use codexplain_core::{config::AppConfig, AppError, AppResult};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Explain a code snippet in plain language
#[derive(Args, Debug)]
pub struct ExplainCommand {
    /// File to explain (reads stdin when omitted)
    pub file: Option<PathBuf>,

    /// Language of the code (guessed from the file extension when omitted)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ExplainCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing explain command");

        let code = match &self.file {
            Some(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                AppError::Validation(format!("Failed to read {}: {}", path.display(), e))
            })?,
            None => {
                let mut buf = String::new();
                tokio::io::stdin().read_to_string(&mut buf).await?;
                buf
            }
        };

        let language = self
            .language
            .clone()
            .or_else(|| self.file.as_deref().and_then(language_from_path));

        let llm = build_llm(config)?;
        let explanation =
            codexplain_rag::explain_code(llm.as_ref(), &config.model, &code, language.as_deref())
                .await?;

        if self.json {
            return print_json(&explanation);
        }

        println!("{}", explanation.explanation);
        Ok(())
    }
}

fn language_from_path(path: &Path) -> Option<String> {
    let language = match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
        "rs" => "rust",
        "py" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "kt" => "kotlin",
        "c" | "h" => "c",
        "cc" | "cpp" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "sh" | "bash" => "bash",
        "sql" => "sql",
        _ => return None,
    };
    Some(language.to_string())
}
