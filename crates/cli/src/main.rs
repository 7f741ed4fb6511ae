//! Codexplain CLI
//!
//! Main entry point for the codexplain command-line tool.
//! Ingests PDFs into a local document store, answers questions from them
//! with cited sources, and explains code snippets in plain language.

mod commands;

use clap::{Parser, Subcommand};
use codexplain_core::{config::AppConfig, logging, AppResult};
use commands::{
    AskCommand, ClearCommand, DeleteCommand, ExplainCommand, IngestCommand, ListCommand,
};
use std::path::PathBuf;

/// Codexplain - ask questions about your PDFs and explain code
#[derive(Parser, Debug)]
#[command(name = "codexplain")]
#[command(about = "Grounded answers from your PDFs and plain-language code explanations", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "CODEXPLAIN_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "CODEXPLAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openai, ollama)
    #[arg(short, long, global = true, env = "CODEXPLAIN_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "CODEXPLAIN_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest PDF files or directories of PDFs
    Ingest(IngestCommand),

    /// Ask a question answered from the ingested documents
    Ask(AskCommand),

    /// Delete every chunk of one file
    Delete(DeleteCommand),

    /// Delete all ingested documents
    Clear(ClearCommand),

    /// List ingested files
    List(ListCommand),

    /// Explain a code snippet in plain language
    Explain(ExplainCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest(_) => "ingest",
            Commands::Ask(_) => "ask",
            Commands::Delete(_) => "delete",
            Commands::Clear(_) => "clear",
            Commands::List(_) => "list",
            Commands::Explain(_) => "explain",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load_with(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Codexplain CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_data_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Delete(cmd) => cmd.execute(&config),
        Commands::Clear(cmd) => cmd.execute(&config),
        Commands::List(cmd) => cmd.execute(&config),
        Commands::Explain(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
