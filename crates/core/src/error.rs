//! Error types shared by every Codexplain crate.
//!
//! The document pipeline raises a small set of distinguishable error kinds
//! (parse, embedding, store, retrieval, validation). Everything else the
//! application can run into (configuration, I/O, LLM transport,
//! serialization) lives in the same enum so callers only ever deal with
//! one `Result` type.

use thiserror::Error;

/// Unified error type for Codexplain.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable or empty PDF input
    #[error("Parse error: {0}")]
    Parse(String),

    /// Embedding model failed to load or infer, or produced a vector of
    /// the wrong width
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Document store insert, search or delete failures
    #[error("Store error: {0}")]
    Store(String),

    /// Similarity search or answer generation failed during retrieval
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Missing or malformed caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Stable tag for the error kind, suitable for structured responses.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Parse(_) => "parse",
            AppError::Embedding(_) => "embedding",
            AppError::Store(_) => "store",
            AppError::Retrieval(_) => "retrieval",
            AppError::Validation(_) => "validation",
            AppError::Llm(_) => "llm",
            AppError::Serialization(_) => "serialization",
            AppError::Other(_) => "other",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let errors = [
            AppError::Parse("x".into()),
            AppError::Embedding("x".into()),
            AppError::Store("x".into()),
            AppError::Retrieval("x".into()),
            AppError::Validation("x".into()),
        ];
        let kinds: std::collections::HashSet<_> = errors.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_error_display_includes_message() {
        let err = AppError::Store("insert rejected".to_string());
        assert_eq!(err.to_string(), "Store error: insert rejected");
    }

    #[test]
    fn test_serde_json_error_converts() {
        let err: AppError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.kind(), "serialization");
    }
}
