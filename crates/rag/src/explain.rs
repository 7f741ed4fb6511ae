//! Plain-language explanations of code and prose, without retrieval.

use crate::types::CodeExplanation;
use codexplain_core::{AppError, AppResult};
use codexplain_llm::{LlmClient, LlmRequest};

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 400;
const UNKNOWN_LANGUAGE: &str = "unknown";

/// Ask the model to explain `code` for a beginner.
///
/// # Errors
/// `Validation` for blank code; `Llm` when the call fails or the model
/// returns nothing.
pub async fn explain_code(
    llm: &dyn LlmClient,
    model: &str,
    code: &str,
    language: Option<&str>,
) -> AppResult<CodeExplanation> {
    if code.trim().is_empty() {
        return Err(AppError::Validation("Code is required".to_string()));
    }

    let language = language.map(str::trim).filter(|l| !l.is_empty());
    let prompt = code_prompt(code, language);

    tracing::info!(
        "Explaining {} code ({} chars)",
        language.unwrap_or(UNKNOWN_LANGUAGE),
        code.chars().count()
    );
    let explanation = complete(llm, model, prompt, "Failed to explain code").await?;

    Ok(CodeExplanation {
        explanation,
        language: language.unwrap_or(UNKNOWN_LANGUAGE).to_string(),
    })
}

/// Ask the model to explain a piece of research in simple terms.
pub async fn explain_text(
    llm: &dyn LlmClient,
    model: &str,
    text: &str,
) -> AppResult<CodeExplanation> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("Text is required".to_string()));
    }

    let prompt = format!("Please explain this research in simple terms:\n{}", text);
    let explanation = complete(llm, model, prompt, "Failed to explain research").await?;

    Ok(CodeExplanation {
        explanation,
        language: UNKNOWN_LANGUAGE.to_string(),
    })
}

fn code_prompt(code: &str, language: Option<&str>) -> String {
    let (label, fence) = match language {
        Some(lang) => (format!("{} code", lang), lang),
        None => ("code".to_string(), ""),
    };

    format!(
        "Please explain this {} in simple terms:\n\n```{}\n{}\n```\n\nKeep it concise and beginner-friendly.",
        label, fence, code
    )
}

async fn complete(
    llm: &dyn LlmClient,
    model: &str,
    prompt: String,
    empty_message: &str,
) -> AppResult<String> {
    let request = LlmRequest::new(prompt, model)
        .with_temperature(TEMPERATURE)
        .with_max_tokens(MAX_TOKENS);

    let response = llm.complete(&request).await?;
    if response.content.trim().is_empty() {
        return Err(AppError::Llm(empty_message.to_string()));
    }
    Ok(response.content)
}
