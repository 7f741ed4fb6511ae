//! Prompt assembly and answer formatting.
//!
//! Retrieved chunks become a numbered context block (`[Source 1]: ...`)
//! that the model is told to cite. The same numbering, in store order, is
//! used for the sources returned to the caller.

use crate::store::RetrievalResult;
use crate::types::SourceRef;
use codexplain_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde::Serialize;

/// Answer returned when the store has nothing to search.
pub const NO_DOCUMENTS_ANSWER: &str = "No relevant documents found. Please upload a PDF first.";

/// Answer returned when the model produced no text.
pub const EMPTY_ANSWER_FALLBACK: &str = "Failed to generate response";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the \
provided context. Use the context to answer the user's question accurately. If the answer is \
not in the context, say so. Always cite your sources by mentioning [Source X] when referencing \
information.";

const CONTEXT_TEMPLATE: &str =
    "{{#each sources}}{{#if @index}}\n\n{{/if}}[Source {{number}}]: {{content}}{{/each}}";

const USER_TEMPLATE: &str = "Context:\n{{context}}\n\nQuestion: {{question}}";

#[derive(Serialize)]
struct ContextEntry<'a> {
    number: usize,
    content: &'a str,
}

#[derive(Serialize)]
struct ContextVars<'a> {
    sources: Vec<ContextEntry<'a>>,
}

#[derive(Serialize)]
struct UserVars<'a> {
    context: &'a str,
    question: &'a str,
}

/// System instruction for grounded answers.
pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// Concatenate results as `[Source i]: <content>`, 1-indexed in the
/// given order and separated by blank lines.
pub fn build_context(results: &[RetrievalResult]) -> AppResult<String> {
    let vars = ContextVars {
        sources: results
            .iter()
            .enumerate()
            .map(|(i, result)| ContextEntry {
                number: i + 1,
                content: &result.content,
            })
            .collect(),
    };
    render(CONTEXT_TEMPLATE, &vars)
}

/// User turn carrying the context block and the question.
pub fn build_user_prompt(context: &str, question: &str) -> AppResult<String> {
    render(USER_TEMPLATE, &UserVars { context, question })
}

/// Source list for the caller: content cut to `snippet_chars` characters
/// followed by `...`, plus filename and similarity.
pub fn format_sources(results: &[RetrievalResult], snippet_chars: usize) -> Vec<SourceRef> {
    results
        .iter()
        .map(|result| SourceRef {
            content: preview(&result.content, snippet_chars),
            filename: result.metadata.filename.clone(),
            similarity: result.similarity,
        })
        .collect()
}

/// The model's text, or the fallback when it is blank.
pub fn finalize_answer(content: &str) -> String {
    if content.trim().is_empty() {
        EMPTY_ANSWER_FALLBACK.to_string()
    } else {
        content.to_string()
    }
}

fn preview(content: &str, max_chars: usize) -> String {
    let mut snippet: String = content.chars().take(max_chars).collect();
    snippet.push_str("...");
    snippet
}

fn render<T: Serialize>(template: &str, vars: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Prompts are plain text; keep quotes and angle brackets intact.
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .render_template(template, vars)
        .map_err(|e| AppError::Other(format!("Failed to render prompt template: {}", e)))
}
