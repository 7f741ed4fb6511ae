//! Retrieval scenarios.

use super::support::*;
use crate::composer::{EMPTY_ANSWER_FALLBACK, NO_DOCUMENTS_ANSWER};
use crate::config::RagConfig;
use crate::pipeline::RagPipeline;
use crate::store::MemoryStore;
use codexplain_core::AppError;
use std::sync::Arc;

const BIOLOGY: &str = "The mitochondria is the powerhouse of the cell. It produces ATP \
through cellular respiration, consuming oxygen and glucose.";

const ASTRONOMY: &str = "Jupiter is the largest planet in the solar system. Its great red \
spot is a storm larger than Earth.";

const COOKING: &str = "Risotto needs arborio rice, warm stock added slowly, and constant \
stirring to release starch.";

#[tokio::test]
async fn test_empty_store_returns_canned_answer() {
    let (pipeline, _store, llm) = memory_pipeline("should not be used");

    let answer = pipeline.retrieve("anything", 5).await.unwrap();

    assert_eq!(answer.answer, NO_DOCUMENTS_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_round_trip_finds_ingested_text() {
    let (pipeline, _store, llm) = memory_pipeline("ATP comes from mitochondria [Source 1].");
    pipeline.ingest(&fake_pdf(BIOLOGY), "bio.pdf").await.unwrap();
    pipeline.ingest(&fake_pdf(ASTRONOMY), "space.pdf").await.unwrap();

    let answer = pipeline
        .retrieve("What is the powerhouse of the cell?", 5)
        .await
        .unwrap();

    assert_eq!(answer.answer, "ATP comes from mitochondria [Source 1].");
    assert_eq!(answer.sources[0].filename, "bio.pdf");
    assert!(answer.sources[0]
        .content
        .contains("The mitochondria is the powerhouse of the cell."));

    let request = llm.last_request().unwrap();
    assert!(request.prompt.starts_with("Context:\n[Source 1]: The mitochondria"));
    assert!(request
        .prompt
        .ends_with("\n\nQuestion: What is the powerhouse of the cell?"));
}

#[tokio::test]
async fn test_round_trip_through_pdf_parser() {
    let store = Arc::new(MemoryStore::new(DIMS));
    let llm = Arc::new(ScriptedLlm::answering("Mitochondria [Source 1]."));
    let pipeline = RagPipeline::new(test_config(), mock_embedder(), store, llm, "test-model")
        .unwrap();

    let ingested = pipeline
        .ingest(
            &minimal_pdf("The mitochondria is the powerhouse of the cell."),
            "bio.pdf",
        )
        .await
        .unwrap();
    assert_eq!(ingested.chunk_count, 1);

    let answer = pipeline.retrieve("powerhouse of the cell", 3).await.unwrap();
    assert_eq!(answer.sources[0].filename, "bio.pdf");
    assert!(answer.sources[0]
        .content
        .contains("The mitochondria is the powerhouse of the cell."));
}

#[tokio::test]
async fn test_sources_follow_store_order_and_numbering() {
    let (pipeline, _store, llm) = memory_pipeline("Answer.");
    pipeline.ingest(&fake_pdf(BIOLOGY), "bio.pdf").await.unwrap();
    pipeline.ingest(&fake_pdf(ASTRONOMY), "space.pdf").await.unwrap();
    pipeline.ingest(&fake_pdf(COOKING), "food.pdf").await.unwrap();

    let answer = pipeline.retrieve("largest planet storm", 3).await.unwrap();
    let prompt = llm.last_request().unwrap().prompt;

    assert_eq!(answer.sources.len(), 3);
    assert_eq!(answer.sources[0].filename, "space.pdf");
    for pair in answer.sources.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
    for (i, source) in answer.sources.iter().enumerate() {
        let body = source.content.trim_end_matches("...");
        assert!(
            prompt.contains(&format!("[Source {}]: {}", i + 1, body)),
            "source {} missing from prompt",
            i + 1
        );
    }
    assert!(prompt.contains(".\n\n[Source 2]: "));
}

#[tokio::test]
async fn test_request_parameters() {
    let (pipeline, _store, llm) = memory_pipeline("Answer.");
    pipeline.ingest(&fake_pdf(COOKING), "food.pdf").await.unwrap();

    pipeline.retrieve("How is risotto made?", 5).await.unwrap();
    let request = llm.last_request().unwrap();

    assert_eq!(request.model, "test-model");
    assert_eq!(request.temperature, Some(0.3));
    assert_eq!(request.max_tokens, Some(800));
    assert!(request.system.unwrap().contains("[Source X]"));
}

#[tokio::test]
async fn test_source_previews_are_truncated() {
    let (pipeline, _store, _llm) = memory_pipeline("Answer.");
    let text = topic_text("glaciers", 20);
    pipeline.ingest(&fake_pdf(&text), "ice.pdf").await.unwrap();

    let answer = pipeline.retrieve("glaciers", 1).await.unwrap();
    let preview = &answer.sources[0].content;

    assert_eq!(preview.chars().count(), 203);
    assert!(preview.ends_with("..."));
}

#[tokio::test]
async fn test_top_k_limits_sources() {
    let (pipeline, _store, _llm) = memory_pipeline("Answer.");
    for topic in ["rivers", "deserts", "forests", "oceans"] {
        pipeline
            .ingest(&fake_pdf(&topic_text(topic, 3)), &format!("{}.pdf", topic))
            .await
            .unwrap();
    }

    let answer = pipeline.retrieve("forests", 2).await.unwrap();
    assert_eq!(answer.sources.len(), 2);
}

#[tokio::test]
async fn test_retrieve_default_uses_configured_top_k() {
    let store = Arc::new(MemoryStore::new(DIMS));
    let llm = Arc::new(ScriptedLlm::answering("Answer."));
    let config = RagConfig {
        top_k: 1,
        ..test_config()
    };
    let pipeline = pipeline_with(config, store, llm);
    pipeline.ingest(&fake_pdf(BIOLOGY), "bio.pdf").await.unwrap();
    pipeline.ingest(&fake_pdf(ASTRONOMY), "space.pdf").await.unwrap();

    let answer = pipeline.retrieve_default("cell").await.unwrap();
    assert_eq!(answer.sources.len(), 1);
}

#[tokio::test]
async fn test_llm_failure_is_retrieval_error() {
    let store = Arc::new(MemoryStore::new(DIMS));
    let llm = Arc::new(ScriptedLlm::failing("503 Service Unavailable"));
    let pipeline = pipeline_with(test_config(), store, llm);
    pipeline.ingest(&fake_pdf(BIOLOGY), "bio.pdf").await.unwrap();

    match pipeline.retrieve("mitochondria", 5).await {
        Err(AppError::Retrieval(msg)) => {
            assert!(msg.starts_with("Answer generation failed"));
            assert!(msg.contains("503"));
        }
        other => panic!("expected retrieval error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_llm_reply_uses_fallback() {
    let (pipeline, _store, _llm) = memory_pipeline("");
    pipeline.ingest(&fake_pdf(BIOLOGY), "bio.pdf").await.unwrap();

    let answer = pipeline.retrieve("mitochondria", 5).await.unwrap();

    assert_eq!(answer.answer, EMPTY_ANSWER_FALLBACK);
    assert_eq!(answer.sources.len(), 1);
}

#[tokio::test]
async fn test_search_failure_is_retrieval_error() {
    let llm = Arc::new(ScriptedLlm::answering("unused"));
    let pipeline = pipeline_with(test_config(), Arc::new(BrokenStore), llm.clone());

    match pipeline.retrieve("anything", 5).await {
        Err(AppError::Retrieval(msg)) => assert!(msg.starts_with("Similarity search failed")),
        other => panic!("expected retrieval error, got {:?}", other),
    }
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_invalid_queries() {
    let (pipeline, _store, _llm) = memory_pipeline("unused");

    assert_eq!(
        pipeline.retrieve("   ", 5).await.unwrap_err().kind(),
        "validation"
    );
    assert_eq!(
        pipeline.retrieve("question", 0).await.unwrap_err().kind(),
        "validation"
    );
}

#[tokio::test]
async fn test_retrieval_is_deterministic() {
    let (pipeline, _store, _llm) = memory_pipeline("Answer.");
    pipeline.ingest(&fake_pdf(BIOLOGY), "bio.pdf").await.unwrap();
    pipeline.ingest(&fake_pdf(COOKING), "food.pdf").await.unwrap();

    let first = pipeline.retrieve("rice stock", 2).await.unwrap();
    let second = pipeline.retrieve("rice stock", 2).await.unwrap();
    assert_eq!(first, second);
}
