//! Tests for the answer and summary paths of the orchestrator.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lex_rag::error::{RagError, Result};
use lex_rag::{
    EmbeddingIndex, EmbeddingProvider, FALLBACK_ANSWER, GenerationProvider,
    HashingEmbeddingProvider, InMemoryVectorStore, RagConfig, RagOrchestrator, SUMMARY_FALLBACK,
    SentenceChunker, seed_sample_documents,
};
use serde_json::json;

/// Echoes a fixed answer and records the prompts it saw.
#[derive(Default)]
struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl GenerationProvider for RecordingGenerator {
    fn name(&self) -> &str {
        "Recording"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Employers contribute ten per cent under Section 6.".to_string())
    }
}

struct FailingGenerator;

#[async_trait]
impl GenerationProvider for FailingGenerator {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(RagError::GenerationError { provider: "Failing".into(), message: "quota exceeded".into() })
    }
}

struct SlowGenerator;

#[async_trait]
impl GenerationProvider for SlowGenerator {
    fn name(&self) -> &str {
        "Slow"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("too late".to_string())
    }
}

struct CountingFailingEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for CountingFailingEmbedder {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RagError::EmbeddingError { provider: "Failing".into(), message: "offline".into() })
    }

    fn dimensions(&self) -> usize {
        8
    }
}

async fn seeded_index() -> Arc<EmbeddingIndex> {
    let index = EmbeddingIndex::open(
        "legal_documents",
        Arc::new(HashingEmbeddingProvider::default()),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(SentenceChunker::new(1000, 200).unwrap()),
    )
    .await
    .unwrap();
    seed_sample_documents(&index).await.unwrap();
    Arc::new(index)
}

#[tokio::test]
async fn successful_answer_reports_sources_and_context() {
    let generator = Arc::new(RecordingGenerator::default());
    let orchestrator =
        RagOrchestrator::new(RagConfig::default(), seeded_index().await, generator.clone());

    let response = orchestrator.get_response("employer contribution percentage", 2).await;

    assert!(response.error.is_none());
    assert!(!response.is_degraded());
    assert_eq!(response.answer, "Employers contribute ten per cent under Section 6.");
    assert_eq!(response.context_used, 2);
    assert_eq!(response.sources.len(), 2);
    assert_eq!(response.sources[0]["source"], json!("EPF Act 1952"));
    assert!(response.processing_time >= 0.0);

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("User Question: employer contribution percentage"));
    assert!(prompts[0].contains("Document 1:\nSource: EPF Act 1952\nContent: "));
}

#[tokio::test]
async fn generation_failure_degrades_with_retrieved_count() {
    let orchestrator =
        RagOrchestrator::new(RagConfig::default(), seeded_index().await, Arc::new(FailingGenerator));

    let response = orchestrator.get_response("annual general meeting", 3).await;

    assert_eq!(response.answer, FALLBACK_ANSWER);
    assert!(response.sources.is_empty());
    assert_eq!(response.context_used, 3);
    let error = response.error.expect("error is set");
    assert!(error.contains("generation failed"));
    assert!(error.contains("quota exceeded"));
}

#[tokio::test]
async fn retrieval_failure_degrades_with_no_context() {
    let embedder = Arc::new(CountingFailingEmbedder { calls: AtomicUsize::new(0) });
    let index = EmbeddingIndex::open(
        "legal_documents",
        embedder.clone(),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(SentenceChunker::new(1000, 200).unwrap()),
    )
    .await
    .unwrap();
    let generator = Arc::new(RecordingGenerator::default());
    let orchestrator = RagOrchestrator::new(RagConfig::default(), Arc::new(index), generator.clone());

    let response = orchestrator.get_response("employer contribution", 5).await;

    assert_eq!(response.answer, FALLBACK_ANSWER);
    assert_eq!(response.context_used, 0);
    assert!(response.sources.is_empty());
    assert!(response.error.as_deref().is_some_and(|e| e.starts_with("retrieval failed")));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    assert!(generator.prompts.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_generation_times_out_into_fallback() {
    let config = RagConfig::builder().generation_timeout_secs(5).build().unwrap();
    let orchestrator = RagOrchestrator::new(config, seeded_index().await, Arc::new(SlowGenerator));

    let response = orchestrator.get_response("TDS on salary", 2).await;
    assert_eq!(response.answer, FALLBACK_ANSWER);
    assert_eq!(response.context_used, 2);
    assert!(response.error.as_deref().is_some_and(|e| e.contains("timed out")));

    assert_eq!(orchestrator.summarize_text("Section 192.").await, SUMMARY_FALLBACK);
}

#[tokio::test]
async fn empty_index_still_answers() {
    let index = EmbeddingIndex::open(
        "legal_documents",
        Arc::new(HashingEmbeddingProvider::default()),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(SentenceChunker::new(1000, 200).unwrap()),
    )
    .await
    .unwrap();
    let generator = Arc::new(RecordingGenerator::default());
    let orchestrator = RagOrchestrator::new(RagConfig::default(), Arc::new(index), generator.clone());

    let response = orchestrator.get_response("anything", 5).await;
    assert!(response.error.is_none());
    assert_eq!(response.context_used, 0);
    assert!(response.sources.is_empty());
    assert!(generator.prompts.lock().unwrap()[0].contains("Context from Legal Documents:\n\n"));
}

#[tokio::test]
async fn summarize_uses_summary_template() {
    let generator = Arc::new(RecordingGenerator::default());
    let orchestrator =
        RagOrchestrator::new(RagConfig::default(), seeded_index().await, generator.clone());

    let summary = orchestrator.summarize_text("Every company shall keep books of account.").await;
    assert_eq!(summary, "Employers contribute ten per cent under Section 6.");
    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].starts_with("Summarize the following legal text clearly and concisely:"));
    assert!(prompts[0].contains("Every company shall keep books of account."));
}

#[tokio::test]
async fn summarize_failure_returns_fallback() {
    let orchestrator =
        RagOrchestrator::new(RagConfig::default(), seeded_index().await, Arc::new(FailingGenerator));
    assert_eq!(orchestrator.summarize_text("Section 96.").await, SUMMARY_FALLBACK);
}

#[tokio::test]
async fn builder_requires_all_parts_and_valid_config() {
    let missing = RagOrchestrator::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .await;
    assert!(matches!(missing, Err(RagError::ConfigError(m)) if m.contains("generation_provider")));

    let invalid = RagOrchestrator::builder()
        .config(RagConfig { chunk_overlap: 1000, ..RagConfig::default() })
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generation_provider(Arc::new(FailingGenerator))
        .build()
        .await;
    assert!(matches!(invalid, Err(RagError::ConfigError(_))));
}

#[tokio::test]
async fn facade_delegates_to_index() {
    let orchestrator = RagOrchestrator::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generation_provider(Arc::new(RecordingGenerator::default()))
        .build()
        .await
        .unwrap();

    assert_eq!(orchestrator.count_documents().await, 0);
    let doc_id = orchestrator
        .add_document("Section 192. Tax shall be deducted at source from salary.", "TDS", None)
        .await
        .unwrap();
    assert_eq!(orchestrator.count_documents().await, 1);
    assert_eq!(orchestrator.list_documents().await[0].doc_id, doc_id);
    let hits = orchestrator.search("salary tax", 5).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].metadata["doc_id"], json!(doc_id));
}

#[tokio::test]
async fn seeding_is_idempotent() {
    let index = seeded_index().await;
    assert_eq!(index.count().await, 3);
    assert_eq!(seed_sample_documents(&index).await.unwrap(), 0);
    assert_eq!(index.count().await, 3);
}
