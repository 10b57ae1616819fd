//! Tests for ingestion and search through the embedding index.

use std::sync::Arc;

use async_trait::async_trait;
use lex_rag::document::{Chunk, Metadata, Neighbor};
use lex_rag::error::{RagError, Result};
use lex_rag::{
    EmbeddingIndex, EmbeddingProvider, HashingEmbeddingProvider, InMemoryVectorStore,
    SentenceChunker, VectorStore,
};
use serde_json::{Value, json};

const EPF_PASSAGE: &str = "Section 6. Contributions. The contribution which shall be paid by \
the employer to the Fund shall be ten per cent of the basic wages, dearness allowance and \
retaining allowance for each employee. The employer contribution percentage is fixed by the Act.";

const STUB_PASSAGE: &str = "Recipes for mango chutney require ripe fruit, sugar and slow \
cooking over a low flame until thick.";

async fn index_with(chunk_size: usize, overlap: usize) -> EmbeddingIndex {
    EmbeddingIndex::open(
        "legal_documents",
        Arc::new(HashingEmbeddingProvider::default()),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(SentenceChunker::new(chunk_size, overlap).unwrap()),
    )
    .await
    .unwrap()
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::EmbeddingError { provider: "Failing".into(), message: "quota".into() })
    }

    fn dimensions(&self) -> usize {
        8
    }
}

/// A store that opens fine but cannot be read.
struct UnreachableStore;

#[async_trait]
impl VectorStore for UnreachableStore {
    fn backend(&self) -> &str {
        "Unreachable"
    }

    async fn create_collection(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, _collection: &str, _chunks: &[Chunk]) -> Result<()> {
        Err(RagError::VectorStoreError { backend: "Unreachable".into(), message: "down".into() })
    }

    async fn query(&self, _c: &str, _e: &[f32], _k: usize) -> Result<Vec<Neighbor>> {
        Err(RagError::VectorStoreError { backend: "Unreachable".into(), message: "down".into() })
    }

    async fn list(&self, _collection: &str) -> Result<Vec<Chunk>> {
        Err(RagError::VectorStoreError { backend: "Unreachable".into(), message: "down".into() })
    }
}

#[tokio::test]
async fn search_on_empty_index_returns_nothing() {
    let index = index_with(1000, 200).await;
    assert!(index.search("employer contribution percentage", 5).await.is_empty());
    assert_eq!(index.count().await, 0);
    assert!(index.list().await.is_empty());
}

#[tokio::test]
async fn identical_text_gets_distinct_ids() {
    let index = index_with(1000, 200).await;
    let before = index.count().await;
    let first = index.add(EPF_PASSAGE, "EPF Act 1952", None).await.unwrap();
    let second = index.add(EPF_PASSAGE, "EPF Act 1952", None).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(index.count().await, before + 2);
}

#[tokio::test]
async fn short_passage_is_stored_as_one_chunk() {
    let index = index_with(1000, 200).await;
    let text: String = EPF_PASSAGE.chars().cycle().take(350).collect();
    let doc_id = index.add(&text, "EPF Act 1952", None).await.unwrap();

    let docs = index.list().await;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].doc_id, doc_id);
    assert_eq!(docs[0].chunk_count, 1);
    assert_eq!(docs[0].source, "EPF Act 1952");
}

#[tokio::test]
async fn long_text_groups_chunks_under_one_document() {
    let index = index_with(1000, 200).await;
    let text: String = EPF_PASSAGE.chars().cycle().take(2500).collect();
    let mut metadata = Metadata::new();
    metadata.insert("type".to_string(), Value::from("legal_act"));
    let doc_id = index.add(&text, "EPF Act 1952", Some(metadata)).await.unwrap();
    index.add(STUB_PASSAGE, "Cookbook", None).await.unwrap();

    let docs = index.list().await;
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].doc_id, doc_id);
    assert_eq!(docs[0].chunk_count, 3);
    assert_eq!(docs[0].metadata["type"], json!("legal_act"));
    assert_eq!(docs[0].metadata["chunk_index"], json!(0));
    assert_eq!(docs[1].source, "Cookbook");
    assert_eq!(index.count().await, 2);
}

#[tokio::test]
async fn empty_text_is_an_ingest_error() {
    let index = index_with(1000, 200).await;
    let err = index.add("   \n ", "Blank", None).await.unwrap_err();
    assert!(matches!(err, RagError::IngestError(_)));
    assert_eq!(index.count().await, 0);
}

#[tokio::test]
async fn epf_query_ranks_epf_document_first() {
    let index = index_with(1000, 200).await;
    index.add(STUB_PASSAGE, "Cookbook", None).await.unwrap();
    index.add(EPF_PASSAGE, "EPF Act 1952", None).await.unwrap();

    let results = index.search("employer contribution percentage", 5).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].source(), Some("EPF Act 1952"));
    assert!(results[0].score >= results[1].score);
    assert!(results[0].score > 0.0);
}

#[tokio::test]
async fn results_are_bounded_sorted_and_scored_in_unit_range() {
    let index = index_with(120, 30).await;
    let text: String = EPF_PASSAGE.chars().cycle().take(1500).collect();
    index.add(&text, "EPF Act 1952", None).await.unwrap();
    index.add(STUB_PASSAGE, "Cookbook", None).await.unwrap();

    for k in [1, 3, 7, 50] {
        let results = index.search("basic wages of each employee", k).await;
        assert!(results.len() <= k);
        for r in &results {
            assert!((0.0..=1.0).contains(&r.score));
            assert!(r.metadata.contains_key("doc_id"));
            assert!(r.metadata.contains_key("chunk_id"));
        }
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
    assert!(index.search("anything", 0).await.is_empty());
}

#[tokio::test]
async fn search_absorbs_embedding_failures() {
    let index = EmbeddingIndex::open(
        "legal_documents",
        Arc::new(FailingEmbedder),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(SentenceChunker::new(1000, 200).unwrap()),
    )
    .await
    .unwrap();

    assert!(index.search("employer", 5).await.is_empty());
    assert!(matches!(
        index.try_search("employer", 5).await,
        Err(RagError::EmbeddingError { .. })
    ));
    assert!(matches!(
        index.add(EPF_PASSAGE, "EPF Act 1952", None).await,
        Err(RagError::EmbeddingError { .. })
    ));
}

#[tokio::test]
async fn unreachable_store_degrades_reads_and_fails_writes() {
    let index = EmbeddingIndex::open(
        "legal_documents",
        Arc::new(HashingEmbeddingProvider::default()),
        Arc::new(UnreachableStore),
        Arc::new(SentenceChunker::new(1000, 200).unwrap()),
    )
    .await
    .unwrap();

    assert!(index.search("employer", 5).await.is_empty());
    assert_eq!(index.count().await, 0);
    assert!(index.list().await.is_empty());
    assert!(matches!(
        index.add(EPF_PASSAGE, "EPF Act 1952", None).await,
        Err(RagError::VectorStoreError { .. })
    ));
}

#[tokio::test]
async fn concurrent_ingests_are_all_stored() {
    let index = Arc::new(index_with(200, 50).await);
    let mut handles = Vec::new();
    for i in 0..8 {
        let index = Arc::clone(&index);
        handles.push(tokio::spawn(async move {
            index.add(EPF_PASSAGE, &format!("copy {i}"), None).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(index.count().await, 8);
}
