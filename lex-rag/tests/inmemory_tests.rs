//! Property tests for in-memory vector store search ordering.

use lex_rag::document::{Chunk, Metadata};
use lex_rag::inmemory::InMemoryVectorStore;
use lex_rag::vectorstore::VectorStore;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

fn chunk(index: usize, text: String, embedding: Vec<f32>) -> Chunk {
    Chunk {
        chunk_id: Chunk::id_for("doc_1", index),
        doc_id: "doc_1".to_string(),
        chunk_index: index,
        text,
        embedding,
        metadata: Metadata::new(),
    }
}

/// *For any* set of embedded chunks, querying returns at most `top_k`
/// neighbors ordered by non-decreasing cosine distance.
mod prop_inmemory_query_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn neighbors_ordered_by_distance_and_bounded_by_top_k(
            entries in proptest::collection::vec(("[a-z ]{5,30}", arb_normalized_embedding(DIM)), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let count = entries.len();
            let neighbors = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test").await.unwrap();

                let chunks: Vec<Chunk> = entries
                    .into_iter()
                    .enumerate()
                    .map(|(i, (text, embedding))| chunk(i, text, embedding))
                    .collect();
                store.insert("test", &chunks).await.unwrap();
                store.query("test", &query, top_k).await.unwrap()
            });

            prop_assert!(neighbors.len() <= top_k);
            prop_assert_eq!(neighbors.len(), top_k.min(count));

            for window in neighbors.windows(2) {
                prop_assert!(
                    window[0].distance <= window[1].distance,
                    "neighbors not in ascending distance: {} > {}",
                    window[0].distance,
                    window[1].distance,
                );
            }
            for n in &neighbors {
                prop_assert!((-1e-4..=2.0 + 1e-4).contains(&n.distance));
            }
        }
    }
}

#[tokio::test]
async fn insert_into_missing_collection_fails() {
    let store = InMemoryVectorStore::new();
    let err = store.insert("absent", &[chunk(0, "x".into(), vec![1.0])]).await.unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn list_preserves_insertion_order() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs").await.unwrap();
    store
        .insert("docs", &[chunk(0, "first".into(), vec![1.0, 0.0]), chunk(1, "second".into(), vec![0.0, 1.0])])
        .await
        .unwrap();
    store.insert("docs", &[chunk(2, "third".into(), vec![1.0, 0.0])]).await.unwrap();

    let texts: Vec<String> = store.list("docs").await.unwrap().into_iter().map(|c| c.text).collect();
    assert_eq!(texts, vec!["first".to_string(), "second".to_string(), "third".to_string()]);
}

#[tokio::test]
async fn create_collection_is_idempotent() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs").await.unwrap();
    store.insert("docs", &[chunk(0, "kept".into(), vec![1.0])]).await.unwrap();
    store.create_collection("docs").await.unwrap();
    assert_eq!(store.list("docs").await.unwrap().len(), 1);
}
