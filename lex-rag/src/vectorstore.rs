//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, Neighbor};
use crate::error::Result;

/// A storage backend for embedded chunks with nearest-neighbor search.
///
/// Implementations manage named collections of [`Chunk`]s. Collections are
/// append-only: chunks are never updated or removed once inserted, and the
/// index gives every chunk a fresh `chunk_id`.
///
/// # Example
///
/// ```rust,ignore
/// use lex_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("legal_documents").await?;
/// store.insert("legal_documents", &chunks).await?;
/// let neighbors = store.query("legal_documents", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name used in logs and errors.
    fn backend(&self) -> &str;

    /// Create a named collection, or open it if it already exists.
    async fn create_collection(&self, name: &str) -> Result<()>;

    /// Append chunks to a collection in one write. Chunks must have
    /// embeddings set.
    async fn insert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Return up to `top_k` chunks nearest to `embedding`, closest first.
    async fn query(&self, collection: &str, embedding: &[f32], top_k: usize)
    -> Result<Vec<Neighbor>>;

    /// Return every chunk in the collection in insertion order.
    async fn list(&self, collection: &str) -> Result<Vec<Chunk>>;
}

/// Cosine distance (`1 - cosine similarity`) between two vectors.
///
/// Returns 1.0 (orthogonal) if either vector has zero magnitude or the
/// dimensions disagree.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Rank `chunks` by distance to `embedding` and keep the nearest `top_k`.
pub(crate) fn nearest<'a>(
    chunks: impl Iterator<Item = &'a Chunk>,
    embedding: &[f32],
    top_k: usize,
) -> Vec<Neighbor> {
    let mut scored: Vec<Neighbor> = chunks
        .map(|chunk| Neighbor {
            distance: cosine_distance(&chunk.embedding, embedding),
            chunk: chunk.clone(),
        })
        .collect();

    scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    scored.truncate(top_k);
    scored
}
