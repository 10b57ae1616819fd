//! The embedding index: chunk → embed → store on ingest, embed → query on
//! search.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chunking::Chunker;
use crate::document::{Document, DocumentSummary, Metadata, QueryResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Convert a cosine distance into a similarity score in `[0, 1]`.
pub fn distance_to_score(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Chunks, embeds and stores documents in one collection, and answers
/// nearest-neighbor queries over them.
///
/// Searches run concurrently. Inserts are serialized through a single-writer
/// lock so two ingests never interleave their store writes.
pub struct EmbeddingIndex {
    collection: String,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    writer: Mutex<()>,
}

impl EmbeddingIndex {
    /// Open (or create) `collection` in `vector_store`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the collection cannot be created or loaded.
    pub async fn open(
        collection: impl Into<String>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        chunker: Arc<dyn Chunker>,
    ) -> Result<Self> {
        let collection = collection.into();
        vector_store.create_collection(&collection).await.map_err(|e| {
            error!(collection = %collection, error = %e, "failed to open collection");
            e
        })?;

        Ok(Self { collection, embedding_provider, vector_store, chunker, writer: Mutex::new(()) })
    }

    /// The collection this index reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Ingest `text` as a new document and return its fresh `doc_id`.
    ///
    /// Identical text ingested twice yields two documents.
    ///
    /// # Errors
    ///
    /// - [`RagError::IngestError`] if `text` is empty after trimming.
    /// - [`RagError::EmbeddingError`] if the provider fails or returns the
    ///   wrong number of vectors.
    /// - [`RagError::VectorStoreError`] if the insert fails.
    pub async fn add(&self, text: &str, source: &str, metadata: Option<Metadata>) -> Result<String> {
        if text.trim().is_empty() {
            return Err(RagError::IngestError(format!("document '{source}' has no text")));
        }

        let document = Document {
            doc_id: Uuid::new_v4().to_string(),
            source: source.to_string(),
            text: text.to_string(),
            metadata: metadata.unwrap_or_default(),
        };

        let mut chunks = self.chunker.chunk(&document);
        if chunks.is_empty() {
            return Err(RagError::IngestError(format!("document '{source}' produced no chunks")));
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(doc_id = %document.doc_id, error = %e, "embedding failed during ingestion");
            e
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: self.embedding_provider.name().to_string(),
                message: format!(
                    "expected {} embeddings, received {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        {
            let _writer = self.writer.lock().await;
            self.vector_store.insert(&self.collection, &chunks).await.map_err(|e| {
                error!(doc_id = %document.doc_id, error = %e, "insert failed during ingestion");
                e
            })?;
        }

        info!(doc_id = %document.doc_id, source, chunk_count = chunks.len(), "ingested document");
        Ok(document.doc_id)
    }

    /// Search for the `top_k` chunks most similar to `query`.
    ///
    /// Never fails: embedding or store errors are logged and produce an empty
    /// list. Use [`try_search`](Self::try_search) to observe the failure.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<QueryResult> {
        match self.try_search(query, top_k).await {
            Ok(results) => results,
            Err(e) => {
                warn!(collection = %self.collection, error = %e, "search failed, returning no results");
                Vec::new()
            }
        }
    }

    /// Search for the `top_k` chunks most similar to `query`, sorted by
    /// non-increasing score.
    ///
    /// # Errors
    ///
    /// Returns the embedding provider's or vector store's error.
    pub async fn try_search(&self, query: &str, top_k: usize) -> Result<Vec<QueryResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedding_provider.embed(query).await?;
        let neighbors = self.vector_store.query(&self.collection, &embedding, top_k).await?;

        let mut results: Vec<QueryResult> = neighbors
            .into_iter()
            .map(|n| QueryResult {
                content: n.chunk.text,
                metadata: n.chunk.metadata,
                score: distance_to_score(n.distance),
            })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        Ok(results)
    }

    /// Number of distinct documents stored. Zero if the store is unreadable.
    pub async fn count(&self) -> usize {
        match self.vector_store.list(&self.collection).await {
            Ok(chunks) => chunks.iter().map(|c| c.doc_id.as_str()).collect::<HashSet<_>>().len(),
            Err(e) => {
                warn!(collection = %self.collection, error = %e, "failed to count documents");
                0
            }
        }
    }

    /// One summary per stored document, in first-ingested order. Empty if the
    /// store is unreadable.
    pub async fn list(&self) -> Vec<DocumentSummary> {
        let chunks = match self.vector_store.list(&self.collection).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(collection = %self.collection, error = %e, "failed to list documents");
                return Vec::new();
            }
        };

        let mut order: Vec<DocumentSummary> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for chunk in chunks {
            if let Some(&pos) = positions.get(&chunk.doc_id) {
                order[pos].chunk_count += 1;
                continue;
            }
            positions.insert(chunk.doc_id.clone(), order.len());
            order.push(DocumentSummary {
                source: chunk.source().unwrap_or("Unknown").to_string(),
                doc_id: chunk.doc_id,
                chunk_count: 1,
                metadata: chunk.metadata,
            });
        }
        order
    }
}
