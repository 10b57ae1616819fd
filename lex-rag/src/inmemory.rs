//! In-memory vector store using cosine distance.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by
//! per-collection chunk lists in insertion order, protected by a
//! `tokio::sync::RwLock`.
//! It is suitable for development, testing and short-lived processes.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, Neighbor};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, nearest};

const BACKEND: &str = "InMemory";

pub(crate) fn missing_collection(backend: &str, name: &str) -> RagError {
    RagError::store(backend, format!("collection '{name}' does not exist"))
}

/// An in-memory vector store using cosine distance for search.
///
/// All operations are async-safe via `tokio::sync::RwLock`: queries share a
/// read guard, inserts take the write guard.
///
/// # Example
///
/// ```rust,ignore
/// use lex_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("legal_documents").await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<Chunk>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn insert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store =
            collections.get_mut(collection).ok_or_else(|| missing_collection(BACKEND, collection))?;
        store.extend_from_slice(chunks);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<Neighbor>> {
        let collections = self.collections.read().await;
        let store =
            collections.get(collection).ok_or_else(|| missing_collection(BACKEND, collection))?;
        Ok(nearest(store.iter(), embedding, top_k))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Chunk>> {
        let collections = self.collections.read().await;
        let store =
            collections.get(collection).ok_or_else(|| missing_collection(BACKEND, collection))?;
        Ok(store.clone())
    }
}
