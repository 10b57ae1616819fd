//! RAG orchestrator.
//!
//! The [`RagOrchestrator`] answers a question by walking
//! `RETRIEVE → ASSEMBLE → GENERATE` and ends in either a grounded answer or a
//! degraded one. It composes an [`EmbeddingIndex`] with a
//! [`GenerationProvider`] and never returns an error from
//! [`get_response`](RagOrchestrator::get_response) or
//! [`summarize_text`](RagOrchestrator::summarize_text).
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_rag::{RagOrchestrator, RagConfig, LanceVectorStore, HashingEmbeddingProvider};
//!
//! let orchestrator = RagOrchestrator::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .vector_store(Arc::new(LanceVectorStore::open("./data/embeddings", 512).await?))
//!     .generation_provider(Arc::new(my_generator))
//!     .build()
//!     .await?;
//!
//! let response = orchestrator.get_response("What does Section 6 require?", 5).await;
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::chunking::{Chunker, SentenceChunker};
use crate::config::RagConfig;
use crate::context::assemble_context;
use crate::document::{DocumentSummary, Metadata, QueryResult, RagResponse};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::index::EmbeddingIndex;
use crate::prompt::{build_prompt, build_summary_prompt};
use crate::vectorstore::VectorStore;

/// Answer returned whenever a question cannot be answered.
pub const FALLBACK_ANSWER: &str = "I apologize, but I encountered an error while processing \
your question. Please try again.";

/// Text returned whenever a summary cannot be generated.
pub const SUMMARY_FALLBACK: &str = "Unable to generate summary at this time.";

/// The step of a question at which it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Retrieve,
    Generate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Retrieve => f.write_str("retrieval"),
            Stage::Generate => f.write_str("generation"),
        }
    }
}

/// Coordinates retrieval, context assembly, prompting and generation.
///
/// Construct one via [`RagOrchestrator::builder()`] or, when the index is
/// shared, [`RagOrchestrator::new`].
pub struct RagOrchestrator {
    config: RagConfig,
    index: Arc<EmbeddingIndex>,
    generation_provider: Arc<dyn GenerationProvider>,
}

impl RagOrchestrator {
    /// Create a new [`RagOrchestratorBuilder`].
    pub fn builder() -> RagOrchestratorBuilder {
        RagOrchestratorBuilder::default()
    }

    /// Compose an orchestrator from an already opened index.
    pub fn new(
        config: RagConfig,
        index: Arc<EmbeddingIndex>,
        generation_provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self { config, index, generation_provider }
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the underlying index.
    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    /// Answer `query` from the `top_k` most relevant chunks.
    ///
    /// Never fails. A retrieval failure yields the fallback answer with no
    /// context; a generation failure or timeout yields the fallback answer and
    /// reports how many chunks had been retrieved. Both set `error`.
    pub async fn get_response(&self, query: &str, top_k: usize) -> RagResponse {
        let started = Instant::now();

        let results = match self.index.try_search(query, top_k).await {
            Ok(results) => results,
            Err(e) => return Self::degraded(started, Stage::Retrieve, 0, &e),
        };

        let context = assemble_context(&results);
        let prompt = build_prompt(query, &context);

        match self.generate(&prompt).await {
            Ok(answer) => {
                let processing_time = started.elapsed().as_secs_f64();
                info!(context_used = results.len(), processing_time, "answered question");
                RagResponse {
                    answer,
                    context_used: results.len(),
                    sources: results.into_iter().map(|r| r.metadata).collect(),
                    processing_time,
                    error: None,
                }
            }
            Err(e) => Self::degraded(started, Stage::Generate, results.len(), &e),
        }
    }

    /// Summarize `text` in one generation call.
    ///
    /// Returns [`SUMMARY_FALLBACK`] if generation fails or times out.
    pub async fn summarize_text(&self, text: &str) -> String {
        match self.generate(&build_summary_prompt(text)).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "summarization failed");
                SUMMARY_FALLBACK.to_string()
            }
        }
    }

    /// Ingest a document. See [`EmbeddingIndex::add`].
    ///
    /// # Errors
    ///
    /// Propagates ingest, embedding and store errors.
    pub async fn add_document(
        &self,
        text: &str,
        source: &str,
        metadata: Option<Metadata>,
    ) -> Result<String> {
        self.index.add(text, source, metadata).await
    }

    /// Retrieve without generating. See [`EmbeddingIndex::search`].
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<QueryResult> {
        self.index.search(query, top_k).await
    }

    /// Grouped view of stored documents.
    pub async fn list_documents(&self) -> Vec<DocumentSummary> {
        self.index.list().await
    }

    /// Number of stored documents.
    pub async fn count_documents(&self) -> usize {
        self.index.count().await
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let limit = self.config.generation_timeout();
        match tokio::time::timeout(limit, self.generation_provider.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    provider = self.generation_provider.name(),
                    timeout_secs = limit.as_secs(),
                    "generation timed out"
                );
                Err(RagError::Timeout(limit))
            }
        }
    }

    fn degraded(started: Instant, stage: Stage, context_used: usize, e: &RagError) -> RagResponse {
        error!(%stage, error = %e, "error generating response");
        RagResponse {
            answer: FALLBACK_ANSWER.to_string(),
            sources: Vec::new(),
            context_used,
            processing_time: started.elapsed().as_secs_f64(),
            error: Some(format!("{stage} failed: {e}")),
        }
    }
}

/// Builder for constructing a [`RagOrchestrator`] together with its index.
///
/// `config`, `embedding_provider`, `vector_store` and `generation_provider`
/// are required. Without an explicit chunker a [`SentenceChunker`] is built
/// from the config's chunk size and overlap.
#[derive(Default)]
pub struct RagOrchestratorBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagOrchestratorBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the generation provider.
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Validate the parts, open the collection and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required part is missing or the
    /// config is invalid, or the store's error if the collection cannot be
    /// opened.
    pub async fn build(self) -> Result<RagOrchestrator> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let generation_provider = self
            .generation_provider
            .ok_or_else(|| RagError::ConfigError("generation_provider is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(SentenceChunker::new(config.chunk_size, config.chunk_overlap)?),
        };

        let index = EmbeddingIndex::open(
            config.collection.clone(),
            embedding_provider,
            vector_store,
            chunker,
        )
        .await?;

        Ok(RagOrchestrator::new(config, Arc::new(index), generation_provider))
    }
}
