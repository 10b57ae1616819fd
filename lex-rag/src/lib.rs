//! # lex-rag
//!
//! Retrieval-augmented question answering over a corpus of legal documents.
//!
//! ## Overview
//!
//! Documents are split into overlapping, sentence-aligned chunks, embedded and
//! stored in a vector store. A question is embedded, the nearest chunks are
//! formatted into an attributed context block, and a generation backend
//! answers from that context.
//!
//! - [`SentenceChunker`] - bounded, overlapping, sentence-aware splitting
//! - [`EmbeddingIndex`] - ingest and nearest-neighbor search over one collection
//! - [`assemble_context`] / [`build_prompt`] - prompt construction
//! - [`RagOrchestrator`] - `get_response` and `summarize_text` that degrade
//!   instead of failing
//!
//! Backends plug in through [`EmbeddingProvider`], [`GenerationProvider`] and
//! [`VectorStore`]. [`InMemoryVectorStore`] lives only as long as the process;
//! with the `lancedb` feature, `LanceVectorStore` persists collections on disk
//! and can be shared by several processes. With the `gemini` feature,
//! `gemini::GeminiEmbeddingProvider` and `gemini::GeminiGenerationProvider`
//! call the Gemini API.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lex_rag::{HashingEmbeddingProvider, LanceVectorStore, RagConfig, RagOrchestrator};
//!
//! let config = RagConfig::default();
//! let embedder = HashingEmbeddingProvider::default();
//! let store = LanceVectorStore::open(&config.db_path, embedder.dimensions()).await?;
//! let orchestrator = RagOrchestrator::builder()
//!     .vector_store(Arc::new(store))
//!     .embedding_provider(Arc::new(embedder))
//!     .generation_provider(Arc::new(my_generator))
//!     .config(config)
//!     .build()
//!     .await?;
//!
//! orchestrator.add_document(text, "EPF Act 1952", None).await?;
//! let response = orchestrator.get_response("employer contribution percentage", 5).await;
//! ```

pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod generation;
pub mod index;
pub mod inmemory;
#[cfg(feature = "lancedb")]
pub mod lancestore;
pub mod orchestrator;
pub mod prompt;
pub mod samples;
pub mod text;
pub mod vectorstore;

pub use chunking::{Chunker, SentenceChunker};
pub use config::RagConfig;
pub use context::assemble_context;
pub use document::{Chunk, Document, DocumentSummary, Metadata, QueryResult, RagResponse};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider};
pub use error::{RagError, Result};
pub use generation::GenerationProvider;
pub use index::EmbeddingIndex;
pub use inmemory::InMemoryVectorStore;
#[cfg(feature = "lancedb")]
pub use lancestore::LanceVectorStore;
pub use orchestrator::{FALLBACK_ANSWER, RagOrchestrator, SUMMARY_FALLBACK};
pub use prompt::{build_prompt, build_summary_prompt};
pub use samples::seed_sample_documents;
pub use text::clean_text;
pub use vectorstore::VectorStore;
