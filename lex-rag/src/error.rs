//! Error types for the `lex-rag` crate.
//!
//! Only [`RagError::ConfigError`] is meant to be fatal. Every other variant is
//! produced per request and is absorbed by [`EmbeddingIndex::search`] or the
//! [`RagOrchestrator`] before it reaches a user-facing answer call.
//!
//! [`EmbeddingIndex::search`]: crate::EmbeddingIndex::search
//! [`RagOrchestrator`]: crate::RagOrchestrator

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Missing credentials, invalid chunking parameters or unusable paths.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The text handed to ingestion could not be indexed.
    #[error("Ingest error: {0}")]
    IngestError(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation backend failed (network, quota, malformed response).
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation call did not finish within the configured bound.
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
}

impl RagError {
    pub(crate) fn store(backend: &str, message: impl Into<String>) -> Self {
        Self::VectorStoreError { backend: backend.to_string(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
