//! Data types for documents, chunks, search results and answers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata attached to documents and chunks: string keys, scalar values.
pub type Metadata = Map<String, Value>;

/// Metadata key holding the human-readable source label.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the parent document id.
pub const DOC_ID_KEY: &str = "doc_id";
/// Metadata key holding the 0-based chunk position.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";
/// Metadata key holding the chunk id.
pub const CHUNK_ID_KEY: &str = "chunk_id";

/// A source document as handed to ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier, shared by every chunk of this document.
    pub doc_id: String,
    /// Human-readable label, e.g. the act name or file name.
    pub source: String,
    /// Raw text content.
    pub text: String,
    /// Caller-supplied metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `{doc_id}_{chunk_index}`.
    pub chunk_id: String,
    /// The ID of the parent [`Document`].
    pub doc_id: String,
    /// Position of this chunk within its document.
    pub chunk_index: usize,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until embedded.
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Document metadata plus the reserved `source`, `doc_id`, `chunk_index`
    /// and `chunk_id` fields.
    pub metadata: Metadata,
}

impl Chunk {
    /// Derive the chunk id for a given document and position.
    pub fn id_for(doc_id: &str, chunk_index: usize) -> String {
        format!("{doc_id}_{chunk_index}")
    }

    /// The `source` label stored in this chunk's metadata.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(Value::as_str)
    }
}

/// A stored [`Chunk`] paired with its distance to a query embedding.
#[derive(Debug, Clone)]
pub struct Neighbor {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine distance to the query (0 = identical direction).
    pub distance: f32,
}

/// A retrieved chunk as exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    /// The chunk text.
    pub content: String,
    /// The chunk's stored metadata.
    pub metadata: Metadata,
    /// Similarity in `[0, 1]`, higher is more relevant.
    pub score: f32,
}

impl QueryResult {
    /// The `source` attribution of this result, if recorded.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(Value::as_str)
    }
}

/// The answer to a question, successful or degraded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagResponse {
    /// Generated answer, or the fixed apology when degraded.
    pub answer: String,
    /// Metadata of each chunk the answer was grounded on, in rank order.
    pub sources: Vec<Metadata>,
    /// Number of chunks retrieved for this answer.
    pub context_used: usize,
    /// Wall-clock time spent answering, in seconds.
    pub processing_time: f64,
    /// Description of the failure that degraded this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RagResponse {
    /// Whether the response was produced by the failure path.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Grouped view of one stored document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    /// The document id.
    pub doc_id: String,
    /// The document's source label.
    pub source: String,
    /// How many chunks the document was split into.
    pub chunk_count: usize,
    /// Metadata of the first chunk seen for this document.
    pub metadata: Metadata,
}
