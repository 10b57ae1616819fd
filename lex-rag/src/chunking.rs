//! Sentence-aware document chunking.
//!
//! This module provides the [`Chunker`] trait and [`SentenceChunker`], which
//! cuts text into bounded, overlapping windows and pulls each cut back to the
//! nearest sentence end when one is close to the window boundary.

use std::ops::Range;

use serde_json::Value;

use crate::document::{CHUNK_ID_KEY, CHUNK_INDEX_KEY, Chunk, DOC_ID_KEY, Document, SOURCE_KEY};
use crate::error::{RagError, Result};

/// How far back from a window end the chunker looks for a sentence end.
pub const SENTENCE_LOOKBACK: usize = 200;

const SENTENCE_TERMINALS: [char; 3] = ['.', '!', '?'];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the index.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into windows of at most `chunk_size` characters, overlapping
/// by `chunk_overlap`, preferring to end each window on `.`, `!` or `?`.
///
/// Sizes are counted in characters, not bytes, so multi-byte text is never cut
/// inside a code point.
///
/// # Example
///
/// ```rust
/// use lex_rag::SentenceChunker;
///
/// let chunker = SentenceChunker::new(1000, 200).unwrap();
/// let chunks = chunker.split("Section 6. Contributions shall be paid monthly.");
/// assert_eq!(chunks.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] when `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`, since the cursor would then fail to
    /// advance.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks in document order.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            let trimmed = text.trim();
            return if trimmed.is_empty() { Vec::new() } else { vec![trimmed.to_string()] };
        }

        self.spans_of(&chars)
            .into_iter()
            .filter_map(|span| {
                let piece: String = chars[span].iter().collect();
                let trimmed = piece.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect()
    }

    /// The untrimmed character ranges [`split`](Self::split) cuts `text` into.
    ///
    /// Consecutive spans overlap by at most `chunk_overlap` characters, starts
    /// are strictly increasing, and together the spans cover `0..len`.
    pub fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }
        self.spans_of(&chars)
    }

    fn spans_of(&self, chars: &[char]) -> Vec<Range<usize>> {
        let len = chars.len();
        let mut spans = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = (start + self.chunk_size).min(len);
            if end < len {
                end = self.sentence_cut(chars, start, end);
            }
            spans.push(start..end);

            if end >= len {
                break;
            }
            start = end.saturating_sub(self.chunk_overlap);
        }

        spans
    }

    /// Move a hard cut at `end` to just after the nearest sentence terminal.
    ///
    /// The scan stops above `start + chunk_overlap`, which keeps the next
    /// cursor strictly ahead of `start`.
    fn sentence_cut(&self, chars: &[char], start: usize, end: usize) -> usize {
        let floor = end.saturating_sub(SENTENCE_LOOKBACK).max(start + self.chunk_overlap);
        (floor..end)
            .rev()
            .find(|&i| SENTENCE_TERMINALS.contains(&chars[i]))
            .map_or(end, |i| i + 1)
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split(&document.text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| {
                let chunk_id = Chunk::id_for(&document.doc_id, chunk_index);

                let mut metadata = document.metadata.clone();
                metadata.insert(SOURCE_KEY.to_string(), Value::from(document.source.clone()));
                metadata.insert(DOC_ID_KEY.to_string(), Value::from(document.doc_id.clone()));
                metadata.insert(CHUNK_INDEX_KEY.to_string(), Value::from(chunk_index));
                metadata.insert(CHUNK_ID_KEY.to_string(), Value::from(chunk_id.clone()));

                Chunk {
                    chunk_id,
                    doc_id: document.doc_id.clone(),
                    chunk_index,
                    text,
                    embedding: Vec::new(),
                    metadata,
                }
            })
            .collect()
    }
}
