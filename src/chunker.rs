//! Token-window chunker.
//!
//! Splits a document's text into consecutive windows of whitespace tokens.
//! Windows are contiguous by default; an overlap makes each window after the
//! first repeat the trailing tokens of the previous one, so answer spans near
//! a boundary appear fully in at least one chunk.

use crate::document::Document;
use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for text chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum tokens (whitespace words) per chunk.
    pub chunk_size_tokens: usize,
    /// Tokens shared between adjacent chunks.
    pub overlap_tokens: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size_tokens: 100,
            overlap_tokens: 0,
        }
    }
}

impl ChunkConfig {
    /// Validate the window parameters.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size_tokens == 0 {
            return Err(RagError::Config(
                "chunk_size_tokens must be greater than zero".to_string(),
            ));
        }
        if self.overlap_tokens >= self.chunk_size_tokens {
            return Err(RagError::Config(format!(
                "overlap_tokens ({}) must be less than chunk_size_tokens ({})",
                self.overlap_tokens, self.chunk_size_tokens
            )));
        }
        Ok(())
    }
}

/// A bounded-length span of a document's tokenized text, the atomic unit of
/// retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier (format: "{document_id}_c{sequence_index}").
    pub id: String,
    /// Chunk text content.
    pub text: String,
    /// Id of the document this chunk was cut from.
    pub source_document_id: String,
}

/// Split a document into token windows.
///
/// Deterministic: identical input always yields the same chunk sequence and
/// ids. The final window may be shorter than `chunk_size_tokens`.
pub fn chunk_document(document: &Document, config: &ChunkConfig) -> Result<Vec<Chunk>> {
    config.validate()?;

    let tokens: Vec<&str> = document.text.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let stride = config.chunk_size_tokens - config.overlap_tokens;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    loop {
        let end = (start + config.chunk_size_tokens).min(tokens.len());

        chunks.push(Chunk {
            id: format!("{}_c{}", document.id, index),
            text: tokens[start..end].join(" "),
            source_document_id: document.id.clone(),
        });
        index += 1;

        if end == tokens.len() {
            break;
        }

        start += stride;
    }

    Ok(chunks)
}

/// Chunk every document in a corpus, preserving document order.
pub fn chunk_corpus(documents: &[Document], config: &ChunkConfig) -> Result<Vec<Chunk>> {
    let mut all_chunks = Vec::new();
    for doc in documents {
        all_chunks.extend(chunk_document(doc, config)?);
    }
    Ok(all_chunks)
}
