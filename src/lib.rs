//! # finrag
//!
//! Retrieval-augmented question answering over financial documents, with a
//! built-in evaluation pipeline.
//!
//! The pipeline has two phases:
//! 1. **Ingestion**: paragraphs from a financial dataset are split into
//!    fixed-size word chunks, embedded with a local sentence-transformers
//!    model, and persisted into a named collection.
//! 2. **Query**: a question is embedded, the most similar chunks are
//!    retrieved, and an OpenAI-compatible LLM generates an answer grounded
//!    in those chunks.
//!
//! The [`eval`] module measures both phases: Precision@K / Recall@K / MRR
//! for retrieval, ROUGE and BERTScore for generation.

pub mod chunker;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod eval;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod retriever;

#[cfg(test)]
mod test_util;

pub use chunker::{Chunk, ChunkConfig, chunk_corpus, chunk_document};
pub use config::{Config, LlmConfig, RetrievalConfig};
pub use document::{Document, SourceDocument, load_tatqa_corpus};
pub use embeddings::{Embedder, EmbeddingModel, TokenEmbedder, cosine_similarity};
pub use error::{RagError, Result};
pub use index::{Collection, IndexEntry, SaveFormat, ScoredChunk, VectorStore};
pub use ingest::{IngestStats, ingest_corpus, ingest_tatqa};
pub use llm::{AnswerGenerator, LlmClient, Prompts};
pub use retriever::{DEFAULT_RETURN_K, DEFAULT_TOP_K, Retriever};
