//! Ingestion pipeline: documents -> chunks -> embeddings -> collection.
//!
//! This is the one-time build step that must run before any retrieval.
//! Rebuilding replaces the collection wholesale, so stale entries from a
//! previous run cannot linger.

use crate::chunker::{Chunk, ChunkConfig, chunk_corpus};
use crate::document::{Document, load_tatqa_corpus};
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::index::{IndexEntry, VectorStore};
use std::path::Path;

/// Chunks embedded per model call.
const EMBED_BATCH_SIZE: usize = 32;

/// Counts from one ingestion run.
#[derive(Debug, Clone, Copy)]
pub struct IngestStats {
    /// Documents read from the dataset.
    pub documents: usize,
    /// Chunks produced and indexed.
    pub chunks: usize,
}

/// Embed chunks in batches and pair each with its vector. Every chunk yields
/// exactly one index entry.
pub fn embed_chunks(chunks: &[Chunk], embedder: &(impl Embedder + ?Sized)) -> Result<Vec<IndexEntry>> {
    let mut entries = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
        let embeddings = embedder.embed_batch(&texts)?;

        for (chunk, embedding) in batch.iter().zip(embeddings) {
            entries.push(IndexEntry::new(chunk, embedding));
        }
    }

    Ok(entries)
}

/// Chunk, embed, and index a corpus of documents into a named collection.
pub fn ingest_corpus(
    documents: &[Document],
    embedder: &(impl Embedder + ?Sized),
    store: &VectorStore,
    collection: &str,
    chunk_config: &ChunkConfig,
) -> Result<IngestStats> {
    let chunks = chunk_corpus(documents, chunk_config)?;
    let entries = embed_chunks(&chunks, embedder)?;
    store.build(collection, entries)?;

    Ok(IngestStats {
        documents: documents.len(),
        chunks: chunks.len(),
    })
}

/// Ingest a TAT-QA dataset file into a named collection.
pub fn ingest_tatqa(
    dataset: &Path,
    embedder: &(impl Embedder + ?Sized),
    store: &VectorStore,
    collection: &str,
    chunk_config: &ChunkConfig,
) -> Result<IngestStats> {
    let (documents, _sources) = load_tatqa_corpus(dataset)?;
    ingest_corpus(&documents, embedder, store, collection, chunk_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::StubEmbedder;
    use tempfile::TempDir;

    #[test]
    fn test_ingest_corpus_one_entry_per_chunk() {
        let dir = TempDir::new().unwrap();
        let store = VectorStore::open(dir.path()).unwrap();
        let embedder = StubEmbedder::new(4);

        let documents = vec![
            Document::new("0_1", "one two three four five six"),
            Document::new("0_2", "seven eight"),
        ];
        let config = ChunkConfig {
            chunk_size_tokens: 3,
            overlap_tokens: 0,
        };

        let stats = ingest_corpus(&documents, &embedder, &store, "docs", &config).unwrap();

        assert_eq!(stats.documents, 2);
        assert_eq!(stats.chunks, 3);

        let collection = store.load("docs").unwrap();
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.entries[0].chunk_id, "0_1_c0");
        assert_eq!(
            collection.entries[0].metadata.get("source_document_id").unwrap(),
            "0_1"
        );
    }

    #[test]
    fn test_ingest_replaces_previous_collection() {
        let dir = TempDir::new().unwrap();
        let store = VectorStore::open(dir.path()).unwrap();
        let embedder = StubEmbedder::new(4);
        let config = ChunkConfig::default();

        let first = vec![Document::new("a", "alpha beta")];
        let second = vec![Document::new("b", "gamma delta")];

        ingest_corpus(&first, &embedder, &store, "docs", &config).unwrap();
        ingest_corpus(&second, &embedder, &store, "docs", &config).unwrap();

        let collection = store.load("docs").unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.entries[0].chunk_id, "b_c0");
    }
}
