//! Persistent vector index with named collections.
//!
//! A collection is a flat list of (chunk id, embedding, text, metadata)
//! entries stored as a single file on disk, JSON or bincode depending on the
//! configured format. Search is an exact cosine-similarity scan; corpora here
//! are small enough that approximate indexing buys nothing.
//!
//! Searching a collection that was never built is a hard error, not an empty
//! result. Rebuilds replace the collection file wholesale, so concurrent
//! readers of an already-loaded [`Collection`] are unaffected.

use crate::chunker::Chunk;
use crate::embeddings::cosine_similarity;
use crate::error::{RagError, Result};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Storage format for collection files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// JSON format (human-readable, larger).
    Json,
    /// Bincode format (binary, compact).
    Bincode,
}

impl SaveFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("bin") | Some("bincode") => SaveFormat::Bincode,
            _ => SaveFormat::Json, // Default to JSON
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Json => "json",
            SaveFormat::Bincode => "bin",
        }
    }
}

/// One indexed chunk with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct IndexEntry {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// Embedding vector for the chunk text.
    pub embedding: Vec<f32>,
    /// Chunk text content.
    pub text: String,
    /// Metadata carried from the source document.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl IndexEntry {
    /// Build an entry from a chunk and its embedding.
    pub fn new(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "source_document_id".to_string(),
            chunk.source_document_id.clone(),
        );
        Self {
            chunk_id: chunk.id.clone(),
            embedding,
            text: chunk.text.clone(),
            metadata,
        }
    }
}

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// Chunk identifier.
    pub chunk_id: String,
    /// Chunk text content.
    pub text: String,
    /// Cosine similarity in [-1, 1], higher is better.
    pub score: f32,
}

/// An in-memory collection of index entries.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct Collection {
    /// Collection name.
    pub name: String,
    /// Index entries in insertion order.
    pub entries: Vec<IndexEntry>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add or replace entries by chunk id. Replaced entries keep their
    /// original position; new entries are appended.
    pub fn upsert(&mut self, entries: Vec<IndexEntry>) {
        for entry in entries {
            match self
                .entries
                .iter_mut()
                .find(|e| e.chunk_id == entry.chunk_id)
            {
                Some(existing) => *existing = entry,
                None => self.entries.push(entry),
            }
        }
    }

    /// Return the `top_k` entries most similar to `query_vector`, sorted by
    /// descending cosine similarity. Ties keep insertion order.
    pub fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Err(RagError::Config("top_k must be at least 1".to_string()));
        }

        let mut results: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk_id: entry.chunk_id.clone(),
                text: entry.text.clone(),
                score: cosine_similarity(query_vector, &entry.embedding),
            })
            .collect();

        // Stable sort: equal scores retain insertion order
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }
}

/// On-disk store of named collections.
pub struct VectorStore {
    dir: PathBuf,
    format: SaveFormat,
}

impl VectorStore {
    /// Open (creating if needed) a store rooted at `dir`, using JSON files.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_format(dir, SaveFormat::Json)
    }

    /// Open a store with an explicit on-disk format.
    pub fn open_with_format(dir: impl Into<PathBuf>, format: SaveFormat) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| RagError::store(&dir, e))?;
        Ok(Self { dir, format })
    }

    /// Path of the file backing a named collection.
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, self.format.extension()))
    }

    /// Check whether a collection has been built.
    pub fn exists(&self, name: &str) -> bool {
        self.collection_path(name).is_file()
    }

    /// Create or replace a named collection from entries. Idempotent.
    pub fn build(&self, name: &str, entries: Vec<IndexEntry>) -> Result<Collection> {
        let collection = Collection {
            name: name.to_string(),
            entries,
        };
        self.save(&collection)?;
        Ok(collection)
    }

    /// Add or replace entries in an existing collection without a rebuild.
    pub fn upsert(&self, name: &str, entries: Vec<IndexEntry>) -> Result<Collection> {
        let mut collection = self.load(name)?;
        collection.upsert(entries);
        self.save(&collection)?;
        Ok(collection)
    }

    /// Load a collection from disk. Fails with `CollectionNotFound` if it was
    /// never built.
    pub fn load(&self, name: &str) -> Result<Collection> {
        let path = self.collection_path(name);
        if !path.is_file() {
            return Err(RagError::CollectionNotFound(name.to_string()));
        }

        let data = fs::read(&path).map_err(|e| RagError::store(&path, e))?;

        let collection = match self.format {
            SaveFormat::Json => {
                let json_str = String::from_utf8(data)
                    .map_err(|e| RagError::Serialization(e.to_string()))?;
                serde_json::from_str(&json_str)
                    .map_err(|e| RagError::Serialization(e.to_string()))?
            }
            SaveFormat::Bincode => {
                let config = bincode::config::standard();
                let (collection, _): (Collection, usize) =
                    bincode::decode_from_slice(&data, config)
                        .map_err(|e| RagError::Serialization(e.to_string()))?;
                collection
            }
        };

        Ok(collection)
    }

    /// Search a named collection. Fails with `CollectionNotFound` if it was
    /// never built.
    pub fn search(
        &self,
        name: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let collection = self.load(name)?;
        collection.search(query_vector, top_k)
    }

    fn save(&self, collection: &Collection) -> Result<()> {
        let path = self.collection_path(&collection.name);

        let data = match self.format {
            SaveFormat::Json => serde_json::to_string(collection)
                .map_err(|e| RagError::Serialization(e.to_string()))?
                .into_bytes(),
            SaveFormat::Bincode => {
                let config = bincode::config::standard();
                bincode::encode_to_vec(collection, config)
                    .map_err(|e| RagError::Serialization(e.to_string()))?
            }
        };

        fs::write(&path, &data).map_err(|e| RagError::store(&path, e))?;
        Ok(())
    }
}
