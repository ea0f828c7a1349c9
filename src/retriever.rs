//! Query-time retrieval.
//!
//! Embeds the query and searches a loaded collection, over-fetching `top_k`
//! candidates and returning the first `return_k`. The two-stage K leaves room
//! for a downstream re-ranker between the index scan and the caller.

use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::index::{Collection, ScoredChunk};

/// Default number of candidates fetched from the index.
pub const DEFAULT_TOP_K: usize = 5;

/// Default number of results returned to the caller.
pub const DEFAULT_RETURN_K: usize = 2;

/// Read-only retriever over a loaded collection. Safe for concurrent callers.
pub struct Retriever<'a, E: Embedder + ?Sized> {
    embedder: &'a E,
    collection: &'a Collection,
}

impl<'a, E: Embedder + ?Sized> Retriever<'a, E> {
    /// Create a new retriever.
    pub fn new(embedder: &'a E, collection: &'a Collection) -> Self {
        Self {
            embedder,
            collection,
        }
    }

    /// Retrieve the `return_k` most similar chunks for a query, scanning
    /// `top_k` candidates. Results are sorted by descending similarity.
    pub fn retrieve(&self, query: &str, top_k: usize, return_k: usize) -> Result<Vec<ScoredChunk>> {
        if return_k == 0 || return_k > top_k {
            return Err(RagError::Config(format!(
                "return_k ({}) must be between 1 and top_k ({})",
                return_k, top_k
            )));
        }

        let query_embedding = self.embedder.embed(query)?;
        let mut results = self.collection.search(&query_embedding, top_k)?;
        results.truncate(return_k);

        Ok(results)
    }

    /// Retrieve with the default 5-candidate / 2-result configuration.
    pub fn retrieve_default(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        self.retrieve(query, DEFAULT_TOP_K, DEFAULT_RETURN_K)
    }

    /// Retrieve and concatenate chunk texts into a generation context.
    pub fn retrieve_context(&self, query: &str, top_k: usize, return_k: usize) -> Result<String> {
        let results = self.retrieve(query, top_k, return_k)?;

        let context = results
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexEntry;
    use crate::test_util::StubEmbedder;
    use std::collections::BTreeMap;

    fn test_collection() -> Collection {
        let entries = vec![
            IndexEntry {
                chunk_id: "d1_c0".to_string(),
                embedding: vec![1.0, 0.0, 0.0],
                text: "Revenue was 100 in 2022".to_string(),
                metadata: BTreeMap::new(),
            },
            IndexEntry {
                chunk_id: "d1_c1".to_string(),
                embedding: vec![0.0, 1.0, 0.0],
                text: "and 120 in 2023.".to_string(),
                metadata: BTreeMap::new(),
            },
            IndexEntry {
                chunk_id: "d2_c0".to_string(),
                embedding: vec![0.0, 0.0, 1.0],
                text: "Operating costs declined.".to_string(),
                metadata: BTreeMap::new(),
            },
        ];
        Collection {
            name: "test".to_string(),
            entries,
        }
    }

    fn stub() -> StubEmbedder {
        StubEmbedder::new(3).with_vector("What was the 2023 revenue?", vec![0.1, 0.9, 0.0])
    }

    #[test]
    fn test_retrieve_returns_most_similar_first() {
        let embedder = stub();
        let collection = test_collection();
        let retriever = Retriever::new(&embedder, &collection);

        let results = retriever
            .retrieve("What was the 2023 revenue?", 5, 1)
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, "d1_c1");
        assert!(results[0].text.contains("120 in 2023"));
    }

    #[test]
    fn test_retrieve_sorted_descending_and_bounded() {
        let embedder = stub();
        let collection = test_collection();
        let retriever = Retriever::new(&embedder, &collection);

        let results = retriever
            .retrieve("What was the 2023 revenue?", 5, 3)
            .unwrap();

        assert!(results.len() <= 3);
        assert!(results.len() <= collection.len());
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_return_k_truncates_over_fetch() {
        let embedder = stub();
        let collection = test_collection();
        let retriever = Retriever::new(&embedder, &collection);

        let results = retriever.retrieve_default("What was the 2023 revenue?").unwrap();
        assert!(results.len() <= DEFAULT_RETURN_K);
    }

    #[test]
    fn test_return_k_above_top_k_is_config_error() {
        let embedder = stub();
        let collection = test_collection();
        let retriever = Retriever::new(&embedder, &collection);

        let result = retriever.retrieve("query", 2, 3);
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn test_zero_return_k_is_config_error() {
        let embedder = stub();
        let collection = test_collection();
        let retriever = Retriever::new(&embedder, &collection);

        let result = retriever.retrieve("query", 5, 0);
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn test_retrieve_context_joins_chunk_texts() {
        let embedder = stub();
        let collection = test_collection();
        let retriever = Retriever::new(&embedder, &collection);

        let context = retriever
            .retrieve_context("What was the 2023 revenue?", 5, 2)
            .unwrap();

        assert!(context.contains("120 in 2023"));
        assert!(context.contains('\n'));
    }
}
