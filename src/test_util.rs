//! Shared test doubles for the embedding and generation seams.

use crate::embeddings::{Embedder, TokenEmbedder};
use crate::error::Result;
use crate::llm::AnswerGenerator;

/// Maps known texts to fixed vectors; unknown texts embed to the zero vector.
pub(crate) struct StubEmbedder {
    pub vectors: Vec<(String, Vec<f32>)>,
    pub dimension: usize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: Vec::new(),
            dimension,
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.push((text.to_string(), vector));
        self
    }
}

impl Embedder for StubEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                self.vectors
                    .iter()
                    .find(|(known, _)| known == t)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| vec![0.0; self.dimension])
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Token embedder that gives every distinct word a one-hot direction, so
/// identical words match with similarity 1.0 and different words with 0.0.
pub(crate) struct OneHotTokenEmbedder {
    pub vocabulary: Vec<String>,
}

impl OneHotTokenEmbedder {
    pub fn from_texts(texts: &[&str]) -> Self {
        let mut vocabulary = Vec::new();
        for text in texts {
            for word in text.split_whitespace() {
                let word = word.to_lowercase();
                if !vocabulary.contains(&word) {
                    vocabulary.push(word);
                }
            }
        }
        Self { vocabulary }
    }
}

impl TokenEmbedder for OneHotTokenEmbedder {
    fn encode_tokens(&self, text: &str) -> Result<Vec<Vec<f32>>> {
        let dim = self.vocabulary.len().max(1);
        Ok(text
            .split_whitespace()
            .map(|word| {
                let word = word.to_lowercase();
                let mut v = vec![0.0; dim];
                if let Some(idx) = self.vocabulary.iter().position(|w| *w == word) {
                    v[idx] = 1.0;
                }
                v
            })
            .collect())
    }
}

/// Generator that always returns the same answer.
pub(crate) struct FixedAnswerGenerator {
    pub answer: String,
}

impl AnswerGenerator for FixedAnswerGenerator {
    async fn generate(&self, _query: &str, _context: &str) -> Result<String> {
        Ok(self.answer.clone())
    }
}

/// Generator that fails for questions containing a marker substring.
pub(crate) struct FlakyGenerator {
    pub fail_marker: String,
}

impl AnswerGenerator for FlakyGenerator {
    async fn generate(&self, query: &str, _context: &str) -> Result<String> {
        if query.contains(&self.fail_marker) {
            Err(crate::error::RagError::LlmApi("generation failed".to_string()))
        } else {
            Ok(query.to_string())
        }
    }
}
