//! BERTScore: semantic similarity between generated and reference answers.
//!
//! Each text is encoded into per-token contextual embeddings, then tokens
//! are greedily matched across texts by cosine similarity. Unlike ROUGE this
//! credits paraphrases, so "revenue increased" can match "sales grew".

use crate::embeddings::{TokenEmbedder, cosine_similarity};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Precision, recall, and F1 from greedy token matching.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BertScore {
    /// Mean best-match similarity over candidate tokens.
    pub precision: f64,
    /// Mean best-match similarity over reference tokens.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
}

/// Mean over each row's maximum similarity against the other side.
fn greedy_match(from: &[Vec<f32>], to: &[Vec<f32>]) -> f64 {
    if from.is_empty() || to.is_empty() {
        return 0.0;
    }

    let total: f64 = from
        .iter()
        .map(|token| {
            to.iter()
                .map(|other| cosine_similarity(token, other) as f64)
                .fold(f64::MIN, f64::max)
        })
        .sum();

    total / from.len() as f64
}

/// Score a candidate answer against a reference answer.
///
/// Either text having no tokens yields all-zero scores.
pub fn bert_score(
    candidate: &str,
    reference: &str,
    encoder: &(impl TokenEmbedder + ?Sized),
) -> Result<BertScore> {
    let cand_tokens = encoder.encode_tokens(candidate)?;
    let ref_tokens = encoder.encode_tokens(reference)?;

    if cand_tokens.is_empty() || ref_tokens.is_empty() {
        return Ok(BertScore::default());
    }

    let precision = greedy_match(&cand_tokens, &ref_tokens);
    let recall = greedy_match(&ref_tokens, &cand_tokens);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(BertScore {
        precision,
        recall,
        f1,
    })
}
