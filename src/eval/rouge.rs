//! ROUGE metrics for generated answers.
//!
//! Implements ROUGE-1, ROUGE-2, and ROUGE-L with lowercase alphanumeric
//! tokenization and Snowball (English) stemming, so "repurchased" and
//! "repurchase" count as the same token.

use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Precision, recall, and F-measure for one ROUGE variant.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RougeScore {
    pub precision: f64,
    pub recall: f64,
    pub fmeasure: f64,
}

impl RougeScore {
    fn from_counts(overlap: usize, candidate_total: usize, reference_total: usize) -> Self {
        let precision = ratio(overlap, candidate_total);
        let recall = ratio(overlap, reference_total);
        let fmeasure = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            fmeasure,
        }
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// ROUGE-1/2/L scorer. Holds the stemmer so repeated scoring does not
/// rebuild it per call.
pub struct RougeScorer {
    stemmer: Stemmer,
}

impl Default for RougeScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl RougeScorer {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Lowercase, strip non-alphanumeric characters, and stem each token.
    fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| self.stemmer.stem(t).into_owned())
            .collect()
    }

    /// ROUGE-N: clipped n-gram overlap between reference and candidate.
    pub fn rouge_n(&self, reference: &str, candidate: &str, n: usize) -> RougeScore {
        let ref_tokens = self.tokenize(reference);
        let cand_tokens = self.tokenize(candidate);

        let ref_ngrams = ngram_counts(&ref_tokens, n);
        let cand_ngrams = ngram_counts(&cand_tokens, n);

        let overlap: usize = cand_ngrams
            .iter()
            .map(|(gram, count)| (*count).min(ref_ngrams.get(gram).copied().unwrap_or(0)))
            .sum();
        let cand_total: usize = cand_ngrams.values().sum();
        let ref_total: usize = ref_ngrams.values().sum();

        RougeScore::from_counts(overlap, cand_total, ref_total)
    }

    /// ROUGE-L: longest common subsequence of the token streams.
    pub fn rouge_l(&self, reference: &str, candidate: &str) -> RougeScore {
        let ref_tokens = self.tokenize(reference);
        let cand_tokens = self.tokenize(candidate);

        let lcs = lcs_length(&ref_tokens, &cand_tokens);
        RougeScore::from_counts(lcs, cand_tokens.len(), ref_tokens.len())
    }
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// Length of the longest common subsequence, O(|a| * |b|) with a rolling row.
fn lcs_length(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
