//! Retrieval quality evaluation: Precision@K, Recall@K, and MRR.
//!
//! Ground truth is derived from the dataset rather than hand-labeled: a chunk
//! counts as relevant to a sample when its text shares more than half its
//! words with a paragraph of the sample's source report. This is a proxy
//! label, but it is deterministic and needs no annotation pass.

use crate::document::SourceDocument;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::eval::dataset::EvalDataset;
use crate::index::Collection;
use crate::retriever::Retriever;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Word-overlap relevance labeling.
#[derive(Debug, Clone, Copy)]
pub struct RelevancePolicy {
    /// Minimum shared-word fraction for a chunk to count as relevant.
    pub threshold: f64,
    /// Chunks at or below this many characters are never relevant; tiny
    /// fragments share words with almost anything.
    pub min_chunk_chars: usize,
}

impl Default for RelevancePolicy {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_chunk_chars: 20,
        }
    }
}

impl RelevancePolicy {
    /// Check whether a chunk is relevant to a paragraph.
    ///
    /// Comparison is word-level, case-insensitive, and order-independent:
    /// |shared words| / min(|chunk words|, |paragraph words|) must exceed
    /// the threshold.
    pub fn is_relevant(&self, chunk_text: &str, paragraph: &str) -> bool {
        if chunk_text.len() <= self.min_chunk_chars {
            return false;
        }

        let chunk_words: HashSet<String> =
            chunk_text.split_whitespace().map(str::to_lowercase).collect();
        let para_words: HashSet<String> =
            paragraph.split_whitespace().map(str::to_lowercase).collect();

        if chunk_words.is_empty() || para_words.is_empty() {
            return false;
        }

        let shared = chunk_words.intersection(&para_words).count();
        let denom = chunk_words.len().min(para_words.len());

        shared as f64 / denom as f64 > self.threshold
    }

    /// Check whether a chunk is relevant to any paragraph of a source report.
    pub fn is_relevant_to_source(&self, chunk_text: &str, source: &SourceDocument) -> bool {
        source
            .paragraphs
            .iter()
            .any(|p| self.is_relevant(chunk_text, p))
    }
}

/// Aggregated retrieval metrics from one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalEvaluation {
    /// Mean fraction of the top K results that are relevant.
    pub precision_at_k: f64,
    /// Mean fraction of ground-truth relevant chunks found in the top K.
    /// Averaged only over samples that have at least one relevant chunk.
    pub recall_at_k: f64,
    /// Mean reciprocal rank of the first relevant result (0 when none).
    pub mrr: f64,
    /// The K used for all three metrics.
    pub k: usize,
    /// Samples that were scored.
    pub samples_evaluated: usize,
    /// Samples that contributed to recall (nonzero ground truth).
    pub recall_samples: usize,
    /// Samples skipped because retrieval failed or the source was missing.
    pub samples_failed: usize,
}

/// Computes Precision@K, Recall@K, and MRR over an evaluation dataset.
pub struct RetrievalEvaluator {
    policy: RelevancePolicy,
    /// Candidates scanned in the index before truncation.
    fetch_k: usize,
    /// Results scored per query.
    top_k: usize,
}

impl RetrievalEvaluator {
    /// Create an evaluator scoring the top `top_k` of `fetch_k` candidates.
    pub fn new(policy: RelevancePolicy, fetch_k: usize, top_k: usize) -> Self {
        Self {
            policy,
            fetch_k: fetch_k.max(top_k),
            top_k,
        }
    }

    /// Evaluate up to `limit` samples against a built collection.
    ///
    /// Per-sample retrieval failures are logged and excluded from the
    /// averages; one bad sample must not sink the whole run.
    pub fn evaluate<E: Embedder + ?Sized>(
        &self,
        dataset: &EvalDataset,
        limit: usize,
        retriever: &Retriever<E>,
        collection: &Collection,
    ) -> Result<RetrievalEvaluation> {
        let mut precision_sum = 0.0;
        let mut recall_sum = 0.0;
        let mut rr_sum = 0.0;
        let mut evaluated = 0usize;
        let mut recall_samples = 0usize;
        let mut failed = 0usize;

        for sample in dataset.samples.iter().take(limit) {
            let Some(source) = dataset.source_for(sample) else {
                eprintln!(
                    "Warning: no source document '{}' for question '{}', skipping",
                    sample.source_document_id, sample.question
                );
                failed += 1;
                continue;
            };

            let results = match retriever.retrieve(&sample.question, self.fetch_k, self.top_k) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!(
                        "Warning: retrieval failed for '{}': {}",
                        sample.question, e
                    );
                    failed += 1;
                    continue;
                }
            };

            let relevant_retrieved: Vec<bool> = results
                .iter()
                .map(|r| self.policy.is_relevant_to_source(&r.text, source))
                .collect();
            let num_relevant = relevant_retrieved.iter().filter(|&&r| r).count();

            // Precision is over the requested K, not over however many
            // results came back; a short result list is a miss, not a pass.
            precision_sum += num_relevant as f64 / self.top_k as f64;

            let ground_truth = collection
                .entries
                .iter()
                .filter(|e| self.policy.is_relevant_to_source(&e.text, source))
                .count();
            if ground_truth > 0 {
                recall_sum += num_relevant.min(ground_truth) as f64 / ground_truth as f64;
                recall_samples += 1;
            }

            rr_sum += relevant_retrieved
                .iter()
                .position(|&r| r)
                .map(|rank| 1.0 / (rank + 1) as f64)
                .unwrap_or(0.0);

            evaluated += 1;
        }

        let mean = |sum: f64, n: usize| if n > 0 { sum / n as f64 } else { 0.0 };

        Ok(RetrievalEvaluation {
            precision_at_k: mean(precision_sum, evaluated),
            recall_at_k: mean(recall_sum, recall_samples),
            mrr: mean(rr_sum, evaluated),
            k: self.top_k,
            samples_evaluated: evaluated,
            recall_samples,
            samples_failed: failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::dataset::{EvalDataset, EvaluationSample, ReferenceAnswer};
    use crate::index::IndexEntry;
    use crate::test_util::StubEmbedder;
    use std::collections::BTreeMap;

    fn entry(chunk_id: &str, text: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            chunk_id: chunk_id.to_string(),
            embedding,
            text: text.to_string(),
            metadata: BTreeMap::new(),
        }
    }

    fn sample(question: &str, source_id: &str) -> EvaluationSample {
        EvaluationSample {
            question: question.to_string(),
            answer: ReferenceAnswer::Text("answer".to_string()),
            source_document_id: source_id.to_string(),
        }
    }

    #[test]
    fn test_relevance_requires_majority_overlap() {
        let policy = RelevancePolicy::default();

        // Identical text: full overlap.
        let para = "Revenue grew to 120 million in fiscal 2023 overall";
        assert!(policy.is_relevant(para, para));

        // No shared words at all.
        assert!(!policy.is_relevant(
            "Completely unrelated sentence about weather patterns",
            para
        ));
    }

    #[test]
    fn test_relevance_is_case_insensitive() {
        let policy = RelevancePolicy::default();
        assert!(policy.is_relevant(
            "REVENUE GREW TO 120 MILLION IN FISCAL 2023",
            "revenue grew to 120 million in fiscal 2023"
        ));
    }

    #[test]
    fn test_short_chunks_are_never_relevant() {
        let policy = RelevancePolicy::default();
        // 20 chars or fewer is filtered regardless of overlap.
        assert!(!policy.is_relevant("Revenue grew a lot", "Revenue grew a lot"));
    }

    #[test]
    fn test_exact_half_overlap_is_not_relevant() {
        let policy = RelevancePolicy::default();
        // 2 shared words out of min(4, 4): exactly 0.5, threshold is strict.
        assert!(!policy.is_relevant(
            "alpha beta gammaaaaaaaaaa deltaaaaaaaaa",
            "alpha beta epsilon zeta"
        ));
    }

    fn overlap_fixture() -> (EvalDataset, Collection, StubEmbedder) {
        let para = "Total revenue grew to 120 million in fiscal 2023 overall";
        let dataset = EvalDataset {
            name: "test".to_string(),
            samples: vec![sample("What was the 2023 revenue?", "r1")],
            sources: vec![SourceDocument {
                id: "r1".to_string(),
                paragraphs: vec![para.to_string()],
            }],
        };

        // One relevant chunk (verbatim paragraph text) and one off-topic.
        let collection = Collection {
            name: "test".to_string(),
            entries: vec![
                entry("d1_c0", para, vec![0.0, 1.0]),
                entry(
                    "d2_c0",
                    "The weather this quarter was unusually pleasant everywhere",
                    vec![1.0, 0.0],
                ),
            ],
        };

        let embedder =
            StubEmbedder::new(2).with_vector("What was the 2023 revenue?", vec![0.1, 0.9]);

        (dataset, collection, embedder)
    }

    #[test]
    fn test_perfect_retrieval_scores() {
        let (dataset, collection, embedder) = overlap_fixture();
        let retriever = Retriever::new(&embedder, &collection);
        let evaluator = RetrievalEvaluator::new(RelevancePolicy::default(), 5, 1);

        let eval = evaluator
            .evaluate(&dataset, 10, &retriever, &collection)
            .unwrap();

        // Top-1 is the relevant chunk, and it is the only ground-truth chunk.
        assert!((eval.precision_at_k - 1.0).abs() < 1e-9);
        assert!((eval.recall_at_k - 1.0).abs() < 1e-9);
        assert!((eval.mrr - 1.0).abs() < 1e-9);
        assert_eq!(eval.samples_evaluated, 1);
        assert_eq!(eval.recall_samples, 1);
        assert_eq!(eval.samples_failed, 0);
    }

    #[test]
    fn test_no_overlap_gives_zero_precision() {
        let dataset = EvalDataset {
            name: "test".to_string(),
            samples: vec![sample("What was the 2023 revenue?", "r1")],
            sources: vec![SourceDocument {
                id: "r1".to_string(),
                paragraphs: vec![
                    "Total revenue grew to 120 million in fiscal 2023 overall".to_string(),
                ],
            }],
        };

        // Nothing in the index overlaps the ground-truth paragraphs.
        let collection = Collection {
            name: "test".to_string(),
            entries: vec![entry(
                "d9_c0",
                "The weather this quarter was unusually pleasant everywhere",
                vec![1.0, 0.0],
            )],
        };
        let embedder =
            StubEmbedder::new(2).with_vector("What was the 2023 revenue?", vec![0.1, 0.9]);
        let retriever = Retriever::new(&embedder, &collection);
        let evaluator = RetrievalEvaluator::new(RelevancePolicy::default(), 5, 1);

        let eval = evaluator
            .evaluate(&dataset, 10, &retriever, &collection)
            .unwrap();

        assert_eq!(eval.precision_at_k, 0.0);
        assert_eq!(eval.mrr, 0.0);
        // No ground-truth relevant chunks exist, so the sample is excluded
        // from recall instead of being counted as zero.
        assert_eq!(eval.recall_samples, 0);
        assert_eq!(eval.recall_at_k, 0.0);
        assert_eq!(eval.samples_evaluated, 1);
    }

    #[test]
    fn test_missing_source_is_counted_as_failure() {
        let (mut dataset, collection, embedder) = overlap_fixture();
        dataset.samples.push(sample("Another question?", "missing-report"));

        let retriever = Retriever::new(&embedder, &collection);
        let evaluator = RetrievalEvaluator::new(RelevancePolicy::default(), 5, 1);

        let eval = evaluator
            .evaluate(&dataset, 10, &retriever, &collection)
            .unwrap();

        assert_eq!(eval.samples_evaluated, 1);
        assert_eq!(eval.samples_failed, 1);
    }

    #[test]
    fn test_limit_caps_samples() {
        let (mut dataset, collection, embedder) = overlap_fixture();
        dataset.samples.push(sample("What was the 2023 revenue?", "r1"));
        dataset.samples.push(sample("What was the 2023 revenue?", "r1"));

        let retriever = Retriever::new(&embedder, &collection);
        let evaluator = RetrievalEvaluator::new(RelevancePolicy::default(), 5, 1);

        let eval = evaluator
            .evaluate(&dataset, 2, &retriever, &collection)
            .unwrap();

        assert_eq!(eval.samples_evaluated, 2);
    }

    #[test]
    fn test_metrics_stay_in_range() {
        let (dataset, collection, embedder) = overlap_fixture();
        let retriever = Retriever::new(&embedder, &collection);
        let evaluator = RetrievalEvaluator::new(RelevancePolicy::default(), 5, 2);

        let eval = evaluator
            .evaluate(&dataset, 10, &retriever, &collection)
            .unwrap();

        for value in [eval.precision_at_k, eval.recall_at_k, eval.mrr] {
            assert!((0.0..=1.0).contains(&value));
        }
    }
}
