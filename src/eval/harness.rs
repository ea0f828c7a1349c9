//! End-to-end evaluation harness.
//!
//! Runs the retrieval evaluator and the generation evaluator over one
//! dataset against one built collection, then packages the results into a
//! single JSON-serializable report.

use crate::embeddings::{Embedder, TokenEmbedder};
use crate::error::{RagError, Result};
use crate::eval::dataset::EvalDataset;
use crate::eval::generation::{GenerationEvaluation, GenerationEvaluator};
use crate::eval::retrieval::{RelevancePolicy, RetrievalEvaluation, RetrievalEvaluator};
use crate::index::Collection;
use crate::llm::AnswerGenerator;
use crate::retriever::{DEFAULT_RETURN_K, DEFAULT_TOP_K, Retriever};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Knobs for one evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    /// Samples scored by the retrieval evaluator.
    pub retrieval_samples: usize,
    /// Samples scored end to end by the generation evaluator. Smaller than
    /// the retrieval count because each sample costs an LLM call.
    pub generation_samples: usize,
    /// Candidates scanned in the index per query.
    pub fetch_k: usize,
    /// Results scored / included in context per query.
    pub top_k: usize,
    /// Relevance labeling for the retrieval metrics.
    pub relevance: RelevancePolicy,
    /// Skip the generation evaluator (no LLM calls).
    pub retrieval_only: bool,
    /// Print per-sample generation details.
    pub verbose: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            retrieval_samples: 50,
            generation_samples: 20,
            fetch_k: DEFAULT_TOP_K,
            top_k: DEFAULT_RETURN_K,
            relevance: RelevancePolicy::default(),
            retrieval_only: false,
            verbose: false,
        }
    }
}

/// Run bookkeeping attached to the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Dataset name.
    pub dataset: String,
    /// Retrieval samples scored.
    pub retrieval_samples: usize,
    /// Generation samples scored.
    pub generation_samples: usize,
    /// Samples the retrieval evaluator had to skip.
    pub retrieval_errors: usize,
    /// Samples the generation evaluator had to skip.
    pub generation_errors: usize,
    /// Wall-clock duration of the whole run.
    pub total_time_seconds: f64,
}

/// Combined evaluation results, serialized as the report artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub retrieval: RetrievalEvaluation,
    /// Absent when the run was retrieval-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationEvaluation>,
    pub metadata: ReportMetadata,
}

impl EvaluationReport {
    /// Write the report as pretty-printed JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| RagError::io(parent, e))?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| RagError::io(path, e))?;
        Ok(())
    }

    /// Load a previously saved report.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
        let report: EvaluationReport = serde_json::from_str(&content)?;
        Ok(report)
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Evaluation Report: {} ===", self.metadata.dataset);
        println!("\nRetrieval (K = {}):", self.retrieval.k);
        println!("  Precision@K: {:.4}", self.retrieval.precision_at_k);
        println!("  Recall@K:    {:.4}", self.retrieval.recall_at_k);
        println!("  MRR:         {:.4}", self.retrieval.mrr);
        println!(
            "  Samples:     {} scored, {} skipped",
            self.retrieval.samples_evaluated, self.retrieval.samples_failed
        );

        if let Some(generation) = &self.generation {
            println!("\nGeneration:");
            println!("  ROUGE-1:     {:.4}", generation.rouge1);
            println!("  ROUGE-2:     {:.4}", generation.rouge2);
            println!("  ROUGE-L:     {:.4}", generation.rouge_l);
            println!("  BERTScore P: {:.4}", generation.bertscore_precision);
            println!("  BERTScore R: {:.4}", generation.bertscore_recall);
            println!("  BERTScore F1:{:.4}", generation.bertscore_f1);
            println!(
                "  Samples:     {} scored, {} skipped",
                generation.samples_evaluated, generation.samples_failed
            );
        }

        println!(
            "\nTotal time: {:.1}s",
            self.metadata.total_time_seconds
        );
    }
}

/// Run the full evaluation: retrieval metrics, then (unless disabled)
/// generation metrics.
pub async fn run_evaluation<E, T, G>(
    config: &EvaluationConfig,
    dataset: &EvalDataset,
    collection: &Collection,
    embedder: &E,
    token_encoder: &T,
    generator: &G,
) -> Result<EvaluationReport>
where
    E: Embedder + ?Sized,
    T: TokenEmbedder + ?Sized,
    G: AnswerGenerator,
{
    let start = Instant::now();
    let retriever = Retriever::new(embedder, collection);

    println!(
        "Evaluating retrieval on up to {} samples...",
        config.retrieval_samples
    );
    let retrieval_eval = RetrievalEvaluator::new(config.relevance, config.fetch_k, config.top_k)
        .evaluate(dataset, config.retrieval_samples, &retriever, collection)?;

    let generation_eval = if config.retrieval_only {
        None
    } else {
        println!(
            "Evaluating generation on up to {} samples...",
            config.generation_samples
        );
        let eval = GenerationEvaluator::new(config.fetch_k, config.top_k)
            .verbose(config.verbose)
            .evaluate(
                dataset,
                config.generation_samples,
                &retriever,
                token_encoder,
                generator,
            )
            .await?;
        Some(eval)
    };

    let metadata = ReportMetadata {
        dataset: dataset.name.clone(),
        retrieval_samples: retrieval_eval.samples_evaluated,
        generation_samples: generation_eval
            .as_ref()
            .map(|g| g.samples_evaluated)
            .unwrap_or(0),
        retrieval_errors: retrieval_eval.samples_failed,
        generation_errors: generation_eval
            .as_ref()
            .map(|g| g.samples_failed)
            .unwrap_or(0),
        total_time_seconds: start.elapsed().as_secs_f64(),
    };

    Ok(EvaluationReport {
        retrieval: retrieval_eval,
        generation: generation_eval,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SourceDocument;
    use crate::eval::dataset::{EvaluationSample, ReferenceAnswer};
    use crate::index::IndexEntry;
    use crate::test_util::{FixedAnswerGenerator, OneHotTokenEmbedder, StubEmbedder};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn fixture() -> (EvalDataset, Collection, StubEmbedder) {
        let para = "Total revenue grew to 120 million in fiscal 2023 overall";
        let dataset = EvalDataset {
            name: "test".to_string(),
            samples: vec![EvaluationSample {
                question: "What was the 2023 revenue?".to_string(),
                answer: ReferenceAnswer::Text("120 million".to_string()),
                source_document_id: "r1".to_string(),
            }],
            sources: vec![SourceDocument {
                id: "r1".to_string(),
                paragraphs: vec![para.to_string()],
            }],
        };

        let collection = Collection {
            name: "test".to_string(),
            entries: vec![IndexEntry {
                chunk_id: "d1_c0".to_string(),
                embedding: vec![0.0, 1.0],
                text: para.to_string(),
                metadata: BTreeMap::new(),
            }],
        };

        let embedder =
            StubEmbedder::new(2).with_vector("What was the 2023 revenue?", vec![0.1, 0.9]);

        (dataset, collection, embedder)
    }

    #[tokio::test]
    async fn test_full_run_produces_report() {
        let (dataset, collection, embedder) = fixture();
        let encoder = OneHotTokenEmbedder::from_texts(&["120 million"]);
        let generator = FixedAnswerGenerator {
            answer: "120 million".to_string(),
        };
        let config = EvaluationConfig {
            top_k: 1,
            ..Default::default()
        };

        let report = run_evaluation(&config, &dataset, &collection, &embedder, &encoder, &generator)
            .await
            .unwrap();

        assert_eq!(report.metadata.dataset, "test");
        assert_eq!(report.metadata.retrieval_samples, 1);
        assert_eq!(report.metadata.generation_samples, 1);
        assert_eq!(report.metadata.retrieval_errors, 0);
        assert_eq!(report.metadata.generation_errors, 0);
        assert!(report.metadata.total_time_seconds >= 0.0);

        assert!((report.retrieval.precision_at_k - 1.0).abs() < 1e-9);
        let generation = report.generation.unwrap();
        assert!((generation.rouge1 - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_retrieval_only_skips_generation() {
        let (dataset, collection, embedder) = fixture();
        let encoder = OneHotTokenEmbedder::from_texts(&["120 million"]);
        let generator = FixedAnswerGenerator {
            answer: "should never be called".to_string(),
        };
        let config = EvaluationConfig {
            top_k: 1,
            retrieval_only: true,
            ..Default::default()
        };

        let report = run_evaluation(&config, &dataset, &collection, &embedder, &encoder, &generator)
            .await
            .unwrap();

        assert!(report.generation.is_none());
        assert_eq!(report.metadata.generation_samples, 0);
    }

    #[tokio::test]
    async fn test_report_json_round_trip() {
        let (dataset, collection, embedder) = fixture();
        let encoder = OneHotTokenEmbedder::from_texts(&["120 million"]);
        let generator = FixedAnswerGenerator {
            answer: "120 million".to_string(),
        };
        let config = EvaluationConfig {
            top_k: 1,
            ..Default::default()
        };

        let report = run_evaluation(&config, &dataset, &collection, &embedder, &encoder, &generator)
            .await
            .unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("eval.json");
        report.save_json(&path).unwrap();

        let loaded = EvaluationReport::load_json(&path).unwrap();
        assert_eq!(loaded.metadata.dataset, report.metadata.dataset);
        assert!(loaded.generation.is_some());
        assert!(
            (loaded.retrieval.precision_at_k - report.retrieval.precision_at_k).abs() < 1e-12
        );
    }
}
