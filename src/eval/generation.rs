//! Generation quality evaluation.
//!
//! Runs the full RAG loop per sample (retrieve context, generate an answer)
//! and scores the answer against the ground truth with ROUGE-1/2/L and
//! BERTScore.

use crate::embeddings::{Embedder, TokenEmbedder};
use crate::error::Result;
use crate::eval::bertscore::bert_score;
use crate::eval::dataset::EvalDataset;
use crate::eval::rouge::RougeScorer;
use crate::llm::AnswerGenerator;
use crate::retriever::Retriever;
use serde::{Deserialize, Serialize};

/// Aggregated generation metrics from one evaluation run. All ROUGE values
/// are F-measures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationEvaluation {
    pub rouge1: f64,
    pub rouge2: f64,
    pub rouge_l: f64,
    pub bertscore_precision: f64,
    pub bertscore_recall: f64,
    pub bertscore_f1: f64,
    /// Samples that were scored.
    pub samples_evaluated: usize,
    /// Samples skipped because retrieval or generation failed.
    pub samples_failed: usize,
}

/// Scores generated answers against references over an evaluation dataset.
pub struct GenerationEvaluator {
    scorer: RougeScorer,
    /// Candidates scanned in the index per query.
    fetch_k: usize,
    /// Chunks included in the generation context.
    top_k: usize,
    /// Print per-sample question, answer, and reference.
    verbose: bool,
}

impl GenerationEvaluator {
    pub fn new(fetch_k: usize, top_k: usize) -> Self {
        Self {
            scorer: RougeScorer::new(),
            fetch_k: fetch_k.max(top_k),
            top_k,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Evaluate up to `limit` samples end to end.
    ///
    /// Generation failures are logged and excluded from the averages rather
    /// than aborting the run; a long evaluation should survive a transient
    /// API error.
    pub async fn evaluate<E, T, G>(
        &self,
        dataset: &EvalDataset,
        limit: usize,
        retriever: &Retriever<'_, E>,
        token_encoder: &T,
        generator: &G,
    ) -> Result<GenerationEvaluation>
    where
        E: Embedder + ?Sized,
        T: TokenEmbedder + ?Sized,
        G: AnswerGenerator,
    {
        let mut rouge1_sum = 0.0;
        let mut rouge2_sum = 0.0;
        let mut rouge_l_sum = 0.0;
        let mut bert_p_sum = 0.0;
        let mut bert_r_sum = 0.0;
        let mut bert_f1_sum = 0.0;
        let mut evaluated = 0usize;
        let mut failed = 0usize;

        for sample in dataset.samples.iter().take(limit) {
            let reference = sample.answer.normalized();
            if reference.trim().is_empty() {
                continue;
            }

            let context = match retriever.retrieve_context(&sample.question, self.fetch_k, self.top_k)
            {
                Ok(c) => c,
                Err(e) => {
                    eprintln!(
                        "Warning: retrieval failed for '{}': {}",
                        sample.question, e
                    );
                    failed += 1;
                    continue;
                }
            };

            let answer = match generator.generate(&sample.question, &context).await {
                Ok(a) => a,
                Err(e) => {
                    eprintln!(
                        "Warning: generation failed for '{}': {}",
                        sample.question, e
                    );
                    failed += 1;
                    continue;
                }
            };

            if self.verbose {
                println!("Q: {}", sample.question);
                println!("A: {}", answer);
                println!("Reference: {}\n", reference);
            }

            rouge1_sum += self.scorer.rouge_n(&reference, &answer, 1).fmeasure;
            rouge2_sum += self.scorer.rouge_n(&reference, &answer, 2).fmeasure;
            rouge_l_sum += self.scorer.rouge_l(&reference, &answer).fmeasure;

            let bert = bert_score(&answer, &reference, token_encoder)?;
            bert_p_sum += bert.precision;
            bert_r_sum += bert.recall;
            bert_f1_sum += bert.f1;

            evaluated += 1;
        }

        let mean = |sum: f64| if evaluated > 0 { sum / evaluated as f64 } else { 0.0 };

        Ok(GenerationEvaluation {
            rouge1: mean(rouge1_sum),
            rouge2: mean(rouge2_sum),
            rouge_l: mean(rouge_l_sum),
            bertscore_precision: mean(bert_p_sum),
            bertscore_recall: mean(bert_r_sum),
            bertscore_f1: mean(bert_f1_sum),
            samples_evaluated: evaluated,
            samples_failed: failed,
        })
    }
}
