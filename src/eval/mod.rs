//! Evaluation of retrieval and generation quality.
//!
//! Two evaluators share one dataset format:
//! - retrieval: Precision@K, Recall@K, and MRR against word-overlap ground
//!   truth derived from the dataset's source reports
//! - generation: ROUGE-1/2/L and BERTScore against reference answers
//!
//! The harness runs both and writes a JSON report.

pub mod bertscore;
pub mod dataset;
pub mod generation;
pub mod harness;
pub mod retrieval;
pub mod rouge;

pub use bertscore::{BertScore, bert_score};
pub use dataset::{
    EvalDataset, EvaluationSample, ReferenceAnswer, create_sample_dataset, load_tatqa_dataset,
};
pub use generation::{GenerationEvaluation, GenerationEvaluator};
pub use harness::{EvaluationConfig, EvaluationReport, ReportMetadata, run_evaluation};
pub use retrieval::{RelevancePolicy, RetrievalEvaluation, RetrievalEvaluator};
pub use rouge::{RougeScore, RougeScorer};
