//! Evaluation dataset loading.
//!
//! Supports:
//! - TAT-QA (financial QA over tables and text; text questions only)
//! - Custom JSON format for user-provided datasets

use crate::document::{SourceDocument, load_tatqa_items};
use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Ground-truth answer. TAT-QA stores some answers as a single string and
/// some as a list of parts; both normalize to one canonical string before
/// any metric computation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ReferenceAnswer {
    /// Single answer string.
    Text(String),
    /// Multi-part answer; parts are joined with spaces.
    Parts(Vec<String>),
}

impl ReferenceAnswer {
    /// Canonical single-string form.
    pub fn normalized(&self) -> String {
        match self {
            ReferenceAnswer::Text(s) => s.clone(),
            ReferenceAnswer::Parts(parts) => parts.join(" "),
        }
    }

    /// Coerce an arbitrary JSON answer value (string, number, list, ...)
    /// into a reference answer.
    pub(crate) fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => ReferenceAnswer::Text(s.clone()),
            serde_json::Value::Array(items) => ReferenceAnswer::Parts(
                items
                    .iter()
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            other => ReferenceAnswer::Text(other.to_string()),
        }
    }
}

/// A single labeled question for evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSample {
    /// The question to answer.
    pub question: String,
    /// Ground truth answer.
    pub answer: ReferenceAnswer,
    /// Id of the source report this question was asked about.
    pub source_document_id: String,
}

/// A collection of evaluation samples with their ground-truth sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalDataset {
    /// Dataset name.
    pub name: String,
    /// Labeled questions.
    pub samples: Vec<EvaluationSample>,
    /// Source reports referenced by the samples.
    pub sources: Vec<SourceDocument>,
}

impl EvalDataset {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Look up the source report for a sample.
    pub fn source_for(&self, sample: &EvaluationSample) -> Option<&SourceDocument> {
        self.sources
            .iter()
            .find(|s| s.id == sample.source_document_id)
    }

    /// Load from a custom JSON file matching this struct's serialized shape.
    pub fn load_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::DatasetNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
        let dataset: EvalDataset = serde_json::from_str(&content)?;
        Ok(dataset)
    }

    /// Save to a JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| RagError::io(path, e))?;
        Ok(())
    }
}

/// Load evaluation samples from a TAT-QA dataset file.
///
/// Only questions answerable from text (`answer_from == "text"`) are kept;
/// table questions cannot be answered by a text-only pipeline.
pub fn load_tatqa_dataset(path: &Path) -> Result<EvalDataset> {
    let items = load_tatqa_items(path)?;

    let mut samples = Vec::new();
    let mut sources = Vec::new();

    for (idx, item) in items.iter().enumerate() {
        let source_id = item.uid.clone().unwrap_or_else(|| idx.to_string());

        sources.push(SourceDocument {
            id: source_id.clone(),
            paragraphs: item.paragraphs.iter().map(|p| p.text.clone()).collect(),
        });

        for q in &item.questions {
            if q.answer_from != "text" {
                continue;
            }
            if q.question.is_empty() {
                continue;
            }

            samples.push(EvaluationSample {
                question: q.question.clone(),
                answer: ReferenceAnswer::from_value(&q.answer),
                source_document_id: source_id.clone(),
            });
        }
    }

    Ok(EvalDataset {
        name: "TAT-QA".to_string(),
        samples,
        sources,
    })
}

/// Create a small built-in dataset for smoke testing without a dataset file.
pub fn create_sample_dataset() -> EvalDataset {
    let sources = vec![
        SourceDocument {
            id: "report-1".to_string(),
            paragraphs: vec![
                "Total revenue was 100 million in fiscal 2022 and grew to 120 million in fiscal 2023, driven by subscription sales.".to_string(),
                "Operating expenses declined from 45 million to 40 million over the same period due to lower headcount costs.".to_string(),
            ],
        },
        SourceDocument {
            id: "report-2".to_string(),
            paragraphs: vec![
                "The company repurchased 2 million shares during fiscal 2023 at an average price of 15 dollars per share.".to_string(),
            ],
        },
    ];

    let samples = vec![
        EvaluationSample {
            question: "What was the total revenue in fiscal 2023?".to_string(),
            answer: ReferenceAnswer::Text("120 million".to_string()),
            source_document_id: "report-1".to_string(),
        },
        EvaluationSample {
            question: "How did operating expenses change between fiscal 2022 and fiscal 2023?".to_string(),
            answer: ReferenceAnswer::Text(
                "Operating expenses declined from 45 million to 40 million.".to_string(),
            ),
            source_document_id: "report-1".to_string(),
        },
        EvaluationSample {
            question: "How many shares were repurchased during fiscal 2023 and at what price?".to_string(),
            answer: ReferenceAnswer::Parts(vec![
                "2 million shares".to_string(),
                "15 dollars per share".to_string(),
            ]),
            source_document_id: "report-2".to_string(),
        },
    ];

    EvalDataset {
        name: "sample".to_string(),
        samples,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_reference_answer_normalization() {
        let scalar = ReferenceAnswer::Text("A".to_string());
        assert_eq!(scalar.normalized(), "A");

        let multi = ReferenceAnswer::Parts(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(multi.normalized(), "A B");
    }

    #[test]
    fn test_reference_answer_from_value() {
        let s = ReferenceAnswer::from_value(&serde_json::json!("120"));
        assert_eq!(s.normalized(), "120");

        let list = ReferenceAnswer::from_value(&serde_json::json!(["120", "million"]));
        assert_eq!(list.normalized(), "120 million");

        let number = ReferenceAnswer::from_value(&serde_json::json!(42));
        assert_eq!(number.normalized(), "42");
    }

    #[test]
    fn test_reference_answer_untagged_serde() {
        let scalar: ReferenceAnswer = serde_json::from_str(r#""120""#).unwrap();
        assert_eq!(scalar, ReferenceAnswer::Text("120".to_string()));

        let multi: ReferenceAnswer = serde_json::from_str(r#"["A", "B"]"#).unwrap();
        assert_eq!(
            multi,
            ReferenceAnswer::Parts(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_sample_dataset() {
        let dataset = create_sample_dataset();
        assert!(!dataset.is_empty());
        assert_eq!(dataset.name, "sample");

        for sample in &dataset.samples {
            assert!(!sample.question.is_empty());
            assert!(dataset.source_for(sample).is_some());
        }
    }

    #[test]
    fn test_load_tatqa_filters_table_questions() {
        let raw = r#"[
            {
                "uid": "r1",
                "paragraphs": [{"order": 1, "text": "Revenue was 120 in 2023."}],
                "questions": [
                    {"question": "What was the 2023 revenue?", "answer": "120", "answer_from": "text"},
                    {"question": "What is the sum of assets?", "answer": ["500"], "answer_from": "table"}
                ]
            }
        ]"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(raw.as_bytes()).unwrap();

        let dataset = load_tatqa_dataset(file.path()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.samples[0].question, "What was the 2023 revenue?");
        assert_eq!(dataset.sources.len(), 1);
        assert_eq!(dataset.sources[0].id, "r1");
    }

    #[test]
    fn test_custom_json_round_trip() {
        let dataset = create_sample_dataset();
        let file = NamedTempFile::new().unwrap();

        dataset.save_json(file.path()).unwrap();
        let loaded = EvalDataset::load_json(file.path()).unwrap();

        assert_eq!(loaded.len(), dataset.len());
        assert_eq!(loaded.name, dataset.name);
    }
}
