//! Document representation and TAT-QA corpus loading.
//!
//! The ingestion unit is a single paragraph from the TAT-QA financial
//! dataset, flattened out of the nested per-report structure. The ground
//! truth unit for evaluation is a [`SourceDocument`]: one report with all
//! of its paragraph texts.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A document to be chunked and indexed. Immutable after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (format: "{item_index}_{paragraph_order}").
    pub id: String,
    /// Full text content.
    pub text: String,
    /// Free-form metadata carried into the index.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    /// Create a document from raw text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A source report with its paragraph texts, used as evaluation ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Report identifier (TAT-QA `uid`, or a positional id if absent).
    pub id: String,
    /// All paragraph texts belonging to this report.
    pub paragraphs: Vec<String>,
}

/// Raw TAT-QA dataset item. One item is a financial report excerpt with
/// paragraphs, a table (ignored here), and questions.
#[derive(Debug, Deserialize)]
pub(crate) struct TatqaItem {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub paragraphs: Vec<TatqaParagraph>,
    #[serde(default)]
    pub questions: Vec<TatqaQuestion>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TatqaParagraph {
    pub order: usize,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TatqaQuestion {
    pub question: String,
    /// Answers may be a plain string or a list of parts.
    #[serde(default)]
    pub answer: serde_json::Value,
    /// "text", "table", or "table-text". Only text questions are usable here.
    #[serde(default)]
    pub answer_from: String,
}

/// Parse a TAT-QA JSON file into raw items.
pub(crate) fn load_tatqa_items(path: &Path) -> Result<Vec<TatqaItem>> {
    if !path.exists() {
        return Err(RagError::DatasetNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
    let items: Vec<TatqaItem> = serde_json::from_str(&content)?;
    Ok(items)
}

/// Load a TAT-QA dataset as a flat corpus of paragraph documents plus the
/// per-report source documents used for evaluation ground truth.
///
/// Paragraph documents get ids of the form "{item_index}_{paragraph_order}",
/// matching the chunk id scheme used at ingestion time.
pub fn load_tatqa_corpus(path: &Path) -> Result<(Vec<Document>, Vec<SourceDocument>)> {
    let items = load_tatqa_items(path)?;

    let mut documents = Vec::new();
    let mut sources = Vec::new();

    for (idx, item) in items.iter().enumerate() {
        let source_id = item.uid.clone().unwrap_or_else(|| idx.to_string());

        let mut paragraphs = Vec::new();
        for para in &item.paragraphs {
            let doc = Document::new(format!("{}_{}", idx, para.order), para.text.clone())
                .with_metadata("source_id", source_id.clone());
            documents.push(doc);
            paragraphs.push(para.text.clone());
        }

        sources.push(SourceDocument {
            id: source_id,
            paragraphs,
        });
    }

    Ok((documents, sources))
}
