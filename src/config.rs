//! Configuration for the RAG pipeline.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// LLM configuration for answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gpt-4", "claude-3-opus")
    pub model: String,

    /// Maximum tokens for response (optional)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation (optional)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    200
}

fn default_temperature() -> f32 {
    0.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: "claude-latest".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Retrieval and indexing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum tokens (words) per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_tokens: usize,

    /// Tokens shared between adjacent chunks.
    #[serde(default)]
    pub overlap_tokens: usize,

    /// Number of candidates fetched from the index per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Number of results returned to the caller (must be <= top_k).
    #[serde(default = "default_return_k")]
    pub return_k: usize,

    /// Word-overlap ratio above which a chunk counts as relevant in evaluation.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,

    /// Directory where index collections are persisted.
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Name of the index collection.
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_chunk_size() -> usize {
    100
}

fn default_top_k() -> usize {
    5
}

fn default_return_k() -> usize {
    2
}

fn default_relevance_threshold() -> f64 {
    0.5
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("data/index")
}

fn default_collection() -> String {
    "finance_docs".to_string()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size_tokens: default_chunk_size(),
            overlap_tokens: 0,
            top_k: default_top_k(),
            return_k: default_return_k(),
            relevance_threshold: default_relevance_threshold(),
            index_dir: default_index_dir(),
            collection: default_collection(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Retrieval and index settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    retrieval: Option<RetrievalFileSection>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RetrievalFileSection {
    chunk_size_tokens: Option<usize>,
    overlap_tokens: Option<usize>,
    top_k: Option<usize>,
    return_k: Option<usize>,
    relevance_threshold: Option<f64>,
    index_dir: Option<PathBuf>,
    collection: Option<String>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_BASE, LLM_API_KEY, LLM_MODEL)
    /// 2. Config file (~/.config/finrag/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file first
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        // Override with environment variables
        if let Ok(api_base) = env::var("LLM_API_BASE") {
            config.llm.api_base = api_base;
        }

        if let Ok(api_key) = env::var("LLM_API_KEY") {
            config.llm.api_key = api_key;
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            config.llm.model = model;
        }

        if let Ok(max_tokens) = env::var("LLM_MAX_TOKENS") {
            if let Ok(tokens) = max_tokens.parse() {
                config.llm.max_tokens = tokens;
            }
        }

        if let Ok(temperature) = env::var("LLM_TEMPERATURE") {
            if let Ok(temp) = temperature.parse() {
                config.llm.temperature = temp;
            }
        }

        if let Ok(index_dir) = env::var("FINRAG_INDEX_DIR") {
            config.retrieval.index_dir = PathBuf::from(index_dir);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;

        let file_config: ConfigFile = serde_yaml::from_str(&content)
            .map_err(|e| RagError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
        }

        if let Some(retrieval) = file_config.retrieval {
            if let Some(chunk_size) = retrieval.chunk_size_tokens {
                config.retrieval.chunk_size_tokens = chunk_size;
            }
            if let Some(overlap) = retrieval.overlap_tokens {
                config.retrieval.overlap_tokens = overlap;
            }
            if let Some(top_k) = retrieval.top_k {
                config.retrieval.top_k = top_k;
            }
            if let Some(return_k) = retrieval.return_k {
                config.retrieval.return_k = return_k;
            }
            if let Some(threshold) = retrieval.relevance_threshold {
                config.retrieval.relevance_threshold = threshold;
            }
            if let Some(index_dir) = retrieval.index_dir {
                config.retrieval.index_dir = index_dir;
            }
            if let Some(collection) = retrieval.collection {
                config.retrieval.collection = collection;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "finrag")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present and consistent.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(RagError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(RagError::Config(
                "LLM API key is required. Set LLM_API_KEY environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(RagError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        self.validate_retrieval()
    }

    /// Validate retrieval settings only (ingestion does not need LLM access).
    pub fn validate_retrieval(&self) -> Result<()> {
        if self.retrieval.chunk_size_tokens == 0 {
            return Err(RagError::Config(
                "chunk_size_tokens must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.overlap_tokens >= self.retrieval.chunk_size_tokens {
            return Err(RagError::Config(format!(
                "overlap_tokens ({}) must be less than chunk_size_tokens ({})",
                self.retrieval.overlap_tokens, self.retrieval.chunk_size_tokens
            )));
        }

        if self.retrieval.return_k == 0 || self.retrieval.return_k > self.retrieval.top_k {
            return Err(RagError::Config(format!(
                "return_k ({}) must be between 1 and top_k ({})",
                self.retrieval.return_k, self.retrieval.top_k
            )));
        }

        Ok(())
    }

    /// Create a config from explicit LLM values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                ..Default::default()
            },
            retrieval: RetrievalConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.llm.api_base.is_empty());
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.retrieval.chunk_size_tokens, 100);
        assert_eq!(config.retrieval.overlap_tokens, 0);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.return_k, 2);
        assert_eq!(config.retrieval.collection, "finance_docs");
    }

    #[test]
    fn test_validate_fails_without_required_fields() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_retrieval_rejects_zero_chunk_size() {
        let mut config = Config::default();
        config.retrieval.chunk_size_tokens = 0;
        assert!(config.validate_retrieval().is_err());
    }

    #[test]
    fn test_validate_retrieval_rejects_overlap_ge_chunk_size() {
        let mut config = Config::default();
        config.retrieval.chunk_size_tokens = 50;
        config.retrieval.overlap_tokens = 50;
        assert!(config.validate_retrieval().is_err());
    }

    #[test]
    fn test_validate_retrieval_rejects_return_k_above_top_k() {
        let mut config = Config::default();
        config.retrieval.top_k = 3;
        config.retrieval.return_k = 4;
        assert!(config.validate_retrieval().is_err());
    }

    #[test]
    fn test_with_llm() {
        let config = Config::with_llm("https://api.example.com", "test-key", "gpt-4");
        assert_eq!(config.llm.api_base, "https://api.example.com");
        assert_eq!(config.llm.api_key, "test-key");
        assert_eq!(config.llm.model, "gpt-4");
    }
}
