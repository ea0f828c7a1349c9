//! Local embedding model using candle + sentence-transformers.
//!
//! The model is an explicit resource handle: load it once at startup and pass
//! it by reference to every component that needs it. Loading downloads the
//! weights from the Hugging Face Hub on first use and caches them on disk.

use crate::error::{RagError, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::Tokenizer;

/// Text-to-vector provider. The seam that lets retrieval and evaluation run
/// against a stub in tests.
pub trait Embedder {
    /// Generate embeddings for a batch of texts. Output dimensionality is
    /// constant across calls.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text])?;
        embeddings.pop().ok_or_else(|| {
            RagError::ModelUnavailable("embedding model returned no output".to_string())
        })
    }

    /// Embedding dimensionality.
    fn dimension(&self) -> usize;
}

/// Per-token contextual embeddings, used by BERTScore.
pub trait TokenEmbedder {
    /// Encode a text into one vector per (non-special) token.
    fn encode_tokens(&self, text: &str) -> Result<Vec<Vec<f32>>>;
}

/// Embedding model for generating text embeddings.
pub struct EmbeddingModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl EmbeddingModel {
    /// Load the all-MiniLM-L6-v2 model from Hugging Face Hub (384 dimensions).
    pub fn load_minilm() -> Result<Self> {
        Self::load("sentence-transformers/all-MiniLM-L6-v2")
    }

    /// Load a sentence-transformers model by name.
    pub fn load(model_id: &str) -> Result<Self> {
        let device = Device::Cpu; // Use CPU for portability

        let api = Api::new()
            .map_err(|e| RagError::ModelUnavailable(format!("Failed to create HF Hub API: {}", e)))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        // Download model files
        let config_path = repo
            .get("config.json")
            .map_err(|e| RagError::ModelUnavailable(format!("Failed to get config.json: {}", e)))?;
        let tokenizer_path = repo.get("tokenizer.json").map_err(|e| {
            RagError::ModelUnavailable(format!("Failed to get tokenizer.json: {}", e))
        })?;
        let weights_path = repo
            .get("model.safetensors")
            .or_else(|_| repo.get("pytorch_model.bin"))
            .map_err(|e| {
                RagError::ModelUnavailable(format!("Failed to get model weights: {}", e))
            })?;

        // Load config
        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| RagError::io(&config_path, e))?;
        let config: BertConfig = serde_json::from_str(&config_str)
            .map_err(|e| RagError::ModelUnavailable(format!("Failed to parse config: {}", e)))?;

        // Load tokenizer
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| RagError::ModelUnavailable(format!("Failed to load tokenizer: {}", e)))?;

        // Load model weights
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device).map_err(|e| {
                RagError::ModelUnavailable(format!("Failed to load model weights: {}", e))
            })?
        };

        let dimension = config.hidden_size;
        let model = BertModel::load(vb, &config)
            .map_err(|e| RagError::ModelUnavailable(format!("Failed to load BERT model: {}", e)))?;

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension,
        })
    }

    fn inference_err(e: candle_core::Error) -> RagError {
        RagError::ModelUnavailable(format!("Embedding inference failed: {}", e))
    }

    /// Run the model over a padded batch, returning the raw hidden states
    /// of shape (batch, seq, hidden) plus the attention mask tensor.
    fn forward_batch(&self, texts: &[&str]) -> Result<(Tensor, Tensor)> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| RagError::ModelUnavailable(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids_vec = Vec::new();
        let mut attention_mask_vec = Vec::new();
        let mut token_type_ids_vec = Vec::new();

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();

            // Pad to max_len
            let mut padded_ids = ids.to_vec();
            let mut padded_mask = mask.to_vec();
            let mut padded_types = vec![0u32; ids.len()];

            padded_ids.resize(max_len, 0);
            padded_mask.resize(max_len, 0);
            padded_types.resize(max_len, 0);

            input_ids_vec.extend(padded_ids);
            attention_mask_vec.extend(padded_mask);
            token_type_ids_vec.extend(padded_types);
        }

        let batch_size = texts.len();

        let input_ids = Tensor::from_vec(input_ids_vec, (batch_size, max_len), &self.device)
            .map_err(Self::inference_err)?;
        let attention_mask =
            Tensor::from_vec(attention_mask_vec, (batch_size, max_len), &self.device)
                .map_err(Self::inference_err)?;
        let token_type_ids =
            Tensor::from_vec(token_type_ids_vec, (batch_size, max_len), &self.device)
                .map_err(Self::inference_err)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(Self::inference_err)?;

        Ok((output, attention_mask))
    }
}

impl Embedder for EmbeddingModel {
    /// Mean-pooled, L2-normalized sentence embeddings.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let (output, attention_mask) = self.forward_batch(texts)?;

        // Mean pooling over sequence dimension (with attention mask)
        let pooled = (|| -> candle_core::Result<Tensor> {
            let attention_mask_expanded = attention_mask
                .unsqueeze(2)?
                .to_dtype(output.dtype())?
                .broadcast_as(output.shape())?;

            let sum_embeddings = (&output * &attention_mask_expanded)?.sum(1)?;
            let sum_mask = attention_mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;
            let mean_embeddings = (sum_embeddings / sum_mask)?;

            // L2 normalize so cosine similarity reduces to a dot product
            let norms = mean_embeddings.sqr()?.sum_keepdim(1)?.sqrt()?;
            let shape = mean_embeddings.shape().clone();
            mean_embeddings / norms.broadcast_as(&shape)?
        })()
        .map_err(Self::inference_err)?;

        let rows = pooled.to_vec2::<f32>().map_err(Self::inference_err)?;
        Ok(rows)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

impl TokenEmbedder for EmbeddingModel {
    /// Contextual embedding per token, special tokens ([CLS], [SEP]) dropped,
    /// each vector L2-normalized.
    fn encode_tokens(&self, text: &str) -> Result<Vec<Vec<f32>>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| RagError::ModelUnavailable(format!("Tokenization failed: {}", e)))?;
        let special_mask = encoding.get_special_tokens_mask().to_vec();

        let (output, _) = self.forward_batch(&[text])?;
        let hidden = output
            .squeeze(0)
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(Self::inference_err)?;

        let mut tokens = Vec::new();
        for (row, special) in hidden.into_iter().zip(special_mask) {
            if special == 1 {
                continue;
            }
            tokens.push(normalize(&row));
        }

        Ok(tokens)
    }
}

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        v.to_vec()
    } else {
        v.iter().map(|x| x / norm).collect()
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
