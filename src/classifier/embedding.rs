//! Pretrained sentence encoder feeding the intent head.
//!
//! The encoder is a BERT checkpoint from the Hugging Face Hub run with candle.
//! Token embeddings are mean-pooled over the attention mask and L2-normalized,
//! so every sentence maps to a unit vector of `hidden_size` floats.

use crate::error::AssistantError;
use crate::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::sync::ApiBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::info;

pub const DEFAULT_ENCODER_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Maps a sentence to a fixed-size embedding
pub trait SentenceEncoder: Send + Sync {
    /// Model identifier recorded in the training metadata
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Write the tokenizer definition next to the head weights
    fn save_tokenizer(&self, path: &Path) -> Result<()>;
}

/// BERT encoder loaded from the Hugging Face Hub
pub struct BertEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    model_name: String,
}

impl BertEncoder {
    /// Download (or reuse the cached copy of) `model_name`.
    ///
    /// `tokenizer_file` replaces the hub tokenizer with a previously saved one.
    pub fn from_hub(model_name: &str, tokenizer_file: Option<&Path>) -> Result<Self> {
        let device = Device::Cpu;

        let api = ApiBuilder::new()
            .with_cache_dir(hub_cache_dir())
            .build()
            .map_err(|e| encoder_error("HF API initialization failed", e))?;
        let repo = api.model(model_name.to_string());

        let config_path = repo
            .get("config.json")
            .map_err(|e| encoder_error("Config download failed", e))?;
        let config: Config = serde_json::from_str(&fs::read_to_string(config_path)?)?;

        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| encoder_error("Weights download failed", e))?;
        let vb = VarBuilder::from_buffered_safetensors(fs::read(weights_path)?, DType::F32, &device)?;
        let model = BertModel::load(vb, &config)?;

        let tokenizer_path = match tokenizer_file {
            Some(path) => path.to_path_buf(),
            None => repo
                .get("tokenizer.json")
                .map_err(|e| encoder_error("Tokenizer download failed", e))?,
        };
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| encoder_error("Tokenizer load failed", e))?;

        info!(
            model = model_name,
            dimension = config.hidden_size,
            tokenizer = %tokenizer_path.display(),
            "Sentence encoder loaded"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension: config.hidden_size,
            model_name: model_name.to_string(),
        })
    }
}

impl SentenceEncoder for BertEncoder {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| encoder_error("Tokenization failed", e))?;

        let token_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = token_ids.zeros_like()?;

        // (1, seq, hidden)
        let hidden = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean over unmasked tokens
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let pooled = hidden
            .broadcast_mul(&mask)?
            .sum(1)?
            .broadcast_div(&mask.sum(1)?)?;

        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norm)?;

        Ok(normalized.squeeze(0)?.to_vec1::<f32>()?)
    }

    fn save_tokenizer(&self, path: &Path) -> Result<()> {
        self.tokenizer
            .save(path, true)
            .map_err(|e| encoder_error("Tokenizer save failed", e))
    }
}

fn hub_cache_dir() -> PathBuf {
    std::env::var("HF_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|home| Path::new(&home).join(".cache/huggingface")))
        .unwrap_or_else(|_| PathBuf::from("/tmp/huggingface"))
}

fn encoder_error(context: &str, e: impl std::fmt::Display) -> AssistantError {
    AssistantError::EncoderError(format!("{}: {}", context, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    #[ignore = "requires downloading the pretrained encoder (~90MB)"]
    fn test_bert_encoder_produces_unit_vectors() {
        let encoder = BertEncoder::from_hub(DEFAULT_ENCODER_MODEL, None).unwrap();
        let embedding = encoder.embed("What was Tesla's revenue in 2023?").unwrap();

        assert_eq!(embedding.len(), encoder.dimension());
        assert!((cosine(&embedding, &embedding) - 1.0).abs() < 1e-4);
        assert_eq!(encoder.embed("").unwrap().len(), encoder.dimension());
    }

    #[test]
    #[ignore = "requires downloading the pretrained encoder (~90MB)"]
    fn test_paraphrases_are_closer_than_unrelated_text() {
        let encoder = BertEncoder::from_hub(DEFAULT_ENCODER_MODEL, None).unwrap();
        let chart = encoder.embed("Plot Apple's stock price").unwrap();
        let paraphrase = encoder.embed("Diagram Apple share prices").unwrap();
        let greeting = encoder.embed("Good morning, how are you?").unwrap();

        assert!(cosine(&chart, &paraphrase) > cosine(&chart, &greeting));
    }

    #[test]
    #[ignore = "requires downloading the pretrained encoder (~90MB)"]
    fn test_saved_tokenizer_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");

        let encoder = BertEncoder::from_hub(DEFAULT_ENCODER_MODEL, None).unwrap();
        encoder.save_tokenizer(&path).unwrap();
        let reloaded = BertEncoder::from_hub(DEFAULT_ENCODER_MODEL, Some(&path)).unwrap();

        let message = "Show me Nvidia's earnings";
        assert_eq!(encoder.embed(message).unwrap(), reloaded.embed(message).unwrap());
    }
}
