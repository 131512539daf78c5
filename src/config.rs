//! Process configuration read from the environment (and `.env` if present)

use crate::classifier::DEFAULT_ENCODER_MODEL;
use crate::error::AssistantError;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub artifact_dir: PathBuf,
    pub training_data: PathBuf,
    /// Hugging Face Hub id of the pretrained sentence encoder
    pub encoder_model: String,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
}

#[derive(Debug, Clone)]
pub struct DownstreamConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub openai: OpenAiConfig,
    pub classifier: ClassifierConfig,
    /// `None` disables relaying; extracted parameters are returned directly
    pub downstream: Option<DownstreamConfig>,
}

impl AppConfig {
    /// Load `.env` then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
            warn!("OPENAI_API_KEY not set; parameter extraction will return null");
            String::new()
        });

        let port = match env::var("PORT").or_else(|_| env::var("API_PORT")) {
            Ok(raw) => parse_value("PORT", &raw)?,
            Err(_) => DEFAULT_PORT,
        };

        let downstream = match env::var("FINANCIAL_API_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Some(DownstreamConfig {
                base_url: url.trim().trim_end_matches('/').to_string(),
                timeout: Duration::from_secs(var_or("FINANCIAL_API_TIMEOUT_SECS", 30)?),
            }),
            _ => None,
        };

        Ok(Self {
            port,
            openai: OpenAiConfig {
                api_key,
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
                max_output_tokens: var_or("OPENAI_MAX_OUTPUT_TOKENS", 256)?,
            },
            classifier: ClassifierConfig {
                artifact_dir: env::var("CLASSIFIER_DIR")
                    .unwrap_or_else(|_| "data/classifier".to_string())
                    .into(),
                training_data: env::var("TRAINING_DATA_PATH")
                    .unwrap_or_else(|_| "data/train.json".to_string())
                    .into(),
                encoder_model: env::var("CLASSIFIER_ENCODER_MODEL")
                    .unwrap_or_else(|_| DEFAULT_ENCODER_MODEL.to_string()),
                epochs: var_or("CLASSIFIER_EPOCHS", 30)?,
                batch_size: var_or("CLASSIFIER_BATCH_SIZE", 2)?,
                learning_rate: var_or("CLASSIFIER_LEARNING_RATE", 1.0)?,
            },
            downstream,
        })
    }
}

fn var_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AssistantError::ConfigError(format!("{} has invalid value '{}'", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        let port: u16 = parse_value("PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);

        let bad: Result<u16> = parse_value("PORT", "eighty");
        assert!(matches!(bad, Err(AssistantError::ConfigError(msg)) if msg.contains("PORT")));
    }
}
