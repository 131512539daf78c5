//! Error types for the financial query assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Pipeline Errors
    // =============================

    #[error("Classifier error: {0}")]
    ClassifierError(String),

    #[error("Sentence encoder error: {0}")]
    EncoderError(String),

    #[error("Training data error: {0}")]
    TrainingDataError(String),

    #[error("Completion API error: {0}")]
    CompletionError(String),

    #[error("Downstream service error: {0}")]
    DownstreamError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Tensor error: {0}")]
    TensorError(#[from] candle_core::Error),
}
