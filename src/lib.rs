//! Financial Query Assistant
//!
//! A chat endpoint for financial questions that:
//! - Classifies each message as a statistic lookup, chart request, or small talk
//! - Extracts structured query parameters through a hosted completion API
//! - Optionally relays the parameters to a financial data service
//!
//! PIPELINE:
//! MESSAGE → INTENT → PARAMETERS → RELAY? → RESPONSE

pub mod api;
pub mod classifier;
pub mod config;
pub mod downstream;
pub mod error;
pub mod extractor;
pub mod models;
pub mod openai;
pub mod pipeline;
pub mod tickers;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use classifier::IntentClassifier;
pub use extractor::ParameterExtractor;
pub use pipeline::{ChatOutcome, ChatPipeline};
