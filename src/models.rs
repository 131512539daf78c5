//! Core data models for the financial query assistant

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Intent =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Lookup of a single financial statistic
    GetStat,
    /// Request for a chart specification
    GetChart,
    /// Greeting, joke or question about the bot itself
    SmallTalk,
    /// Label not recognised by this build
    Unknown,
}

impl Intent {
    pub const KNOWN: [Intent; 3] = [Intent::GetStat, Intent::GetChart, Intent::SmallTalk];

    /// Map a classifier label to an intent. Unrecognised labels fall back to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "get_stat" => Intent::GetStat,
            "get_chart" => Intent::GetChart,
            "small_talk" => Intent::SmallTalk,
            _ => Intent::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Intent::GetStat => "get_stat",
            Intent::GetChart => "get_chart",
            Intent::SmallTalk => "small_talk",
            Intent::Unknown => "unknown",
        }
    }

    /// Whether the completion for this intent is expected to be JSON
    pub fn expects_json(&self) -> bool {
        matches!(self, Intent::GetStat | Intent::GetChart)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

//
// ================= Training Data =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabeledExample {
    pub sentence: String,
    pub intent: String,
}

impl LabeledExample {
    pub fn new(sentence: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            sentence: sentence.into(),
            intent: intent.into(),
        }
    }
}

//
// ================= Extraction =================
//

/// Parameters produced by the completion API for a message.
///
/// Structured intents carry whatever JSON object the model produced (the
/// prompt defines the schema); conversational intents carry plain text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ExtractedParameters {
    Structured(serde_json::Value),
    Text(String),
}

impl ExtractedParameters {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ExtractedParameters::Structured(value) => Some(value),
            ExtractedParameters::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ExtractedParameters::Structured(_) => None,
            ExtractedParameters::Text(text) => Some(text),
        }
    }

    /// Error marker set by the model, e.g. `unsupported_metric`
    pub fn error_marker(&self) -> Option<&str> {
        self.as_json()?.get("error")?.as_str()
    }
}

//
// ================= HTTP =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub chat: String,
}
