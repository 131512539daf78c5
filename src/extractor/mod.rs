//! Parameter extraction through the hosted completion API
//!
//! Renders the intent's instruction template around the user's message,
//! sends it at temperature 0, and turns the completion into parameters.
//! Every failure is logged and reported as `None`; nothing is raised.

pub mod prompts;

use crate::error::AssistantError;
use crate::models::{ExtractedParameters, Intent};
use crate::openai::{CompletionClient, CompletionSettings};
use crate::tickers;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub use prompts::{SUPPORTED_CHART_TYPES, SUPPORTED_METRICS, UNSUPPORTED_METRIC};

pub struct ParameterExtractor {
    client: Arc<dyn CompletionClient>,
    settings: CompletionSettings,
}

impl ParameterExtractor {
    pub fn new(client: Arc<dyn CompletionClient>, max_output_tokens: u32) -> Self {
        Self {
            client,
            settings: CompletionSettings {
                temperature: 0.0,
                max_output_tokens,
            },
        }
    }

    /// Template followed by the literal intent and query
    pub fn build_prompt(&self, intent: Intent, message: &str) -> String {
        format!(
            "{}\n\nIntent: {}\nQuery: {}\n",
            prompts::template_for(intent),
            intent,
            message.trim()
        )
    }

    pub async fn extract(&self, intent: Intent, message: &str) -> Option<ExtractedParameters> {
        let prompt = self.build_prompt(intent, message);

        let raw = match self.client.complete(&prompt, self.settings).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(%intent, "Error calling completion API: {}", e);
                return None;
            }
        };

        match parse_completion(intent, &raw) {
            Ok(params) => {
                debug!(%intent, "Parameters extracted");
                Some(params)
            }
            Err(e) => {
                error!(%intent, raw = %raw, "Discarding completion: {}", e);
                None
            }
        }
    }
}

/// Turn raw completion text into parameters for `intent`
pub fn parse_completion(intent: Intent, raw: &str) -> Result<ExtractedParameters> {
    if !intent.expects_json() {
        let text = strip_quotes(raw.trim());
        if text.is_empty() {
            return Err(AssistantError::CompletionError("Empty reply".to_string()));
        }
        return Ok(ExtractedParameters::Text(text.to_string()));
    }

    let mut value = parse_json_object(raw)?;

    match intent {
        Intent::GetStat => {
            check_stat_shape(&value)?;
            normalize_ticker(&mut value);
        }
        Intent::GetChart => check_chart_shape(&value)?,
        Intent::SmallTalk | Intent::Unknown => {}
    }

    Ok(ExtractedParameters::Structured(value))
}

/// Parse a JSON object, tolerating markdown fences and surrounding prose
fn parse_json_object(raw: &str) -> Result<Value> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let value = match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => value,
        Err(first_error) => {
            // Fallback: the largest { ... } block in the text
            let start = cleaned.find('{');
            let end = cleaned.rfind('}');
            match (start, end) {
                (Some(start), Some(end)) if start < end => {
                    serde_json::from_str(&cleaned[start..=end]).map_err(|_| first_error)?
                }
                _ => return Err(first_error.into()),
            }
        }
    };

    if !value.is_object() {
        return Err(AssistantError::CompletionError(format!(
            "Expected a JSON object, got {}",
            value
        )));
    }
    Ok(value)
}

/// An allow-listed metric, or an explicit unsupported-metric marker
fn check_stat_shape(value: &Value) -> Result<()> {
    if value.get("error").and_then(Value::as_str) == Some(UNSUPPORTED_METRIC) {
        return Ok(());
    }

    match value.get("metric").and_then(Value::as_str) {
        Some(metric) if SUPPORTED_METRICS.contains(&metric) => Ok(()),
        Some(metric) => Err(AssistantError::CompletionError(format!(
            "Metric '{}' is not in the allow-list",
            metric
        ))),
        None => Err(AssistantError::CompletionError(
            "Statistic response has no metric".to_string(),
        )),
    }
}

/// Charts always need a `type` and a `title`
fn check_chart_shape(value: &Value) -> Result<()> {
    for key in ["type", "title"] {
        match value.get(key).and_then(Value::as_str) {
            Some(v) if !v.trim().is_empty() => {}
            _ => {
                return Err(AssistantError::CompletionError(format!(
                    "Chart response is missing '{}'",
                    key
                )))
            }
        }
    }

    if let Some(chart) = value.get("type").and_then(Value::as_str) {
        if !SUPPORTED_CHART_TYPES.contains(&chart) {
            warn!(chart, "Completion used a chart type outside the allow-list");
        }
    }
    Ok(())
}

/// Replace company names in `ticker` (or a legacy `company` key) with the symbol
fn normalize_ticker(value: &mut Value) {
    let Some(object) = value.as_object_mut() else {
        return;
    };

    let candidate = object
        .get("ticker")
        .or_else(|| object.get("company"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Some(name) = candidate {
        match tickers::normalize(&name) {
            Some(ticker) => {
                object.insert("ticker".to_string(), Value::String(ticker));
            }
            None => debug!(name = %name, "No ticker known for company"),
        }
    }
}

fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
        .trim()
}
