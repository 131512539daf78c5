//! Hosted completion API client
//!
//! `CompletionClient` is the seam the extractor talks to; `OpenAiClient`
//! implements it against the OpenAI Responses API with a long-lived
//! reqwest::Client for connection pooling.

use crate::config::OpenAiConfig;
use crate::error::AssistantError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Sampling settings for a single completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_output_tokens: 256,
        }
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, settings: CompletionSettings) -> crate::Result<String>;
}

/// Reusable OpenAI client (connection-pooled)
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str, settings: CompletionSettings) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(AssistantError::CompletionError(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}/responses", self.base_url);

        let request = ResponsesRequest {
            model: &self.model,
            input: prompt,
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
        };

        info!(model = %self.model, "Calling completion API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Completion API request failed: {}", e);
                AssistantError::CompletionError(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Completion API error response: {}", error_text);
            return Err(AssistantError::CompletionError(format!(
                "API returned {}",
                status
            )));
        }

        let body: ResponsesResponse = response.json().await.map_err(|e| {
            error!("Failed to parse completion response: {}", e);
            AssistantError::CompletionError(format!("parse error: {}", e))
        })?;

        let text = body.output_text();
        if text.trim().is_empty() {
            return Err(AssistantError::CompletionError(
                "Empty response from completion API".to_string(),
            ));
        }

        info!(chars = text.len(), "Completion received");
        Ok(text.trim().to_string())
    }
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesResponse {
    /// Concatenate the `output_text` parts of all message items
    fn output_text(&self) -> String {
        self.output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};

    fn config(base_url: String, api_key: &str) -> OpenAiConfig {
        OpenAiConfig {
            api_key: api_key.to_string(),
            base_url,
            model: "gpt-3.5-turbo".to_string(),
            max_output_tokens: 64,
        }
    }

    #[test]
    fn test_request_serialization() {
        let request = ResponsesRequest {
            model: "gpt-3.5-turbo",
            input: "What is Tesla's stock price today?",
            temperature: 0.0,
            max_output_tokens: 128,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input"], "What is Tesla's stock price today?");
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["max_output_tokens"], 128);
    }

    #[test]
    fn test_output_text_skips_non_message_items() {
        let body: ResponsesResponse = serde_json::from_value(serde_json::json!({
            "output": [
                { "type": "reasoning", "content": [] },
                { "type": "message", "content": [
                    { "type": "output_text", "text": "{\"metric\": " },
                    { "type": "refusal", "refusal": "no" },
                    { "type": "output_text", "text": "\"REV\"}" }
                ]}
            ]
        }))
        .unwrap();

        assert_eq!(body.output_text(), r#"{"metric": "REV"}"#);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_an_error() {
        let client = OpenAiClient::new(&config("http://127.0.0.1:9".to_string(), "")).unwrap();
        let result = client.complete("hi", CompletionSettings::default()).await;
        assert!(matches!(result, Err(AssistantError::CompletionError(msg)) if msg.contains("OPENAI_API_KEY")));
    }

    #[tokio::test]
    async fn test_complete_against_local_server() {
        async fn responses(headers: HeaderMap, Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Json(serde_json::json!({
                "output": [{ "type": "message", "content": [
                    { "type": "output_text", "text": format!("  {} | {} | {}  ", auth, body["temperature"], body["input"].as_str().unwrap_or_default()) }
                ]}]
            }))
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/v1/responses", post(responses)))
                .await
                .unwrap();
        });

        let client = OpenAiClient::new(&config(format!("http://{}/v1/", addr), "sk-test")).unwrap();
        let text = client.complete("ping", CompletionSettings::default()).await.unwrap();

        assert_eq!(text, "Bearer sk-test | 0.0 | ping");
    }
}
