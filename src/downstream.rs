//! Relay of extracted parameters to the financial data service
//!
//! The service exposes one endpoint per intent and answers with arbitrary
//! JSON, which is passed back to the caller untouched.

use crate::config::DownstreamConfig;
use crate::error::AssistantError;
use crate::models::{ExtractedParameters, Intent};
use crate::Result;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

/// Endpoint path for each intent
pub fn endpoint_for(intent: Intent) -> &'static str {
    match intent {
        Intent::GetStat => "/lookup",
        Intent::GetChart => "/chart",
        Intent::SmallTalk | Intent::Unknown => "/ping",
    }
}

#[derive(Clone)]
pub struct FinancialDataClient {
    client: Client,
    base_url: String,
}

impl FinancialDataClient {
    pub fn new(config: &DownstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `params` (or `null`) to the intent's endpoint and return its JSON body
    pub async fn relay(&self, intent: Intent, params: Option<&ExtractedParameters>) -> Result<Value> {
        let path = endpoint_for(intent);
        let body = match params {
            Some(params) => serde_json::to_value(params)?,
            None => Value::Null,
        };

        self.post_json(path, &body).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        info!(%url, "Relaying parameters to financial data service");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(path, "Financial data request failed: {}", e);
                AssistantError::DownstreamError(format!("request to {} failed", path))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(path, %status, "Financial data service error response: {}", text);
            return Err(AssistantError::DownstreamError(format!(
                "{} returned {}",
                path, status
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            error!(path, "Financial data service sent invalid JSON: {}", e);
            AssistantError::DownstreamError(format!("invalid JSON from {}", path))
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::net::SocketAddr;

    /// Local stand-in for the financial data service; echoes what it received
    pub(crate) async fn spawn_financial_service() -> SocketAddr {
        let app = Router::new()
            .route(
                "/lookup",
                post(|Json(body): Json<Value>| async move {
                    Json(serde_json::json!({ "endpoint": "lookup", "received": body }))
                }),
            )
            .route(
                "/chart",
                post(|Json(body): Json<Value>| async move {
                    Json(serde_json::json!({ "endpoint": "chart", "received": body }))
                }),
            )
            .route(
                "/ping",
                post(|Json(body): Json<Value>| async move {
                    Json(serde_json::json!({ "endpoint": "ping", "received": body }))
                }),
            )
            .route(
                "/broken/lookup",
                post(|| async { (StatusCode::BAD_GATEWAY, "upstream exploded") }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    pub(crate) fn client_for(base_url: String) -> FinancialDataClient {
        FinancialDataClient::new(&DownstreamConfig {
            base_url,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_routing() {
        assert_eq!(endpoint_for(Intent::GetStat), "/lookup");
        assert_eq!(endpoint_for(Intent::GetChart), "/chart");
        assert_eq!(endpoint_for(Intent::SmallTalk), "/ping");
        assert_eq!(endpoint_for(Intent::Unknown), "/ping");
    }

    #[tokio::test]
    async fn test_relay_posts_parameters() {
        let addr = spawn_financial_service().await;
        let client = client_for(format!("http://{}/", addr));

        let params = ExtractedParameters::Structured(serde_json::json!({"ticker": "TSLA", "metric": "PX_LAST"}));
        let response = client.relay(Intent::GetStat, Some(&params)).await.unwrap();

        assert_eq!(response["endpoint"], "lookup");
        assert_eq!(response["received"]["ticker"], "TSLA");
    }

    #[tokio::test]
    async fn test_relay_sends_null_without_parameters() {
        let addr = spawn_financial_service().await;
        let client = client_for(format!("http://{}", addr));

        let response = client.relay(Intent::SmallTalk, None).await.unwrap();
        assert_eq!(response["endpoint"], "ping");
        assert!(response["received"].is_null());
    }

    #[tokio::test]
    async fn test_relay_error_status() {
        let addr = spawn_financial_service().await;
        let client = client_for(format!("http://{}/broken", addr));

        let result = client.relay(Intent::GetStat, None).await;
        assert!(matches!(result, Err(AssistantError::DownstreamError(msg)) if msg.contains("502")));
    }
}
