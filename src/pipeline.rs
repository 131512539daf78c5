//! Chat pipeline: message → intent → parameters → optional relay
//!
//! Built once at startup and shared read-only by every request.

use crate::classifier::IntentClassifier;
use crate::downstream::FinancialDataClient;
use crate::extractor::ParameterExtractor;
use crate::models::{ExtractedParameters, Intent};
use crate::Result;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub intent: Intent,
    pub parameters: Option<ExtractedParameters>,
    /// Downstream body, when a financial data service is configured
    pub relayed: Option<Value>,
}

impl ChatOutcome {
    /// Downstream body if relayed, otherwise the extracted parameters (or `null`)
    pub fn into_body(self) -> Result<Value> {
        if let Some(relayed) = self.relayed {
            return Ok(relayed);
        }
        match self.parameters {
            Some(params) => Ok(serde_json::to_value(params)?),
            None => Ok(Value::Null),
        }
    }
}

pub struct ChatPipeline {
    classifier: IntentClassifier,
    extractor: ParameterExtractor,
    downstream: Option<FinancialDataClient>,
}

impl ChatPipeline {
    pub fn new(
        classifier: IntentClassifier,
        extractor: ParameterExtractor,
        downstream: Option<FinancialDataClient>,
    ) -> Self {
        Self {
            classifier,
            extractor,
            downstream,
        }
    }

    pub fn relays(&self) -> bool {
        self.downstream.is_some()
    }

    pub async fn handle(&self, message: &str) -> Result<ChatOutcome> {
        let intent = self.classifier.classify(message)?;
        info!(%intent, "Message classified");

        let parameters = self.extractor.extract(intent, message).await;
        if parameters.is_none() {
            info!(%intent, "No parameters extracted");
        }

        let relayed = match &self.downstream {
            Some(client) => Some(client.relay(intent, parameters.as_ref()).await?),
            None => None,
        };

        Ok(ChatOutcome {
            intent,
            parameters,
            relayed,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classifier::tests::sample_classifier;
    use crate::downstream::tests::{client_for, spawn_financial_service};
    use crate::extractor::tests::ScriptedCompletion;
    use std::sync::Arc;

    pub(crate) const STAT_REPLY: &str =
        r#"{"ticker": "AAPL", "metric": "REV", "start_date": "2023-01-01", "end_date": "2023-03-31"}"#;

    pub(crate) fn test_pipeline(downstream: Option<FinancialDataClient>) -> ChatPipeline {
        let classifier = sample_classifier();

        let completion = Arc::new(ScriptedCompletion::new(&[
            ("get_stat", STAT_REPLY),
            ("get_chart", "not json at all"),
            ("small_talk", "Hello! How can I help you today?"),
        ]));

        ChatPipeline::new(classifier, ParameterExtractor::new(completion, 128), downstream)
    }

    #[tokio::test]
    async fn test_stat_without_relay_returns_parameters() {
        let pipeline = test_pipeline(None);
        let outcome = pipeline.handle("Apple revenue in Q1 2023").await.unwrap();

        assert_eq!(outcome.intent, Intent::GetStat);
        assert!(outcome.relayed.is_none());
        let body = outcome.into_body().unwrap();
        assert_eq!(body["metric"], "REV");
    }

    #[tokio::test]
    async fn test_failed_extraction_yields_null_body() {
        let pipeline = test_pipeline(None);
        let outcome = pipeline
            .handle("Show me a bar chart of Apple's quarterly revenue")
            .await
            .unwrap();

        assert_eq!(outcome.intent, Intent::GetChart);
        assert!(outcome.parameters.is_none());
        assert_eq!(outcome.into_body().unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_relay_returns_downstream_body() {
        let addr = spawn_financial_service().await;
        let pipeline = test_pipeline(Some(client_for(format!("http://{}", addr))));
        assert!(pipeline.relays());

        let outcome = pipeline.handle("Tell me a joke").await.unwrap();
        assert_eq!(outcome.intent, Intent::SmallTalk);

        let body = outcome.into_body().unwrap();
        assert_eq!(body["endpoint"], "ping");
        assert_eq!(body["received"], "Hello! How can I help you today?");
    }

    #[tokio::test]
    async fn test_chart_failure_still_relays_null() {
        let addr = spawn_financial_service().await;
        let pipeline = test_pipeline(Some(client_for(format!("http://{}", addr))));

        let body = pipeline
            .handle("Generate a pie chart of market share")
            .await
            .unwrap()
            .into_body()
            .unwrap();

        assert_eq!(body["endpoint"], "chart");
        assert!(body["received"].is_null());
    }

    #[tokio::test]
    async fn test_downstream_failure_is_an_error() {
        let addr = spawn_financial_service().await;
        let pipeline = test_pipeline(Some(client_for(format!("http://{}/broken", addr))));

        assert!(pipeline.handle("Apple revenue in Q1 2023").await.is_err());
    }
}
