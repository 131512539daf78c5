use financial_query_assistant::{
    api::start_server,
    classifier::{pretrained_encoder, IntentClassifier},
    config::AppConfig,
    downstream::FinancialDataClient,
    extractor::ParameterExtractor,
    openai::OpenAiClient,
    pipeline::ChatPipeline,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    info!("🚀 Financial Query Assistant - API Server");
    info!("📍 Port: {}", config.port);

    // Expensive to build; shared by every request
    let encoder = pretrained_encoder(&config.classifier)?;
    let classifier = IntentClassifier::load_or_train(&config.classifier, encoder)?;
    info!(labels = ?classifier.labels(), "✅ Classifier ready");

    let completion = Arc::new(OpenAiClient::new(&config.openai)?);
    let extractor = ParameterExtractor::new(completion, config.openai.max_output_tokens);

    let downstream = match &config.downstream {
        Some(downstream) => {
            let client = FinancialDataClient::new(downstream)?;
            info!(base_url = %client.base_url(), "Relaying to financial data service");
            Some(client)
        }
        None => {
            info!("FINANCIAL_API_BASE_URL not set; returning extracted parameters directly");
            None
        }
    };

    let pipeline = Arc::new(ChatPipeline::new(classifier, extractor, downstream));

    info!("📡 Starting API server...");

    start_server(pipeline, config.port).await?;

    Ok(())
}
