use financial_query_assistant::{
    classifier::{load_examples, BertEncoder, IntentClassifier, TrainingParams},
    config::AppConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Retrain the intent classifier, persist it, and report the held-out error rate.
///
/// Any command-line arguments are classified with the fresh model.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let classifier_config = &config.classifier;

    info!(
        dataset = %classifier_config.training_data.display(),
        "Intent classifier training starting"
    );

    let examples = load_examples(&classifier_config.training_data)?;
    let params = TrainingParams {
        epochs: classifier_config.epochs,
        batch_size: classifier_config.batch_size,
        learning_rate: classifier_config.learning_rate,
    };

    // Always start from the hub tokenizer; a retrain replaces the saved artifacts
    let encoder = Arc::new(BertEncoder::from_hub(&classifier_config.encoder_model, None)?);
    info!(encoder = %classifier_config.encoder_model, "Sentence encoder ready");

    let classifier = IntentClassifier::train(encoder, &examples, &params)?;
    classifier.save(&classifier_config.artifact_dir)?;

    let train_error = classifier.evaluate(&examples)?;
    println!("\n=== TRAINING RESULT ===");
    println!("Examples: {}", examples.len());
    println!("Labels: {}", classifier.labels().join(", "));
    println!("Training error rate: {:.2}%", train_error * 100.0);

    let test_path = std::env::var("TEST_DATA_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/test.json"));

    match load_examples(&test_path) {
        Ok(test_examples) => {
            let test_error = classifier.evaluate(&test_examples)?;
            println!(
                "Error rate on test set ({} examples): {:.2}%",
                test_examples.len(),
                test_error * 100.0
            );
        }
        Err(e) => warn!("Skipping held-out evaluation: {}", e),
    }

    let messages: Vec<String> = std::env::args().skip(1).collect();
    if !messages.is_empty() {
        println!("\nPredictions:");
        for message in &messages {
            println!("  {} → {}", message, classifier.predict_label(message)?);
        }
    }

    Ok(())
}
