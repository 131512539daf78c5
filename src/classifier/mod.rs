//! Intent Classifier
//!
//! Maps a chat message to one of the known intents (statistic lookup, chart
//! request, small talk). A pretrained sentence encoder embeds the message and a
//! linear head trained on the labeled dataset picks the intent. The head
//! weights, the encoder's tokenizer, and the label encoder are loaded from disk
//! when present; otherwise the head is trained, persisted, and reloaded.

pub mod embedding;
pub mod encoder;
pub mod model;

pub use embedding::{BertEncoder, SentenceEncoder, DEFAULT_ENCODER_MODEL};
pub use encoder::LabelEncoder;
pub use model::{LinearModel, ModelFile, TrainingMetadata, TrainingParams};

use crate::config::ClassifierConfig;
use crate::error::AssistantError;
use crate::models::{Intent, LabeledExample};
use crate::Result;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MODEL_FILE: &str = "model.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const ENCODER_FILE: &str = "encoder.json";

/// Pretrained encoder named by `config`, using the saved tokenizer when one exists
pub fn pretrained_encoder(config: &ClassifierConfig) -> Result<Arc<dyn SentenceEncoder>> {
    let saved = config.artifact_dir.join(TOKENIZER_FILE);
    let tokenizer = saved.exists().then_some(saved.as_path());
    let encoder: Arc<dyn SentenceEncoder> =
        Arc::new(BertEncoder::from_hub(&config.encoder_model, tokenizer)?);
    Ok(encoder)
}

/// Trained intent classifier
pub struct IntentClassifier {
    encoder: Arc<dyn SentenceEncoder>,
    labels: LabelEncoder,
    model: LinearModel,
}

impl IntentClassifier {
    /// Load persisted artifacts, or train from the dataset, save, and reload
    pub fn load_or_train(config: &ClassifierConfig, encoder: Arc<dyn SentenceEncoder>) -> Result<Self> {
        let dir = config.artifact_dir.as_path();

        if Self::artifacts_exist(dir) {
            let classifier = Self::load(dir, encoder)?;
            classifier.warn_if_dataset_changed(&config.training_data);
            return Ok(classifier);
        }

        info!(
            dir = %dir.display(),
            dataset = %config.training_data.display(),
            encoder = encoder.name(),
            "Classifier artifacts missing, training"
        );

        let examples = load_examples(&config.training_data)?;
        let params = TrainingParams {
            epochs: config.epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
        };

        Self::train(encoder.clone(), &examples, &params)?.save(dir)?;
        Self::load(dir, encoder)
    }

    pub fn artifacts_exist(dir: &Path) -> bool {
        [MODEL_FILE, TOKENIZER_FILE, ENCODER_FILE]
            .iter()
            .all(|name| dir.join(name).exists())
    }

    /// Fit the label encoder and the head on `examples` (order preserved)
    pub fn train(
        encoder: Arc<dyn SentenceEncoder>,
        examples: &[LabeledExample],
        params: &TrainingParams,
    ) -> Result<Self> {
        if examples.is_empty() {
            return Err(AssistantError::TrainingDataError(
                "Training dataset is empty".to_string(),
            ));
        }

        let labels = LabelEncoder::fit(examples.iter().map(|e| e.intent.as_str()));

        let samples = examples
            .iter()
            .map(|e| -> Result<(Vec<f32>, usize)> {
                Ok((encoder.embed(&e.sentence)?, labels.transform(&e.intent)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let (mut model, final_loss) =
            LinearModel::train(&samples, labels.len(), encoder.dimension(), params)?;

        model.metadata = Some(TrainingMetadata {
            encoder: encoder.name().to_string(),
            params: *params,
            examples: examples.len(),
            dataset_sha256: dataset_fingerprint(examples),
            trained_at: Utc::now(),
            final_loss,
        });

        info!(
            examples = examples.len(),
            labels = labels.len(),
            dimension = encoder.dimension(),
            epochs = params.epochs,
            batch_size = params.batch_size,
            final_loss,
            "Classifier trained"
        );

        Ok(Self {
            encoder,
            labels,
            model,
        })
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        write_json(&dir.join(MODEL_FILE), &self.model.to_file()?)?;
        self.encoder.save_tokenizer(&dir.join(TOKENIZER_FILE))?;
        write_json(&dir.join(ENCODER_FILE), &self.labels)?;

        info!(dir = %dir.display(), "Model, tokenizer, and encoder saved");
        Ok(())
    }

    pub fn load(dir: &Path, encoder: Arc<dyn SentenceEncoder>) -> Result<Self> {
        let tokenizer = dir.join(TOKENIZER_FILE);
        if !tokenizer.exists() {
            return Err(AssistantError::ClassifierError(format!(
                "Missing artifact {}",
                tokenizer.display()
            )));
        }

        let model = LinearModel::from_file(read_json(&dir.join(MODEL_FILE))?)?;
        let labels: LabelEncoder = read_json(&dir.join(ENCODER_FILE))?;

        if model.dimension() != encoder.dimension() || model.num_labels() != labels.len() {
            return Err(AssistantError::ClassifierError(format!(
                "Artifacts disagree: head is {}x{}, encoder has {} dimensions, label encoder has {} classes",
                model.num_labels(),
                model.dimension(),
                encoder.dimension(),
                labels.len()
            )));
        }

        if let Some(trained_on) = model.metadata.as_ref().map(|m| m.encoder.as_str()) {
            if trained_on != encoder.name() {
                warn!(
                    trained_on,
                    current = encoder.name(),
                    "Classifier head was trained on a different sentence encoder"
                );
            }
        }

        info!(dir = %dir.display(), "Loaded model, tokenizer, and encoder from disk");

        Ok(Self {
            encoder,
            labels,
            model,
        })
    }

    /// Raw label string predicted for `message`
    pub fn predict_label(&self, message: &str) -> Result<String> {
        let embedding = self.encoder.embed(message)?;
        let index = self.model.predict(&embedding)?;

        let label = self.labels.inverse_transform(index)?;
        debug!(label, "Message classified");
        Ok(label.to_string())
    }

    pub fn classify(&self, message: &str) -> Result<Intent> {
        Ok(Intent::from_label(&self.predict_label(message)?))
    }

    /// Fraction of `examples` whose predicted label differs from the expected one
    pub fn evaluate(&self, examples: &[LabeledExample]) -> Result<f32> {
        if examples.is_empty() {
            return Ok(0.0);
        }

        let mut errors = 0usize;
        for example in examples {
            if self.predict_label(&example.sentence)? != example.intent {
                errors += 1;
            }
        }

        Ok(errors as f32 / examples.len() as f32)
    }

    pub fn labels(&self) -> &[String] {
        self.labels.classes()
    }

    pub fn metadata(&self) -> Option<&TrainingMetadata> {
        self.model.metadata.as_ref()
    }

    fn warn_if_dataset_changed(&self, dataset: &Path) {
        let Some(metadata) = self.metadata() else {
            return;
        };
        let Ok(examples) = load_examples(dataset) else {
            return;
        };

        if dataset_fingerprint(&examples) != metadata.dataset_sha256 {
            warn!(
                dataset = %dataset.display(),
                "Training data changed since the classifier was trained; delete the artifacts to retrain"
            );
        }
    }
}

/// Read a JSON array of `{sentence, intent}` pairs
pub fn load_examples(path: &Path) -> Result<Vec<LabeledExample>> {
    let raw = fs::read_to_string(path).map_err(|e| {
        AssistantError::TrainingDataError(format!("Cannot read {}: {}", path.display(), e))
    })?;

    serde_json::from_str(&raw).map_err(|e| {
        AssistantError::TrainingDataError(format!("Malformed {}: {}", path.display(), e))
    })
}

/// SHA256 over the canonical JSON of the examples
pub fn dataset_fingerprint(examples: &[LabeledExample]) -> String {
    let mut hasher = Sha256::new();

    // Stream JSON directly into hasher (no intermediate String)
    if serde_json::to_writer(&mut HashWriter(&mut hasher), examples).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        AssistantError::ClassifierError(format!("Corrupt artifact {}: {}", path.display(), e))
    })
}
