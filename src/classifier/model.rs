//! Linear softmax head over sentence embeddings, trained with mini-batch SGD

use crate::error::AssistantError;
use crate::Result;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{loss, Init, Linear, Optimizer, VarMap, SGD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrainingParams {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 30,
            batch_size: 2,
            learning_rate: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingMetadata {
    /// Sentence encoder the head was trained on
    pub encoder: String,
    pub params: TrainingParams,
    pub examples: usize,
    pub dataset_sha256: String,
    pub trained_at: DateTime<Utc>,
    pub final_loss: f32,
}

/// On-disk form of the head (`model.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub num_labels: usize,
    pub dimension: usize,
    /// One row per label, `dimension` columns
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    pub metadata: Option<TrainingMetadata>,
}

#[derive(Debug, Clone)]
pub struct LinearModel {
    linear: Linear,
    num_labels: usize,
    dimension: usize,
    pub metadata: Option<TrainingMetadata>,
}

impl LinearModel {
    /// Fit a zero-initialized head on `(embedding, label index)` pairs in the given order.
    /// Returns the model and the mean cross-entropy of the last epoch.
    pub fn train(
        samples: &[(Vec<f32>, usize)],
        num_labels: usize,
        dimension: usize,
        params: &TrainingParams,
    ) -> Result<(Self, f32)> {
        if params.batch_size == 0 {
            return Err(AssistantError::ClassifierError(
                "Batch size must be at least 1".to_string(),
            ));
        }
        if let Some((_, label)) = samples.iter().find(|(_, label)| *label >= num_labels) {
            return Err(AssistantError::ClassifierError(format!(
                "Label index {} out of range ({} labels)",
                label, num_labels
            )));
        }
        if let Some((embedding, _)) = samples.iter().find(|(e, _)| e.len() != dimension) {
            return Err(AssistantError::ClassifierError(format!(
                "Embedding has {} values, expected {}",
                embedding.len(),
                dimension
            )));
        }

        let device = Device::Cpu;
        let varmap = VarMap::new();
        let weight = varmap.get(
            (num_labels, dimension),
            "weight",
            Init::Const(0.0),
            DType::F32,
            &device,
        )?;
        let bias = varmap.get(num_labels, "bias", Init::Const(0.0), DType::F32, &device)?;
        let linear = Linear::new(weight, Some(bias));

        let mut optimizer = SGD::new(varmap.all_vars(), f64::from(params.learning_rate))?;
        let mut epoch_loss: f32 = 0.0;

        for _ in 0..params.epochs {
            epoch_loss = 0.0;

            for batch in samples.chunks(params.batch_size) {
                let (inputs, targets) = batch_tensors(batch, dimension, &device)?;
                let batch_loss = loss::cross_entropy(&linear.forward(&inputs)?, &targets)?;
                optimizer.backward_step(&batch_loss)?;

                epoch_loss += batch_loss.to_scalar::<f32>()? * batch.len() as f32;
            }

            if !samples.is_empty() {
                epoch_loss /= samples.len() as f32;
            }
        }

        let model = Self {
            linear,
            num_labels,
            dimension,
            metadata: None,
        };
        Ok((model, epoch_loss))
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn logits(&self, embedding: &[f32]) -> Result<Vec<f32>> {
        if embedding.len() != self.dimension {
            return Err(AssistantError::ClassifierError(format!(
                "Embedding has {} values, head expects {}",
                embedding.len(),
                self.dimension
            )));
        }

        let input = Tensor::from_slice(embedding, (1, self.dimension), &Device::Cpu)?;
        Ok(self.linear.forward(&input)?.squeeze(0)?.to_vec1::<f32>()?)
    }

    /// Index of the largest logit; first wins on ties
    pub fn predict(&self, embedding: &[f32]) -> Result<usize> {
        argmax(&self.logits(embedding)?)
            .ok_or_else(|| AssistantError::ClassifierError("Model has no labels".to_string()))
    }

    pub fn to_file(&self) -> Result<ModelFile> {
        let bias = match self.linear.bias() {
            Some(bias) => bias.to_vec1::<f32>()?,
            None => vec![0.0; self.num_labels],
        };

        Ok(ModelFile {
            num_labels: self.num_labels,
            dimension: self.dimension,
            weights: self.linear.weight().to_vec2::<f32>()?,
            bias,
            metadata: self.metadata.clone(),
        })
    }

    /// Rebuild the head, checking the matrix shape first
    pub fn from_file(file: ModelFile) -> Result<Self> {
        if file.bias.len() != file.num_labels || file.weights.len() != file.num_labels {
            return Err(AssistantError::ClassifierError(format!(
                "Model declares {} labels but has {} weight rows and {} biases",
                file.num_labels,
                file.weights.len(),
                file.bias.len()
            )));
        }
        if let Some(row) = file.weights.iter().find(|row| row.len() != file.dimension) {
            return Err(AssistantError::ClassifierError(format!(
                "Weight row has {} columns, expected {}",
                row.len(),
                file.dimension
            )));
        }

        let device = Device::Cpu;
        let weight = Tensor::from_vec(
            file.weights.concat(),
            (file.num_labels, file.dimension),
            &device,
        )?;
        let bias = Tensor::from_vec(file.bias, file.num_labels, &device)?;

        Ok(Self {
            linear: Linear::new(weight, Some(bias)),
            num_labels: file.num_labels,
            dimension: file.dimension,
            metadata: file.metadata,
        })
    }
}

fn batch_tensors(
    batch: &[(Vec<f32>, usize)],
    dimension: usize,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let flat: Vec<f32> = batch
        .iter()
        .flat_map(|(embedding, _)| embedding.iter().copied())
        .collect();
    let labels: Vec<u32> = batch.iter().map(|(_, label)| *label as u32).collect();

    let inputs = Tensor::from_vec(flat, (batch.len(), dimension), device)?;
    let targets = Tensor::from_vec(labels, batch.len(), device)?;
    Ok((inputs, targets))
}

fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_hot(index: usize, dimension: usize) -> Vec<f32> {
        let mut v = vec![0.0; dimension];
        v[index] = 1.0;
        v
    }

    #[test]
    fn test_argmax_first_wins_on_ties() {
        assert_eq!(argmax(&[0.5, 0.5, 0.1]), Some(0));
        assert_eq!(argmax(&[0.1, 0.2, 0.9]), Some(2));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_train_separates_disjoint_embeddings() {
        let samples: Vec<(Vec<f32>, usize)> = (0..3).map(|i| (one_hot(i, 3), i)).collect();
        let params = TrainingParams { epochs: 20, batch_size: 2, learning_rate: 1.0 };
        let (model, loss) = LinearModel::train(&samples, 3, 3, &params).unwrap();

        assert!(loss < 0.5);
        for (embedding, label) in &samples {
            assert_eq!(model.predict(embedding).unwrap(), *label);
        }
    }

    #[test]
    fn test_untrained_head_predicts_first_label() {
        let samples = vec![(one_hot(0, 2), 1)];
        let params = TrainingParams { epochs: 0, ..TrainingParams::default() };
        let (model, _) = LinearModel::train(&samples, 2, 2, &params).unwrap();

        // All-zero logits tie; the first index wins
        assert_eq!(model.logits(&one_hot(1, 2)).unwrap(), vec![0.0, 0.0]);
        assert_eq!(model.predict(&one_hot(1, 2)).unwrap(), 0);
    }

    #[test]
    fn test_train_rejects_bad_input() {
        let zero_batch = TrainingParams { epochs: 1, batch_size: 0, learning_rate: 1.0 };
        assert!(LinearModel::train(&[(vec![1.0], 0)], 2, 1, &zero_batch).is_err());
        assert!(LinearModel::train(&[(vec![1.0], 5)], 2, 1, &TrainingParams::default()).is_err());
        assert!(LinearModel::train(&[(vec![1.0, 0.0], 0)], 2, 1, &TrainingParams::default()).is_err());
    }

    #[test]
    fn test_file_round_trip_and_shape_checks() {
        let samples: Vec<(Vec<f32>, usize)> = (0..3).map(|i| (one_hot(i, 4), i)).collect();
        let params = TrainingParams { epochs: 5, ..TrainingParams::default() };
        let (model, _) = LinearModel::train(&samples, 3, 4, &params).unwrap();

        let reloaded = LinearModel::from_file(model.to_file().unwrap()).unwrap();
        for (embedding, _) in &samples {
            assert_eq!(model.logits(embedding).unwrap(), reloaded.logits(embedding).unwrap());
        }
        assert!(reloaded.logits(&[1.0]).is_err());

        let mut broken = model.to_file().unwrap();
        broken.weights[1].pop();
        assert!(LinearModel::from_file(broken).is_err());
    }
}
