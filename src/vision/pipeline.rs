// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inference pipeline: uploaded bytes -> preprocessed tensor -> labeled prediction

use anyhow::{Context, Result};
use ndarray::Array4;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::classifier::{ClassifierModel, OnnxClassifier};
use super::image_utils::{decode_image_bytes, ImageError, MAX_IMAGE_SIZE};
use super::labels::{ClassLabels, UNKNOWN_CLASS_LABEL};
use super::preprocessing::{preprocess_for_classification, INPUT_SHAPE};
use crate::config::ClassifierConfig;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidInput(#[from] ImageError),

    #[error("Invalid input shape: {0:?}, expected [1, 224, 224, 3]")]
    InvalidShape(Vec<usize>),

    #[error("Inference failed: {0:#}")]
    Inference(anyhow::Error),
}

/// Outcome of classifying one image
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Label with the highest probability
    pub label: String,
    /// Probability of `label`
    pub confidence: f32,
    /// Probability for every configured label
    pub scores: BTreeMap<String, f32>,
}

/// Shared, read-only classifier plus its label set
pub struct InferencePipeline {
    model: Arc<dyn ClassifierModel>,
    labels: ClassLabels,
    max_image_bytes: usize,
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("labels", &self.labels)
            .field("max_image_bytes", &self.max_image_bytes)
            .finish_non_exhaustive()
    }
}

impl InferencePipeline {
    pub fn new(model: Arc<dyn ClassifierModel>, labels: ClassLabels) -> Self {
        Self {
            model,
            labels,
            max_image_bytes: MAX_IMAGE_SIZE,
        }
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    /// Load the ONNX classifier and labels described by `config`
    ///
    /// Runs a warm-up inference and fails if the model output width does not
    /// match the number of labels. Any error here is a startup failure.
    pub fn load(config: &ClassifierConfig) -> Result<Self> {
        let labels = config.load_labels()?;

        let model = OnnxClassifier::new(&config.model_path, config.intra_threads)?;
        let width = model
            .output_width()
            .with_context(|| format!("Failed to validate {}", config.model_path.display()))?;

        if width != labels.len() {
            anyhow::bail!(
                "Classifier outputs {} classes but {} labels are configured",
                width,
                labels.len()
            );
        }

        info!("✅ Inference pipeline ready ({} classes)", labels.len());

        Ok(Self::new(Arc::new(model), labels).with_max_image_bytes(config.max_upload_bytes))
    }

    pub fn labels(&self) -> &ClassLabels {
        &self.labels
    }

    /// Decode uploaded bytes and turn them into a `[1, 224, 224, 3]` tensor in [0, 1]
    pub fn preprocess(&self, image_bytes: &[u8]) -> Result<Array4<f32>, PipelineError> {
        let (image, info) = decode_image_bytes(image_bytes, self.max_image_bytes)?;
        debug!(
            "Decoded image: {}x{} {:?}, {} bytes",
            info.width, info.height, info.format, info.size_bytes
        );
        Ok(preprocess_for_classification(&image))
    }

    /// Run the model on a preprocessed tensor and shape the prediction
    pub fn classify(&self, input: &Array4<f32>) -> Result<PredictionResult, PipelineError> {
        if input.shape() != INPUT_SHAPE {
            return Err(PipelineError::InvalidShape(input.shape().to_vec()));
        }

        let probabilities = self.model.predict(input).map_err(PipelineError::Inference)?;

        Ok(self.shape_prediction(&probabilities))
    }

    /// `preprocess` followed by `classify`
    pub fn predict(&self, image_bytes: &[u8]) -> Result<PredictionResult, PipelineError> {
        let input = self.preprocess(image_bytes)?;
        self.classify(&input)
    }

    fn shape_prediction(&self, probabilities: &[f32]) -> PredictionResult {
        let (label, confidence) = match argmax(probabilities) {
            Some(idx) => match self.labels.get(idx) {
                Some(label) => (label.to_string(), probabilities[idx]),
                None => (UNKNOWN_CLASS_LABEL.to_string(), probabilities[idx]),
            },
            None => (UNKNOWN_CLASS_LABEL.to_string(), 0.0),
        };

        // Labels past the model output width get 0.0 so every label is present
        let scores = self
            .labels
            .iter()
            .enumerate()
            .map(|(idx, label)| {
                (label.to_string(), probabilities.get(idx).copied().unwrap_or(0.0))
            })
            .collect();

        PredictionResult {
            label,
            confidence,
            scores,
        }
    }
}

/// Index of the largest value; the first one wins ties and NaN never wins
fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f32)>, (idx, &v)| match best {
            Some((_, best_v)) if best_v >= v => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}
