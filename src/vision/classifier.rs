// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fruit classifier model
//!
//! The trained classifier is exported to ONNX and executed with ONNX Runtime
//! on CPU. The input is a single NHWC float tensor `[1, 224, 224, 3]`, the
//! output is a probability vector with one entry per class.

use anyhow::{anyhow, Context, Result};
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::INPUT_SHAPE;

/// Forward inference: preprocessed batch in, probability vector out.
///
/// Implementations must be side-effect free from the caller's point of view
/// so a single instance can serve concurrent requests.
#[cfg_attr(test, mockall::automock)]
pub trait ClassifierModel: Send + Sync {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>>;
}

/// ONNX Runtime backed classifier
pub struct OnnxClassifier {
    /// ONNX Runtime session (running needs `&mut`, hence the mutex)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Path the model was loaded from
    model_path: PathBuf,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("input_name", &self.input_name)
            .field("model_path", &self.model_path)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load the classifier from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - The file is not a valid ONNX graph
    pub fn new<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Classifier model not found: {}", model_path.display());
        }

        info!("Loading fruit classifier from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("Failed to load classifier model from {}", model_path.display())
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| anyhow!("Classifier model declares no inputs"))?;

        if let Some(input) = session.inputs.first() {
            debug!("Classifier input {}: {:?}", input_name, input.input_type);
        }

        info!("✅ Fruit classifier loaded (CPU-only, input: {})", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            model_path: model_path.to_path_buf(),
        })
    }

    /// Run a warm-up inference on a blank image and report the output width
    pub fn output_width(&self) -> Result<usize> {
        let probe = Array4::<f32>::zeros(INPUT_SHAPE);
        let probabilities = self.predict(&probe).context("Warm-up inference failed")?;
        Ok(probabilities.len())
    }
}

impl ClassifierModel for OnnxClassifier {
    fn predict(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let input_value =
            Tensor::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Classifier session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Classifier inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        // [1, num_classes]; a bare [num_classes] vector is accepted as well
        let shape = output_tensor.shape();
        if shape.len() > 2 || (shape.len() == 2 && shape[0] != 1) {
            anyhow::bail!(
                "Unexpected classifier output shape: {:?} (expected [1, num_classes])",
                shape
            );
        }

        let probabilities: Vec<f32> = output_tensor.iter().copied().collect();
        Ok(probabilities)
    }
}
