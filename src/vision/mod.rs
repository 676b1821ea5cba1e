// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based fruit classification
//!
//! This module provides:
//! - Decoding of uploaded images
//! - Preprocessing into the classifier's NHWC input tensor
//! - The ONNX classifier and the inference pipeline built on it

pub mod classifier;
pub mod image_utils;
pub mod labels;
pub mod pipeline;
pub mod preprocessing;

pub use classifier::{ClassifierModel, OnnxClassifier};
pub use image_utils::{decode_image_bytes, ImageError, ImageInfo};
pub use labels::{ClassLabels, LabelError, FRUIT_LABELS, UNKNOWN_CLASS_LABEL};
pub use pipeline::{InferencePipeline, PipelineError, PredictionResult};
pub use preprocessing::{preprocess_for_classification, IMAGE_SIZE, INPUT_SHAPE};
