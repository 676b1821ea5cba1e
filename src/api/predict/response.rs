// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fruit prediction response types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::vision::PredictionResult;

/// Response from POST /predict/fruit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Name of the uploaded file as sent by the client
    pub filename: String,
    /// Predicted label
    pub prediction: String,
    /// Probability of the predicted label (0.0-1.0)
    pub confidence: f32,
    /// Probability for every configured label
    pub all_predictions: BTreeMap<String, f32>,
}

impl PredictResponse {
    pub fn new(filename: String, result: PredictionResult) -> Self {
        Self {
            filename,
            prediction: result.label,
            confidence: result.confidence,
            all_predictions: result.scores,
        }
    }
}
