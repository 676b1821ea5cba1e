// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fruit prediction endpoint module
//!
//! Provides POST /predict/fruit for classifying an uploaded image.

pub mod handler;
pub mod response;

pub use handler::{is_image_content_type, predict_fruit_handler};
pub use response::PredictResponse;
