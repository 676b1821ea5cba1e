// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the fruit classifier

use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;

/// Square input size expected by the classifier
pub const IMAGE_SIZE: u32 = 224;

/// RGB channels
pub const CHANNELS: usize = 3;

/// Input tensor shape in NHWC layout: [1, 224, 224, 3]
pub const INPUT_SHAPE: [usize; 4] = [1, IMAGE_SIZE as usize, IMAGE_SIZE as usize, CHANNELS];

/// Preprocess an image for classification
///
/// Steps:
/// 1. Convert to RGB (drops alpha, expands grayscale)
/// 2. Resize to exactly IMAGE_SIZE x IMAGE_SIZE (aspect ratio is not preserved)
/// 3. Convert to NHWC tensor format [1, H, W, 3]
/// 4. Scale pixel values by 1/255 into [0, 1]
pub fn preprocess_for_classification(image: &DynamicImage) -> Array4<f32> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8())
        .resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom)
        .to_rgb8();

    Array4::from_shape_fn(INPUT_SHAPE, |(_, y, x, c)| {
        rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    })
}
