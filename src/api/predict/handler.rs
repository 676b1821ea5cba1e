// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fruit prediction endpoint handler

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    Json,
};
use axum_extra::extract::multipart::{Field, Multipart, MultipartError, MultipartRejection};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::response::PredictResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

pub const NOT_AN_IMAGE_DETAIL: &str = "File must be an image.";
pub const MODEL_NOT_LOADED_DETAIL: &str = "Model not loaded";
pub const FILE_TOO_LARGE_DETAIL: &str = "File too large";

/// Form field the web clients send the photo in
const FILE_FIELD: &str = "file";

/// A file part pulled out of the multipart body
#[derive(Debug)]
struct Upload {
    filename: String,
    content_type: Option<String>,
    bytes: Bytes,
}

/// True if the declared content type is an `image/*` type
pub fn is_image_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.starts_with("image/"))
        .unwrap_or(false)
}

/// POST /predict/fruit - Classify an uploaded fruit photo
///
/// Accepts a multipart form carrying the photo in the `file` field. Forms
/// without a `file` field fall back to the first part with a filename.
///
/// # Response
/// - `filename`: Uploaded file name
/// - `prediction`: Predicted label
/// - `confidence`: Probability of the predicted label
/// - `all_predictions`: Probability for every label
///
/// # Errors
/// - 400 Bad Request: Not an image content type, undecodable image, malformed form
/// - 413 Payload Too Large: Upload exceeds the body limit
/// - 503 Service Unavailable: Classifier not loaded
/// - 500 Internal Server Error: Inference failed
pub async fn predict_fruit_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        warn!("Rejected prediction request: {}", e);
        ApiError::InvalidRequest(format!("Invalid multipart request: {}", e))
    })?;

    // 1. Pull the uploaded file out of the form
    let upload = read_upload(&mut multipart).await?;
    debug!(
        "Prediction request: file={:?}, content_type={:?}, {} bytes",
        upload.filename,
        upload.content_type,
        upload.bytes.len()
    );

    // 2. Only the declared content type is checked here; bytes are checked by the decoder
    if !is_image_content_type(upload.content_type.as_deref()) {
        warn!(
            "Rejected upload {:?} with content type {:?}",
            upload.filename, upload.content_type
        );
        return Err(ApiError::InvalidRequest(NOT_AN_IMAGE_DETAIL.to_string()));
    }

    // 3. Get the classifier from state
    let pipeline = state.pipeline().ok_or_else(|| {
        warn!("Classifier not loaded");
        ApiError::ServiceUnavailable(MODEL_NOT_LOADED_DETAIL.to_string())
    })?;

    // 4. Decode, preprocess and classify off the async workers
    let started = Instant::now();
    let bytes = upload.bytes;
    let result = tokio::task::spawn_blocking(move || pipeline.predict(&bytes))
        .await
        .map_err(|e| ApiError::InternalError(format!("Inference task failed: {}", e)))?
        .map_err(|e| {
            warn!("Prediction failed for {:?}: {}", upload.filename, e);
            ApiError::from(e)
        })?;

    info!(
        "Prediction complete: {} -> {} ({:.4}), {}ms",
        upload.filename,
        result.label,
        result.confidence,
        started.elapsed().as_millis()
    );

    Ok(Json(PredictResponse::new(upload.filename, result)))
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    let mut fallback = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(FILE_FIELD) {
            return read_field(field).await;
        }
        if fallback.is_none() && field.file_name().is_some() {
            fallback = Some(read_field(field).await?);
        }
    }

    fallback.ok_or_else(|| ApiError::InvalidRequest("No file uploaded".to_string()))
}

async fn read_field(field: Field) -> Result<Upload, ApiError> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(|ct| ct.to_string());
    let bytes = field.bytes().await.map_err(multipart_error)?;

    Ok(Upload {
        filename,
        content_type,
        bytes,
    })
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Upload exceeded the body limit: {}", err);
        return ApiError::PayloadTooLarge(FILE_TOO_LARGE_DETAIL.to_string());
    }
    ApiError::InvalidRequest(format!("Invalid multipart request: {}", err))
}
