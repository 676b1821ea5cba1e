// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Prediction endpoint tests for POST /predict/fruit
//!
//! These tests verify that the predict_fruit_handler correctly:
//! - Classifies uploaded images and shapes the response
//! - Rejects non-image content types without running inference
//! - Rejects corrupted image bytes with a decode-failure detail
//! - Handles malformed forms and a missing classifier

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
};
use fabstir_fruit_classifier::api::{create_app, create_default_app, AppState, PredictResponse};
use fabstir_fruit_classifier::vision::{ClassLabels, InferencePipeline, FRUIT_LABELS};
use image::ImageFormat;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

use crate::common::{
    encoded_image, mango_probabilities, multipart_body, multipart_content_type, multipart_form,
    pipeline_with, FixedClassifier, FormPart,
};

/// Helper: state with a fixed-output classifier installed
fn setup_state(model: Arc<FixedClassifier>) -> AppState {
    AppState::new(pipeline_with(model))
}

fn predict_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/predict/fruit")
        .header("content-type", multipart_content_type())
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

#[tokio::test]
async fn test_predict_valid_png() {
    let model = FixedClassifier::new(mango_probabilities());
    let app = create_default_app(setup_state(model.clone()));

    let image = encoded_image(ImageFormat::Png, 320, 180);
    let body = multipart_body("file", Some("mango.png"), Some("image/png"), &image);

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let prediction: PredictResponse = serde_json::from_value(json).unwrap();

    assert_eq!(prediction.filename, "mango.png");
    assert_eq!(prediction.prediction, "mango fruit");
    assert!((prediction.confidence - 0.70).abs() < 1e-6);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_predict_response_invariants() {
    let model = FixedClassifier::new(mango_probabilities());
    let app = create_default_app(setup_state(model));

    let image = encoded_image(ImageFormat::Jpeg, 64, 64);
    let body = multipart_body("file", Some("photo.jpg"), Some("image/jpeg"), &image);

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let prediction: PredictResponse = serde_json::from_value(body_json(response).await).unwrap();

    // Keys are exactly the configured labels
    let mut keys: Vec<&str> = prediction.all_predictions.keys().map(String::as_str).collect();
    let mut expected: Vec<&str> = FRUIT_LABELS.to_vec();
    keys.sort_unstable();
    expected.sort_unstable();
    assert_eq!(keys, expected);

    // prediction is the argmax of all_predictions
    let (best_label, best_score) = prediction
        .all_predictions
        .iter()
        .fold(("", f32::MIN), |best, (label, &score)| {
            if score > best.1 {
                (label.as_str(), score)
            } else {
                best
            }
        });
    assert_eq!(prediction.prediction, best_label);

    // confidence is the score of the predicted label
    assert_eq!(prediction.confidence, best_score);
    assert_eq!(
        prediction.confidence,
        prediction.all_predictions[&prediction.prediction]
    );
}

#[tokio::test]
async fn test_predict_rejects_non_image_content_type() {
    let model = FixedClassifier::new(mango_probabilities());
    let app = create_default_app(setup_state(model.clone()));

    let body = multipart_body("file", Some("notes.txt"), Some("text/plain"), b"hello fruit");

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["detail"], "File must be an image.");
    assert_eq!(model.calls(), 0, "No inference should be attempted");
}

#[tokio::test]
async fn test_predict_rejects_valid_image_with_wrong_content_type() {
    // The declared type decides, not the bytes
    let model = FixedClassifier::new(mango_probabilities());
    let app = create_default_app(setup_state(model.clone()));

    let image = encoded_image(ImageFormat::Png, 16, 16);
    let body = multipart_body("file", Some("mango.png"), Some("application/octet-stream"), &image);

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_predict_rejects_missing_content_type() {
    let model = FixedClassifier::new(mango_probabilities());
    let app = create_default_app(setup_state(model.clone()));

    let image = encoded_image(ImageFormat::Png, 16, 16);
    let body = multipart_body("file", Some("mango.png"), None, &image);

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "File must be an image.");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_predict_rejects_corrupted_image() {
    let model = FixedClassifier::new(mango_probabilities());
    let app = create_default_app(setup_state(model.clone()));

    // JPEG signature followed by garbage
    let mut corrupted = vec![0xFF, 0xD8, 0xFF, 0xE0];
    corrupted.extend_from_slice(b"this is not really a jpeg");
    let body = multipart_body("file", Some("broken.jpg"), Some("image/jpeg"), &corrupted);

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    let detail = json["detail"].as_str().unwrap();
    assert!(
        detail.starts_with("Failed to process image"),
        "Unexpected detail: {}",
        detail
    );
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_predict_rejects_random_bytes() {
    let model = FixedClassifier::new(mango_probabilities());
    let app = create_default_app(setup_state(model.clone()));

    let body = multipart_body("file", Some("x.png"), Some("image/png"), &[0x13; 128]);

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .starts_with("Failed to process image"));
}

#[tokio::test]
async fn test_predict_rejects_empty_file() {
    let model = FixedClassifier::new(mango_probabilities());
    let app = create_default_app(setup_state(model.clone()));

    let body = multipart_body("file", Some("empty.png"), Some("image/png"), &[]);

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_predict_without_file_part() {
    let app = create_default_app(setup_state(FixedClassifier::new(mango_probabilities())));

    let body = multipart_body("comment", None, None, b"just text");

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "No file uploaded");
}

#[tokio::test]
async fn test_predict_rejects_non_multipart_request() {
    let app = create_default_app(setup_state(FixedClassifier::new(mango_probabilities())));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict/fruit")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"file": "apple.png"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["detail"].is_string());
}

#[tokio::test]
async fn test_predict_uses_file_field_after_other_attachment() {
    let model = FixedClassifier::new(mango_probabilities());
    let app = create_default_app(setup_state(model.clone()));

    let image = encoded_image(ImageFormat::Png, 24, 24);
    let body = multipart_form(&[
        FormPart {
            field_name: "notes",
            filename: Some("notes.txt"),
            content_type: Some("text/plain"),
            data: b"picked on tuesday",
        },
        FormPart {
            field_name: "file",
            filename: Some("mango.png"),
            content_type: Some("image/png"),
            data: &image,
        },
    ]);

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let prediction: PredictResponse = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(prediction.filename, "mango.png");
    assert_eq!(prediction.prediction, "mango fruit");
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_predict_falls_back_to_first_named_file() {
    let model = FixedClassifier::new(mango_probabilities());
    let app = create_default_app(setup_state(model.clone()));

    let image = encoded_image(ImageFormat::Png, 24, 24);
    let body = multipart_form(&[
        FormPart {
            field_name: "comment",
            filename: None,
            content_type: None,
            data: b"just text",
        },
        FormPart {
            field_name: "upload",
            filename: Some("apple.png"),
            content_type: Some("image/png"),
            data: &image,
        },
    ]);

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let prediction: PredictResponse = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(prediction.filename, "apple.png");
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_predict_rejects_body_over_limit() {
    let model = FixedClassifier::new(mango_probabilities());
    let app = create_app(setup_state(model.clone()), 1024);

    // Past the limit plus multipart overhead
    let payload = vec![0x42; 256 * 1024];
    let body = multipart_body("file", Some("huge.png"), Some("image/png"), &payload);

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["detail"], "File too large");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_predict_without_model() {
    let app = create_default_app(AppState::new_for_test());

    let image = encoded_image(ImageFormat::Png, 32, 32);
    let body = multipart_body("file", Some("apple.png"), Some("image/png"), &image);

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["detail"], "Model not loaded");
}

#[tokio::test]
async fn test_predict_rejects_oversized_upload() {
    let model = FixedClassifier::new(mango_probabilities());
    let image = encoded_image(ImageFormat::Png, 32, 32);
    let pipeline = InferencePipeline::new(model.clone(), ClassLabels::default())
        .with_max_image_bytes(image.len() - 1);
    let app = create_app(AppState::new(Arc::new(pipeline)), image.len() - 1);

    let body = multipart_body("file", Some("apple.png"), Some("image/png"), &image);

    let response = app.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_predict_route_rejects_get() {
    let app = create_default_app(setup_state(FixedClassifier::new(mango_probabilities())));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/predict/fruit")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
