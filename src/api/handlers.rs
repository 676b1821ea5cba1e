// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::http_server::AppState;

pub const STATUS_READY: &str = "Fruit classifier model ready";
pub const STATUS_NOT_LOADED: &str = "Fruit classifier model not loaded";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

/// GET / - health check
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.pipeline().is_some();
    let status = if model_loaded {
        STATUS_READY
    } else {
        STATUS_NOT_LOADED
    };

    Json(HealthResponse {
        status: status.to_string(),
        model_loaded,
    })
}
