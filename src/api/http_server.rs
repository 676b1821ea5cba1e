// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::health_handler;
use super::predict::predict_fruit_handler;
use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::InferencePipeline;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    /// Classifier pipeline, fixed once the model has been loaded
    pub inference_pipeline: Option<Arc<InferencePipeline>>,
}

impl AppState {
    pub fn new(pipeline: Arc<InferencePipeline>) -> Self {
        Self {
            inference_pipeline: Some(pipeline),
        }
    }

    /// State with no classifier installed
    pub fn new_for_test() -> Self {
        Self {
            inference_pipeline: None,
        }
    }

    pub fn pipeline(&self) -> Option<Arc<InferencePipeline>> {
        self.inference_pipeline.clone()
    }
}

pub fn create_app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        // Health check
        .route("/", get(health_handler))
        // Classification endpoint
        .route("/predict/fruit", post(predict_fruit_handler))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Router with the default upload limit
pub fn create_default_app(state: AppState) -> Router {
    create_app(state, MAX_IMAGE_SIZE)
}

pub async fn start_server(state: AppState, addr: SocketAddr, max_upload_bytes: usize) -> Result<()> {
    let app = create_app(state, max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("API server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
