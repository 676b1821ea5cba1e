// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use fabstir_fruit_classifier::{
    api::{start_server, AppState},
    version, ClassifierConfig, InferencePipeline,
};
use std::{env, sync::Arc};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ClassifierConfig::parse();

    info!("🚀 Starting Fabstir Fruit Classifier");
    info!("📦 BUILD VERSION: {}", version::VERSION);
    info!("📅 Build Date: {}", version::BUILD_DATE);

    config.validate().context("Invalid configuration")?;

    // The model is loaded exactly once; failing here stops the process before it serves traffic
    let load_config = config.clone();
    let pipeline = tokio::task::spawn_blocking(move || InferencePipeline::load(&load_config))
        .await
        .context("Model loading task panicked")?;

    let pipeline = match pipeline {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(
                "❌ Failed to load classifier model from {}: {:#}",
                config.model_path.display(),
                e
            );
            std::process::exit(1);
        }
    };

    let state = AppState::new(Arc::new(pipeline));

    start_server(state, config.listen_addr, config.max_upload_bytes).await
}
