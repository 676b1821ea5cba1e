// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration (command line flags with environment fallbacks)

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::ClassLabels;

pub const DEFAULT_MODEL_PATH: &str = "./models/fruit_classifier_model.onnx";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_INTRA_THREADS: usize = 4;

/// Fabstir fruit classifier service
#[derive(Parser, Debug, Clone)]
#[command(name = "fabstir-fruit-classifier")]
#[command(version)]
#[command(about = "HTTP image classification service for fruit photos", long_about = None)]
pub struct ClassifierConfig {
    /// Path to the ONNX classifier artifact
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Optional JSON array of class labels, in model output order
    #[arg(long, env = "LABELS_PATH")]
    pub labels_path: Option<PathBuf>,

    /// Address the HTTP server binds to
    #[arg(long, env = "API_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "ONNX_INTRA_THREADS", default_value_t = DEFAULT_INTRA_THREADS)]
    pub intra_threads: usize,

    /// Maximum accepted upload size in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = MAX_IMAGE_SIZE)]
    pub max_upload_bytes: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            labels_path: None,
            listen_addr: DEFAULT_LISTEN_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8000))),
            intra_threads: DEFAULT_INTRA_THREADS,
            max_upload_bytes: MAX_IMAGE_SIZE,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.intra_threads == 0 {
            anyhow::bail!("intra_threads must be at least 1");
        }
        if self.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be positive");
        }
        Ok(())
    }

    /// Labels from `labels_path`, or the built-in fruit labels
    pub fn load_labels(&self) -> Result<ClassLabels> {
        match self.labels_path {
            Some(ref path) => ClassLabels::from_json_file(path),
            None => Ok(ClassLabels::default()),
        }
    }
}
