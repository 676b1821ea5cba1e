// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class labels, index-aligned with the classifier output vector

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Labels of the bundled fruit classifier, in model output order
pub const FRUIT_LABELS: [&str; 9] = [
    "apple fruit",
    "banana fruit",
    "cherry fruit",
    "chickoo fruit",
    "grapes fruit",
    "kiwi fruit",
    "mango fruit",
    "orange fruit",
    "strawberry fruit",
];

/// Reported when the winning index has no configured label
pub const UNKNOWN_CLASS_LABEL: &str = "Unknown class";

#[derive(Debug, Error, PartialEq)]
pub enum LabelError {
    #[error("Label set is empty")]
    Empty,

    #[error("Duplicate label: {0}")]
    Duplicate(String),

    #[error("Label at index {0} is blank")]
    Blank(usize),
}

/// Ordered, immutable set of class labels
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLabels {
    labels: Vec<String>,
}

impl ClassLabels {
    pub fn new(labels: Vec<String>) -> Result<Self, LabelError> {
        if labels.is_empty() {
            return Err(LabelError::Empty);
        }

        let mut seen = HashSet::with_capacity(labels.len());
        for (idx, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(LabelError::Blank(idx));
            }
            if !seen.insert(label.as_str()) {
                return Err(LabelError::Duplicate(label.clone()));
            }
        }

        Ok(Self { labels })
    }

    /// Load labels from a JSON array of strings
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read labels file {}", path.display()))?;
        let labels: Vec<String> = serde_json::from_str(&raw)
            .with_context(|| format!("Labels file {} is not a JSON string array", path.display()))?;
        Ok(Self::new(labels)?)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Default for ClassLabels {
    fn default() -> Self {
        Self {
            labels: FRUIT_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}
