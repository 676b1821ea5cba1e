// Version information for the Fabstir Fruit Classifier

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-fruit-classifier-2026-10-19";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2026-10-19";

/// Supported features in this version
pub const FEATURES: &[&str] = &["fruit-classification", "onnx-cpu", "multipart-upload", "cors"];
