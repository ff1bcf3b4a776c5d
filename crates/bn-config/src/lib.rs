//! Configuration loading and validation for inference and learning.
//!
//! This crate provides:
//! - Typed Rust structs for engine and learning options
//! - Config resolution (explicit → env → XDG → builtin)
//! - Semantic validation
//! - Config snapshots for run reports

pub mod inference;
pub mod learning;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use inference::{InferenceConfig, Initialization, UpdateSchedule};
pub use learning::{LearningConfig, ParameterPriors};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_inference, validate_learning, ValidationError, ValidationResult};

use serde::de::DeserializeOwned;
use std::path::Path;

/// Resolve, load and validate the engine configuration.
///
/// Returns `Ok(None)` when no configuration file is found; the iteration
/// cap has no built-in default, so the caller must then supply one.
pub fn load_inference_config(
    explicit: Option<&Path>,
) -> ValidationResult<Option<(InferenceConfig, ConfigSnapshot)>> {
    let paths = resolve_config(explicit);
    let Some(path) = paths.config.as_deref() else {
        return Ok(None);
    };
    let config = InferenceConfig::from_file(path)?;
    validate_inference(&config)?;
    let snapshot = ConfigSnapshot::capture(&config, &paths);
    Ok(Some((config, snapshot)))
}

pub(crate) fn read_config_file<T: DeserializeOwned>(path: &Path) -> ValidationResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json(&content),
        Some("toml") => parse_toml(&content),
        other => Err(ValidationError::ParseError(format!(
            "Unsupported config extension {:?} for {}",
            other.unwrap_or(""),
            path.display()
        ))),
    }
}

pub(crate) fn parse_toml<T: DeserializeOwned>(content: &str) -> ValidationResult<T> {
    toml::from_str(content).map_err(|e| classify_parse_error(format!("Invalid TOML: {}", e)))
}

pub(crate) fn parse_json<T: DeserializeOwned>(content: &str) -> ValidationResult<T> {
    serde_json::from_str(content).map_err(|e| classify_parse_error(format!("Invalid JSON: {}", e)))
}

fn classify_parse_error(message: String) -> ValidationError {
    if message.contains("missing field") {
        ValidationError::MissingField(message)
    } else {
        ValidationError::ParseError(message)
    }
}
