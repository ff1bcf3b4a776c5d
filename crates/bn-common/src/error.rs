//! Error types for the Bayesian network toolkit.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - A programming-error flag separating misuse from data problems
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 10,
//!   "category": "structure",
//!   "message": "gaussian variable X cannot be a parent of multinomial variable A",
//!   "programming_error": true,
//!   "context": { "child": "A", "parent": "X" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for toolkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Variable registry and DAG structure errors.
    Structure,
    /// Conditional family / exponential-family conversion errors.
    Family,
    /// VMP engine state and numerical errors.
    Inference,
    /// Configuration loading and validation errors.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Structure => write!(f, "structure"),
            ErrorCategory::Family => write!(f, "family"),
            ErrorCategory::Inference => write!(f, "inference"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type.
#[derive(Error, Debug)]
pub enum Error {
    // Structure errors (10-19)
    #[error("gaussian variable {parent} cannot be a parent of multinomial variable {child}")]
    IncompatibleParent { child: String, parent: String },

    #[error("{parent} is already a parent of {child}")]
    DuplicateParent { child: String, parent: String },

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("variable {0} is already defined")]
    DuplicateVariable(String),

    #[error("invalid variable: {0}")]
    InvalidVariable(String),

    #[error("structure contains a directed cycle: {0}")]
    CyclicStructure(String),

    // Family errors (20-29)
    #[error("unsupported family for {variable}: {reason}")]
    UnsupportedFamily { variable: String, reason: String },

    #[error("invalid parameters for {variable}: {reason}")]
    InvalidParameters { variable: String, reason: String },

    // Inference errors (30-39)
    #[error("invalid engine state: {0}")]
    InferenceState(String),

    #[error("invalid evidence for {variable}: {reason}")]
    InvalidEvidence { variable: String, reason: String },

    #[error("numerical instability detected: {0}")]
    NumericalInstability(String),

    // Configuration errors (40-49)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for {field}: {message}")]
    InvalidConfigValue { field: String, message: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Structure errors
    /// - 20-29: Family errors
    /// - 30-39: Inference errors
    /// - 40-49: Configuration errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::IncompatibleParent { .. } => 10,
            Error::DuplicateParent { .. } => 11,
            Error::UnknownVariable(_) => 12,
            Error::DuplicateVariable(_) => 13,
            Error::InvalidVariable(_) => 14,
            Error::CyclicStructure(_) => 15,
            Error::UnsupportedFamily { .. } => 20,
            Error::InvalidParameters { .. } => 21,
            Error::InferenceState(_) => 30,
            Error::InvalidEvidence { .. } => 31,
            Error::NumericalInstability(_) => 32,
            Error::Config(_) => 40,
            Error::InvalidConfigValue { .. } => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::Toml(_) => 62,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::IncompatibleParent { .. }
            | Error::DuplicateParent { .. }
            | Error::UnknownVariable(_)
            | Error::DuplicateVariable(_)
            | Error::InvalidVariable(_)
            | Error::CyclicStructure(_) => ErrorCategory::Structure,

            Error::UnsupportedFamily { .. } | Error::InvalidParameters { .. } => {
                ErrorCategory::Family
            }

            Error::InferenceState(_)
            | Error::InvalidEvidence { .. }
            | Error::NumericalInstability(_) => ErrorCategory::Inference,

            Error::Config(_) | Error::InvalidConfigValue { .. } => ErrorCategory::Config,

            Error::Io(_) | Error::Json(_) | Error::Toml(_) => ErrorCategory::Io,
        }
    }

    /// Whether this error signals misuse of the API rather than bad data.
    ///
    /// Structural, unsupported-family and engine-state errors are raised
    /// eagerly at the offending call and are never retried internally.
    pub fn is_programming_error(&self) -> bool {
        match self {
            Error::InvalidParameters { .. } => false,
            Error::InferenceState(_) => true,
            other => matches!(
                other.category(),
                ErrorCategory::Structure | ErrorCategory::Family
            ),
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::IncompatibleParent { .. } => "Incompatible Parent",
            Error::DuplicateParent { .. } => "Duplicate Parent",
            Error::UnknownVariable(_) => "Unknown Variable",
            Error::DuplicateVariable(_) => "Duplicate Variable",
            Error::InvalidVariable(_) => "Invalid Variable",
            Error::CyclicStructure(_) => "Cyclic Structure",
            Error::UnsupportedFamily { .. } => "Unsupported Family",
            Error::InvalidParameters { .. } => "Invalid Parameters",
            Error::InferenceState(_) => "Invalid Engine State",
            Error::InvalidEvidence { .. } => "Invalid Evidence",
            Error::NumericalInstability(_) => "Numerical Instability",
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfigValue { .. } => "Invalid Configuration Value",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
            Error::Toml(_) => "TOML Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    pub programming_error: bool,

    /// Additional structured context (e.g. variable names).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::IncompatibleParent { child, parent } | Error::DuplicateParent { child, parent } => {
                context.insert("child".to_string(), serde_json::json!(child));
                context.insert("parent".to_string(), serde_json::json!(parent));
            }
            Error::UnknownVariable(name) | Error::DuplicateVariable(name) => {
                context.insert("variable".to_string(), serde_json::json!(name));
            }
            Error::UnsupportedFamily { variable, .. }
            | Error::InvalidParameters { variable, .. }
            | Error::InvalidEvidence { variable, .. } => {
                context.insert("variable".to_string(), serde_json::json!(variable));
            }
            Error::InvalidConfigValue { field, .. } => {
                context.insert("field".to_string(), serde_json::json!(field));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            programming_error: err.is_programming_error(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}
