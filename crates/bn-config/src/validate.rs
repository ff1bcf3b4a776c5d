//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::inference::InferenceConfig;
use crate::learning::{LearningConfig, ParameterPriors};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::MissingField(_) => 64,
            ValidationError::InvalidValue { .. } => 65,
        }
    }
}

/// Validate engine options semantically.
pub fn validate_inference(config: &InferenceConfig) -> ValidationResult<()> {
    validate_inference_at("", config)
}

fn validate_inference_at(prefix: &str, config: &InferenceConfig) -> ValidationResult<()> {
    if config.max_iterations == 0 {
        return Err(ValidationError::InvalidValue {
            field: format!("{}max_iterations", prefix),
            message: "Must be at least 1".to_string(),
        });
    }

    let t = config.convergence_threshold;
    if !t.is_finite() || t <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: format!("{}convergence_threshold", prefix),
            message: format!("Must be positive and finite, got {}", t),
        });
    }

    if config.max_local_iterations == Some(0) {
        return Err(ValidationError::InvalidValue {
            field: format!("{}max_local_iterations", prefix),
            message: "Must be at least 1 when set".to_string(),
        });
    }

    Ok(())
}

/// Validate learning options (engine options and priors).
pub fn validate_learning(config: &LearningConfig) -> ValidationResult<()> {
    validate_inference_at("inference.", &config.inference)?;
    validate_priors(&config.priors)
}

fn validate_priors(priors: &ParameterPriors) -> ValidationResult<()> {
    validate_positive("priors.dirichlet_concentration", priors.dirichlet_concentration)?;
    validate_positive("priors.normal_variance", priors.normal_variance)?;
    validate_positive("priors.gamma_shape", priors.gamma_shape)?;
    validate_positive("priors.gamma_rate", priors.gamma_rate)?;

    if !priors.normal_mean.is_finite() {
        return Err(ValidationError::InvalidValue {
            field: "priors.normal_mean".to_string(),
            message: format!("Must be finite, got {}", priors.normal_mean),
        });
    }

    Ok(())
}

fn validate_positive(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be positive and finite, got {}", value),
        });
    }
    Ok(())
}
