//! Parameter learning options: engine settings plus conjugate priors.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::inference::InferenceConfig;
use crate::validate::ValidationResult;

/// Hyperparameters of the priors placed on every learned parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterPriors {
    /// Symmetric Dirichlet concentration for each conditional probability row.
    #[serde(default = "default_dirichlet_concentration")]
    pub dirichlet_concentration: f64,

    /// Normal prior mean for intercepts and regression coefficients.
    #[serde(default)]
    pub normal_mean: f64,

    /// Normal prior variance for intercepts and regression coefficients.
    #[serde(default = "default_normal_variance")]
    pub normal_variance: f64,

    /// Gamma prior shape for Gaussian precisions.
    #[serde(default = "default_gamma_shape")]
    pub gamma_shape: f64,

    /// Gamma prior rate for Gaussian precisions.
    #[serde(default = "default_gamma_rate")]
    pub gamma_rate: f64,
}

fn default_dirichlet_concentration() -> f64 {
    1.0
}

fn default_normal_variance() -> f64 {
    1e10
}

fn default_gamma_shape() -> f64 {
    1.0
}

fn default_gamma_rate() -> f64 {
    1.0
}

impl Default for ParameterPriors {
    fn default() -> Self {
        Self {
            dirichlet_concentration: default_dirichlet_concentration(),
            normal_mean: 0.0,
            normal_variance: default_normal_variance(),
            gamma_shape: default_gamma_shape(),
            gamma_rate: default_gamma_rate(),
        }
    }
}

/// Learning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LearningConfig {
    pub inference: InferenceConfig,

    #[serde(default)]
    pub priors: ParameterPriors,
}

impl LearningConfig {
    pub fn new(inference: InferenceConfig) -> Self {
        Self {
            inference,
            priors: ParameterPriors::default(),
        }
    }

    pub fn with_priors(mut self, priors: ParameterPriors) -> Self {
        self.priors = priors;
        self
    }

    /// Load from a `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        crate::read_config_file(path)
    }

    pub fn from_toml_str(content: &str) -> ValidationResult<Self> {
        crate::parse_toml(content)
    }

    pub fn from_json_str(content: &str) -> ValidationResult<Self> {
        crate::parse_json(content)
    }
}
