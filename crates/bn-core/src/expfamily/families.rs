//! Variational families of the nodes.
//!
//! Every node's approximate posterior q is an exponential-family member
//! stored as a natural-parameter vector. The family converts that vector to
//! expected sufficient statistics ("moments"), which is all neighbours ever
//! read:
//!
//! | family          | sufficient statistics | moments            |
//! |-----------------|-----------------------|--------------------|
//! | Categorical(K)  | one-hot indicator     | probabilities      |
//! | Gaussian        | (x, x²)               | (E[x], E[x²])      |
//! | Dirichlet(K)    | ln θ                  | E[ln θ]            |
//! | Gamma           | (ln τ, τ)             | (E[ln τ], E[τ])    |

use bn_math::{categorical, DirichletParams, GammaParams, NormalParams};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Family {
    Categorical { states: usize },
    Gaussian,
    Dirichlet { categories: usize },
    Gamma,
}

impl Family {
    /// Length of the natural-parameter and moment vectors.
    pub fn dimension(self) -> usize {
        match self {
            Family::Categorical { states } => states,
            Family::Gaussian | Family::Gamma => 2,
            Family::Dirichlet { categories } => categories,
        }
    }

    /// Whether the natural parameters describe a normalisable distribution.
    pub fn is_proper(self, natural: &[f64]) -> bool {
        if natural.len() != self.dimension() || natural.iter().any(|v| !v.is_finite()) {
            return false;
        }
        match self {
            Family::Categorical { .. } => true,
            Family::Gaussian => natural[1] < 0.0,
            Family::Dirichlet { .. } => natural.iter().all(|n| *n > -1.0),
            Family::Gamma => natural[0] > -1.0 && natural[1] < 0.0,
        }
    }

    /// Expected sufficient statistics, or `None` for improper parameters.
    pub fn moments(self, natural: &[f64]) -> Option<Vec<f64>> {
        if !self.is_proper(natural) {
            return None;
        }
        match self {
            Family::Categorical { .. } => Some(categorical::moments(natural)),
            Family::Gaussian => Some(normal(natural)?.moments().to_vec()),
            Family::Dirichlet { .. } => Some(DirichletParams::from_natural(natural)?.expected_log()),
            Family::Gamma => Some(gamma(natural)?.moments().to_vec()),
        }
    }

    /// Log-normaliser A(η); NaN when improper.
    pub fn log_normalizer(self, natural: &[f64]) -> f64 {
        if !self.is_proper(natural) {
            return f64::NAN;
        }
        match self {
            Family::Categorical { .. } => categorical::log_normalizer(natural),
            Family::Gaussian => normal(natural).map_or(f64::NAN, |p| p.log_normalizer()),
            Family::Dirichlet { .. } => {
                DirichletParams::from_natural(natural).map_or(f64::NAN, |p| p.log_normalizer())
            }
            Family::Gamma => gamma(natural).map_or(f64::NAN, |p| p.log_normalizer()),
        }
    }

    /// Entropy of q; NaN when improper.
    pub fn entropy(self, natural: &[f64]) -> f64 {
        if !self.is_proper(natural) {
            return f64::NAN;
        }
        match self {
            Family::Categorical { .. } => categorical::entropy(&categorical::moments(natural)),
            Family::Gaussian => normal(natural).map_or(f64::NAN, |p| p.entropy()),
            Family::Dirichlet { .. } => {
                DirichletParams::from_natural(natural).map_or(f64::NAN, |p| p.entropy())
            }
            Family::Gamma => gamma(natural).map_or(f64::NAN, |p| p.entropy()),
        }
    }

    /// Moments of a point mass at an observed value.
    pub fn observed_moments(self, value: Value) -> Option<Vec<f64>> {
        match (self, value) {
            (Family::Categorical { states }, Value::State(s)) if s < states => {
                Some(categorical::indicator(states, s))
            }
            (Family::Gaussian, Value::Real(x)) if x.is_finite() => Some(vec![x, x * x]),
            _ => None,
        }
    }

    /// Natural parameters that make every state equally likely, or a
    /// unit normal for the Gaussian family. Only used for observed nodes.
    pub(crate) fn placeholder(self) -> Vec<f64> {
        match self {
            Family::Categorical { states } => vec![0.0; states],
            Family::Gaussian => vec![0.0, -0.5],
            Family::Dirichlet { categories } => vec![0.0; categories],
            Family::Gamma => vec![0.0, -1.0],
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Categorical { states } => write!(f, "categorical({})", states),
            Family::Gaussian => write!(f, "gaussian"),
            Family::Dirichlet { categories } => write!(f, "dirichlet({})", categories),
            Family::Gamma => write!(f, "gamma"),
        }
    }
}

fn pair(natural: &[f64]) -> Option<[f64; 2]> {
    <[f64; 2]>::try_from(natural).ok()
}

fn normal(natural: &[f64]) -> Option<NormalParams> {
    NormalParams::from_natural(pair(natural)?)
}

fn gamma(natural: &[f64]) -> Option<GammaParams> {
    GammaParams::from_natural(pair(natural)?)
}
