//! Univariate Normal distribution in exponential-family form.
//!
//! - Sufficient statistics: `t(x) = (x, x²)`
//! - Natural parameters: `η = (μ/σ², -1/(2σ²))`
//! - Log-normalizer: `A(η) = -η₁²/(4η₂) + ½ ln(π / -η₂)`
//!
//! The natural form is what variational messages carry; a proper
//! distribution requires `η₂ < 0`.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Parameters for a Normal distribution (mean/variance form).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalParams {
    pub mean: f64,
    /// Variance σ² (> 0)
    pub variance: f64,
}

impl NormalParams {
    /// Create new Normal parameters with validation.
    ///
    /// Returns None for a non-finite mean or a non-positive/non-finite variance.
    pub fn new(mean: f64, variance: f64) -> Option<Self> {
        if !mean.is_finite() || !variance.is_finite() || variance <= 0.0 {
            return None;
        }
        Some(Self { mean, variance })
    }

    /// Recover parameters from natural parameters.
    ///
    /// Returns None when `η₂ >= 0` (not normalizable).
    pub fn from_natural(natural: [f64; 2]) -> Option<Self> {
        let [eta1, eta2] = natural;
        if eta1.is_nan() || eta2.is_nan() || eta2 >= 0.0 {
            return None;
        }
        let variance = -0.5 / eta2;
        Self::new(eta1 * variance, variance)
    }

    /// Natural parameters `(μ/σ², -1/(2σ²))`.
    pub fn natural(&self) -> [f64; 2] {
        let precision = self.precision();
        [self.mean * precision, -0.5 * precision]
    }

    pub fn precision(&self) -> f64 {
        1.0 / self.variance
    }

    /// E[x²] = μ² + σ².
    pub fn second_moment(&self) -> f64 {
        self.mean * self.mean + self.variance
    }

    /// Expected sufficient statistics `(E[x], E[x²])`.
    pub fn moments(&self) -> [f64; 2] {
        [self.mean, self.second_moment()]
    }

    pub fn log_normalizer(&self) -> f64 {
        natural_log_normalizer(self.natural())
    }

    /// Differential entropy ½ ln(2πeσ²).
    pub fn entropy(&self) -> f64 {
        0.5 * (LN_2PI + 1.0 + self.variance.ln())
    }

    /// E_q[log N(x | self)] given `(E_q[x], E_q[x²])`.
    pub fn expected_log_density(&self, moments: [f64; 2]) -> f64 {
        let [m1, m2] = moments;
        let sq = m2 - 2.0 * self.mean * m1 + self.mean * self.mean;
        -0.5 * (LN_2PI + self.variance.ln()) - 0.5 * sq / self.variance
    }
}

/// Log-normalizer evaluated directly on natural parameters.
///
/// Returns NaN when `η₂ >= 0`.
pub fn natural_log_normalizer(natural: [f64; 2]) -> f64 {
    let [eta1, eta2] = natural;
    if eta1.is_nan() || eta2.is_nan() || eta2 >= 0.0 {
        return f64::NAN;
    }
    -eta1 * eta1 / (4.0 * eta2) + 0.5 * (PI / -eta2).ln()
}

/// Log density of N(mean, variance) at x.
pub fn normal_log_pdf(x: f64, mean: f64, variance: f64) -> f64 {
    if x.is_nan() || mean.is_nan() || variance.is_nan() || variance <= 0.0 {
        return f64::NAN;
    }
    let d = x - mean;
    -0.5 * (LN_2PI + variance.ln()) - 0.5 * d * d / variance
}
