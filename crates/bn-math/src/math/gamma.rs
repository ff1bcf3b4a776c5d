//! Gamma distribution over precisions.
//!
//! # Parameterization
//!
//! Uses **rate parameterization**: `Gamma(α, β)` where:
//! - `α` = shape parameter (α > 0)
//! - `β` = rate parameter (β > 0)
//!
//! The density is: `f(τ) = β^α / Γ(α) * τ^(α-1) * e^(-βτ)`
//!
//! In exponential-family form the sufficient statistics are `(ln τ, τ)`,
//! the natural parameters are `(α - 1, -β)` and the expected sufficient
//! statistics are `(ψ(α) - ln β, α/β)`.

use super::stable::{digamma, log_gamma};
use serde::{Deserialize, Serialize};

/// Parameters for a Gamma distribution in rate form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaParams {
    /// Shape α (> 0)
    pub shape: f64,
    /// Rate β (> 0)
    pub rate: f64,
}

impl GammaParams {
    /// Create new Gamma parameters with validation.
    ///
    /// Returns None unless both parameters are finite and positive.
    pub fn new(shape: f64, rate: f64) -> Option<Self> {
        if !shape.is_finite() || !rate.is_finite() || shape <= 0.0 || rate <= 0.0 {
            return None;
        }
        Some(Self { shape, rate })
    }

    /// Recover parameters from natural parameters `(α - 1, -β)`.
    pub fn from_natural(natural: [f64; 2]) -> Option<Self> {
        Self::new(natural[0] + 1.0, -natural[1])
    }

    /// Natural parameters `(α - 1, -β)`.
    pub fn natural(&self) -> [f64; 2] {
        [self.shape - 1.0, -self.rate]
    }

    /// E[τ] = α / β.
    pub fn mean(&self) -> f64 {
        self.shape / self.rate
    }

    /// Var[τ] = α / β².
    pub fn variance(&self) -> f64 {
        self.shape / (self.rate * self.rate)
    }

    /// E[ln τ] = ψ(α) - ln β.
    pub fn expected_log(&self) -> f64 {
        digamma(self.shape) - self.rate.ln()
    }

    /// Expected sufficient statistics `(E[ln τ], E[τ])`.
    pub fn moments(&self) -> [f64; 2] {
        [self.expected_log(), self.mean()]
    }

    /// Log-normalizer A(η) = ln Γ(α) - α ln β.
    pub fn log_normalizer(&self) -> f64 {
        log_gamma(self.shape) - self.shape * self.rate.ln()
    }

    /// Differential entropy: α - ln β + ln Γ(α) + (1 - α) ψ(α).
    pub fn entropy(&self) -> f64 {
        self.shape - self.rate.ln() + log_gamma(self.shape) + (1.0 - self.shape) * digamma(self.shape)
    }

    /// E_q[log Gamma(τ | self)] given `(E_q[ln τ], E_q[τ])`.
    pub fn expected_log_density(&self, moments: [f64; 2]) -> f64 {
        let eta = self.natural();
        eta[0] * moments[0] + eta[1] * moments[1] - self.log_normalizer()
    }
}

/// Log of the Gamma distribution PDF at t.
///
/// # Arguments
/// * `t` - The value at which to evaluate (t >= 0)
/// * `alpha` - Shape parameter (α > 0)
/// * `beta` - Rate parameter (β > 0)
pub fn gamma_log_pdf(t: f64, alpha: f64, beta: f64) -> f64 {
    if t.is_nan() || alpha.is_nan() || beta.is_nan() {
        return f64::NAN;
    }
    if alpha <= 0.0 || beta <= 0.0 {
        return f64::NAN;
    }
    if t < 0.0 {
        return f64::NEG_INFINITY;
    }

    if t == 0.0 {
        if alpha < 1.0 {
            return f64::INFINITY;
        } else if alpha == 1.0 {
            // Exponential case: f(0) = β
            return beta.ln();
        } else {
            return f64::NEG_INFINITY;
        }
    }

    alpha * beta.ln() - log_gamma(alpha) + (alpha - 1.0) * t.ln() - beta * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() && b.is_nan() {
            return true;
        }
        if a.is_infinite() && b.is_infinite() {
            return a.signum() == b.signum();
        }
        (a - b).abs() <= tol
    }

    // =======================================================================
    // GammaParams
    // =======================================================================

    #[test]
    fn new_rejects_invalid() {
        assert!(GammaParams::new(0.0, 1.0).is_none());
        assert!(GammaParams::new(1.0, -1.0).is_none());
        assert!(GammaParams::new(f64::NAN, 1.0).is_none());
        assert!(GammaParams::new(f64::INFINITY, 1.0).is_none());
        assert!(GammaParams::new(2.0, 3.0).is_some());
    }

    #[test]
    fn natural_roundtrip() {
        let g = GammaParams::new(3.5, 0.25).unwrap();
        let back = GammaParams::from_natural(g.natural()).unwrap();
        assert!(approx_eq(back.shape, 3.5, 1e-12));
        assert!(approx_eq(back.rate, 0.25, 1e-12));
        // positive second natural parameter is not normalizable
        assert!(GammaParams::from_natural([0.0, 1.0]).is_none());
    }

    #[test]
    fn moments_of_exponential() {
        // Gamma(1, 1): E[τ] = 1, E[ln τ] = ψ(1) = -γ
        let g = GammaParams::new(1.0, 1.0).unwrap();
        let m = g.moments();
        assert!(approx_eq(m[0], -0.577_215_664_901_532_9, 1e-12));
        assert!(approx_eq(m[1], 1.0, 1e-12));
        assert!(approx_eq(g.variance(), 1.0, 1e-12));
    }

    #[test]
    fn entropy_of_exponential() {
        // Exponential(λ) has entropy 1 - ln λ.
        let g = GammaParams::new(1.0, 4.0).unwrap();
        assert!(approx_eq(g.entropy(), 1.0 - 4.0f64.ln(), 1e-12));
    }

    #[test]
    fn entropy_matches_normalizer_identity() {
        let g = GammaParams::new(2.7, 1.3).unwrap();
        let eta = g.natural();
        let m = g.moments();
        let dot = eta[0] * m[0] + eta[1] * m[1];
        assert!(approx_eq(g.entropy(), g.log_normalizer() - dot, 1e-10));
        assert!(approx_eq(g.expected_log_density(m), -g.entropy(), 1e-10));
    }

    // =======================================================================
    // gamma_log_pdf
    // =======================================================================

    #[test]
    fn log_pdf_exponential_case() {
        assert!(approx_eq(gamma_log_pdf(2.0, 1.0, 0.5), 0.5f64.ln() - 1.0, 1e-12));
        assert!(approx_eq(gamma_log_pdf(0.0, 1.0, 2.0), 2.0f64.ln(), 1e-12));
    }

    #[test]
    fn log_pdf_boundaries() {
        assert!(gamma_log_pdf(1.0, -1.0, 1.0).is_nan());
        assert_eq!(gamma_log_pdf(-1.0, 2.0, 1.0), f64::NEG_INFINITY);
        assert_eq!(gamma_log_pdf(0.0, 0.5, 1.0), f64::INFINITY);
        assert_eq!(gamma_log_pdf(0.0, 2.0, 1.0), f64::NEG_INFINITY);
    }
}
