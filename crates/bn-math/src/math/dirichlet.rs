//! Dirichlet distribution over categorical parameter vectors.
//!
//! Used as the conjugate prior/posterior for the rows of multinomial
//! conditional probability tables:
//! - Prior: `θ = (θ_1..θ_K) ~ Dirichlet(α_1..α_K)`
//! - Sufficient statistics: `t(θ) = ln θ`
//! - Natural parameters: `η = α - 1`
//! - Expected sufficient statistics: `E[ln θ_k] = ψ(α_k) - ψ(α_0)`
//!
//! Counts observed through multinomial children enter as additive
//! contributions to the natural parameters, which makes the usual
//! conjugate update `α + η·n` a special case of message combination.

use super::stable::{digamma, log_gamma};
use serde::{Deserialize, Serialize};

/// Concentration vector `α` of a Dirichlet distribution. Every entry is
/// finite and positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirichletParams {
    pub alpha: Vec<f64>,
}

impl DirichletParams {
    pub fn new(alpha: Vec<f64>) -> Option<Self> {
        let valid = !alpha.is_empty() && alpha.iter().all(|a| a.is_finite() && *a > 0.0);
        valid.then_some(Self { alpha })
    }

    /// `k` categories sharing one concentration.
    pub fn symmetric(k: usize, concentration: f64) -> Option<Self> {
        Self::new(vec![concentration; k])
    }

    /// `Dir(1, .., 1)`, the flat prior over the simplex.
    pub fn uniform(k: usize) -> Option<Self> {
        Self::symmetric(k, 1.0)
    }

    /// Recover parameters from natural parameters `η = α - 1`.
    pub fn from_natural(natural: &[f64]) -> Option<Self> {
        Self::new(natural.iter().map(|n| n + 1.0).collect())
    }

    pub fn natural(&self) -> Vec<f64> {
        self.alpha.iter().map(|a| a - 1.0).collect()
    }

    pub fn k(&self) -> usize {
        self.alpha.len()
    }

    /// `α_0 = Σ α_k`
    pub fn concentration(&self) -> f64 {
        self.alpha.iter().sum()
    }

    /// `E[θ_k] = α_k / α_0`, the point estimate reported for a learned CPT row.
    pub fn mean(&self) -> Vec<f64> {
        let total = self.concentration();
        self.alpha.iter().map(|a| a / total).collect()
    }

    /// `E[ln θ_k] = ψ(α_k) - ψ(α_0)`, the moment vector of a Dirichlet node.
    pub fn expected_log(&self) -> Vec<f64> {
        let psi_total = digamma(self.concentration());
        self.alpha.iter().map(|&a| digamma(a) - psi_total).collect()
    }

    /// `A(η) = ln B(α)`
    pub fn log_normalizer(&self) -> f64 {
        log_multivariate_beta(&self.alpha)
    }

    /// `H = ln B(α) + (α_0 - K) ψ(α_0) - Σ (α_k - 1) ψ(α_k)`
    pub fn entropy(&self) -> f64 {
        let total = self.concentration();
        let k = self.k() as f64;
        let tail: f64 = self.alpha.iter().map(|&a| (a - 1.0) * digamma(a)).sum();
        self.log_normalizer() + (total - k) * digamma(total) - tail
    }
}

/// Conjugate update `α + n` from fully observed category counts.
///
/// This is what message passing converges to for a CPT row whose child and
/// parents are all observed; learning tests use it as the exact reference.
pub fn posterior_params(prior: &DirichletParams, counts: &[f64]) -> Option<DirichletParams> {
    if counts.len() != prior.k() || counts.iter().any(|c| !(*c >= 0.0)) {
        return None;
    }
    DirichletParams::new(prior.alpha.iter().zip(counts).map(|(a, n)| a + n).collect())
}

/// `ln B(α) = Σ ln Γ(α_k) - ln Γ(Σ α_k)`; NaN for an empty or non-positive `α`.
pub fn log_multivariate_beta(alpha: &[f64]) -> f64 {
    if alpha.is_empty() || alpha.iter().any(|a| !(*a > 0.0)) {
        return f64::NAN;
    }
    let total: f64 = alpha.iter().sum();
    alpha.iter().map(|&a| log_gamma(a)).sum::<f64>() - log_gamma(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::stable::log_beta;

    fn close(a: &[f64], b: &[f64], tol: f64) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tol)
    }

    #[test]
    fn rejects_degenerate_concentrations() {
        assert!(DirichletParams::new(vec![]).is_none());
        assert!(DirichletParams::new(vec![0.0, 1.0]).is_none());
        assert!(DirichletParams::new(vec![f64::NAN, 1.0]).is_none());
        assert!(DirichletParams::new(vec![f64::INFINITY, 1.0]).is_none());
        assert!(DirichletParams::symmetric(0, 1.0).is_none());
        assert_eq!(DirichletParams::symmetric(4, 0.5).unwrap().concentration(), 2.0);
    }

    #[test]
    fn mean_is_normalised_alpha() {
        let p = DirichletParams::new(vec![2.0, 3.0, 5.0]).unwrap();
        assert!(close(&p.mean(), &[0.2, 0.3, 0.5], 1e-12));
    }

    #[test]
    fn natural_roundtrip() {
        let p = DirichletParams::new(vec![0.5, 4.0]).unwrap();
        let back = DirichletParams::from_natural(&p.natural()).unwrap();
        assert!(close(&back.alpha, &p.alpha, 1e-12));
        assert!(DirichletParams::from_natural(&[-1.0, 0.0]).is_none());
    }

    #[test]
    fn expected_log_of_flat_pair() {
        // Dir(1,1) = Beta(1,1): E[ln θ] = ψ(1) - ψ(2) = -1
        let p = DirichletParams::uniform(2).unwrap();
        assert!(close(&p.expected_log(), &[-1.0, -1.0], 1e-12));
    }

    #[test]
    fn expected_log_concentrates_on_log_mean() {
        let p = DirichletParams::new(vec![2000.0, 8000.0]).unwrap();
        assert!(close(&p.expected_log(), &[0.2f64.ln(), 0.8f64.ln()], 1e-3));
    }

    #[test]
    fn two_category_normaliser_is_log_beta() {
        let p = DirichletParams::new(vec![2.0, 3.0]).unwrap();
        assert!((p.log_normalizer() - log_beta(2.0, 3.0)).abs() < 1e-10);
    }

    #[test]
    fn flat_entropy_is_minus_log_density() {
        // Dir(1,1,1) is uniform on the simplex with density Γ(3) = 2.
        let p = DirichletParams::uniform(3).unwrap();
        assert!((p.entropy() + 2.0f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn entropy_satisfies_exponential_family_identity() {
        // H = A(η) - η·E[t]
        let p = DirichletParams::new(vec![0.7, 2.5, 4.0]).unwrap();
        let dot: f64 = p.natural().iter().zip(p.expected_log()).map(|(n, t)| n * t).sum();
        assert!((p.entropy() - (p.log_normalizer() - dot)).abs() < 1e-10);
    }

    #[test]
    fn counts_add_to_alpha() {
        let prior = DirichletParams::uniform(3).unwrap();
        let post = posterior_params(&prior, &[5.0, 3.0, 2.0]).unwrap();
        assert!(close(&post.alpha, &[6.0, 4.0, 3.0], 1e-12));
        assert!(posterior_params(&prior, &[1.0, 2.0]).is_none());
        assert!(posterior_params(&prior, &[-1.0, 2.0, 3.0]).is_none());
        assert!(posterior_params(&prior, &[f64::NAN, 2.0, 3.0]).is_none());
    }

    #[test]
    fn multivariate_beta_edge_cases() {
        assert!(log_multivariate_beta(&[]).is_nan());
        assert!(log_multivariate_beta(&[1.0, 0.0]).is_nan());
        assert!(log_multivariate_beta(&[1.0, 1.0]).abs() < 1e-12);
    }
}
