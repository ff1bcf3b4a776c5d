//! Property-based tests for bn-math numerical functions.
//!
//! Uses proptest to verify mathematical properties hold across many random inputs.

use bn_math::{
    categorical, digamma, log_beta, log_gamma, log_sum_exp, normalize_log_probs, DirichletParams,
    GammaParams, NormalParams,
};
use proptest::prelude::*;

/// Tolerance for floating point comparisons.
const TOL: f64 = 1e-10;

/// Extended tolerance for log_gamma where Lanczos approximation has some error.
const LGAMMA_TOL: f64 = 1e-8;

/// Helper to check approximate equality.
fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_infinite() && b.is_infinite() {
        return a.signum() == b.signum();
    }
    if a.is_infinite() || b.is_infinite() {
        return false;
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

// ============================================================================
// log_sum_exp properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// log_sum_exp is commutative: order doesn't matter.
    #[test]
    fn log_sum_exp_commutative(a in -100.0..100.0f64, b in -100.0..100.0f64) {
        let ab = log_sum_exp(&[a, b]);
        let ba = log_sum_exp(&[b, a]);
        prop_assert!(approx_eq(ab, ba, TOL), "lse([{},{}])={} != lse([{},{}])={}", a, b, ab, b, a, ba);
    }

    /// log_sum_exp is associative: grouping doesn't matter.
    #[test]
    fn log_sum_exp_associative(a in -50.0..50.0f64, b in -50.0..50.0f64, c in -50.0..50.0f64) {
        let direct = log_sum_exp(&[a, b, c]);
        let grouped = log_sum_exp(&[log_sum_exp(&[a, b]), c]);
        prop_assert!(approx_eq(direct, grouped, TOL));
    }

    /// log_sum_exp stays finite where naive exp-sum would overflow.
    #[test]
    fn log_sum_exp_no_overflow(a in 500.0..700.0f64, b in 500.0..700.0f64) {
        let out = log_sum_exp(&[a, b]);
        prop_assert!(out.is_finite());
        prop_assert!(out >= a.max(b));
    }
}

// ============================================================================
// softmax properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Normalized probabilities sum to one and are non-negative.
    #[test]
    fn normalize_sums_to_one(weights in prop::collection::vec(-300.0..300.0f64, 1..12)) {
        let probs = normalize_log_probs(&weights);
        let sum: f64 = probs.iter().sum();
        prop_assert!(approx_eq(sum, 1.0, 1e-9));
        prop_assert!(probs.iter().all(|p| *p >= 0.0));
    }

    /// Categorical entropy is bounded by ln K.
    #[test]
    fn categorical_entropy_bounded(weights in prop::collection::vec(-20.0..20.0f64, 1..10)) {
        let probs = categorical::moments(&weights);
        let h = categorical::entropy(&probs);
        prop_assert!(h >= -1e-12);
        prop_assert!(h <= (weights.len() as f64).ln() + 1e-9);
    }
}

// ============================================================================
// log_gamma / log_beta properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Recurrence: log Γ(z+1) = log Γ(z) + log z.
    #[test]
    fn log_gamma_recurrence(z in 0.5..100.0f64) {
        let lhs = log_gamma(z + 1.0);
        let rhs = log_gamma(z) + z.ln();
        prop_assert!(approx_eq(lhs, rhs, LGAMMA_TOL), "z={} lhs={} rhs={}", z, lhs, rhs);
    }

    /// log B(a, b) is symmetric.
    #[test]
    fn log_beta_symmetric(a in 0.1..50.0f64, b in 0.1..50.0f64) {
        prop_assert!(approx_eq(log_beta(a, b), log_beta(b, a), TOL));
    }
}

// ============================================================================
// digamma properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Recurrence: ψ(x+1) = ψ(x) + 1/x.
    #[test]
    fn digamma_recurrence(x in 0.01..200.0f64) {
        let lhs = digamma(x + 1.0);
        let rhs = digamma(x) + 1.0 / x;
        prop_assert!(approx_eq(lhs, rhs, 1e-9), "x={} lhs={} rhs={}", x, lhs, rhs);
    }

    /// Digamma is strictly increasing on the positive axis.
    #[test]
    fn digamma_monotone(x in 0.01..100.0f64, dx in 0.01..10.0f64) {
        prop_assert!(digamma(x + dx) > digamma(x));
    }

    /// Digamma matches a central difference of log Γ.
    #[test]
    fn digamma_is_derivative_of_log_gamma(x in 1.0..50.0f64) {
        let h = 1e-5;
        let numeric = (log_gamma(x + h) - log_gamma(x - h)) / (2.0 * h);
        prop_assert!(approx_eq(digamma(x), numeric, 1e-5));
    }
}

// ============================================================================
// Exponential-family identities
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Dirichlet E[ln θ] is never above ln of the mean (Jensen).
    #[test]
    fn dirichlet_expected_log_below_log_mean(alpha in prop::collection::vec(0.1..50.0f64, 2..6)) {
        let p = DirichletParams::new(alpha).unwrap();
        let mean = p.mean();
        for (el, m) in p.expected_log().iter().zip(mean) {
            prop_assert!(*el <= m.ln() + 1e-12);
        }
    }

    /// Dirichlet entropy = A(η) - ηᵀE[t].
    #[test]
    fn dirichlet_entropy_identity(alpha in prop::collection::vec(0.2..30.0f64, 2..6)) {
        let p = DirichletParams::new(alpha).unwrap();
        let dot: f64 = p.natural().iter().zip(p.expected_log()).map(|(n, t)| n * t).sum();
        prop_assert!(approx_eq(p.entropy(), p.log_normalizer() - dot, 1e-8));
    }

    /// Gamma natural parameters convert back to the same shape and rate.
    #[test]
    fn gamma_natural_roundtrip(shape in 0.05..100.0f64, rate in 0.05..100.0f64) {
        let g = GammaParams::new(shape, rate).unwrap();
        let back = GammaParams::from_natural(g.natural()).unwrap();
        prop_assert!(approx_eq(back.shape, shape, TOL));
        prop_assert!(approx_eq(back.rate, rate, TOL));
    }

    /// Normal entropy does not depend on the mean.
    #[test]
    fn normal_entropy_shift_invariant(mean in -1e3..1e3f64, variance in 1e-3..1e3f64) {
        let a = NormalParams::new(mean, variance).unwrap();
        let b = NormalParams::new(0.0, variance).unwrap();
        prop_assert!(approx_eq(a.entropy(), b.entropy(), TOL));
    }

    /// Cross-entropy of a Normal with itself is minimal at its own moments.
    #[test]
    fn normal_expected_log_density_peaks_at_self(mean in -10.0..10.0f64, variance in 0.1..10.0f64, shift in 0.1..5.0f64) {
        let p = NormalParams::new(mean, variance).unwrap();
        let q = NormalParams::new(mean + shift, variance).unwrap();
        prop_assert!(p.expected_log_density(p.moments()) > p.expected_log_density(q.moments()));
    }
}

// ============================================================================
// Edge cases
// ============================================================================

#[test]
fn edge_case_empty_log_sum_exp() {
    assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
}

#[test]
fn edge_case_nan_propagation() {
    assert!(log_gamma(f64::NAN).is_nan());
    assert!(digamma(f64::NAN).is_nan());
    assert!(log_sum_exp(&[1.0, f64::NAN]).is_nan());
}
