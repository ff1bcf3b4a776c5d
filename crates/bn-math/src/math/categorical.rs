//! Categorical distribution in exponential-family form.
//!
//! Sufficient statistics are the one-hot indicator vector, natural
//! parameters are unnormalized log-probabilities and the expected
//! sufficient statistics are the state probabilities themselves.

use super::stable::{log_sum_exp, normalize_log_probs};

/// Log-normalizer A(η) = log Σ_s exp(η_s).
pub fn log_normalizer(natural: &[f64]) -> f64 {
    log_sum_exp(natural)
}

/// Expected sufficient statistics (state probabilities) for natural parameters.
pub fn moments(natural: &[f64]) -> Vec<f64> {
    normalize_log_probs(natural)
}

/// Shannon entropy -Σ p ln p with the convention 0 ln 0 = 0.
pub fn entropy(probabilities: &[f64]) -> f64 {
    probabilities
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.ln())
        .sum()
}

/// Total variation distance between two probability vectors of equal length.
///
/// Returns NaN for mismatched lengths.
pub fn total_variation(p: &[f64], q: &[f64]) -> f64 {
    if p.len() != q.len() {
        return f64::NAN;
    }
    0.5 * p.iter().zip(q).map(|(a, b)| (a - b).abs()).sum::<f64>()
}

/// One-hot indicator vector for an observed state.
pub fn indicator(states: usize, state: usize) -> Vec<f64> {
    let mut out = vec![0.0; states];
    if state < states {
        out[state] = 1.0;
    }
    out
}
