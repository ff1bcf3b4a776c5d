//! Numerically stable primitives for log-domain variational math.

use std::f64::consts::PI;

const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8; // 0.5 * ln(2*pi)
const LANCZOS_G: f64 = 7.0;
#[allow(clippy::excessive_precision)] // These are published numerical constants
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// Below this argument digamma is shifted upward with the recurrence
/// ψ(x) = ψ(x + 1) - 1/x before the asymptotic series is applied.
const DIGAMMA_ASYMPTOTIC_MIN: f64 = 10.0;

/// `ln Σ exp(v)` with the maximum factored out.
///
/// Empty input or all `-inf` gives `-inf`; any NaN gives NaN.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_infinite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Softmax of unnormalised log-weights, as used to turn a categorical
/// node's natural parameters into probabilities.
///
/// Every entry is NaN when the weights cannot be normalised.
pub fn normalize_log_probs(log_weights: &[f64]) -> Vec<f64> {
    let lse = log_sum_exp(log_weights);
    if !lse.is_finite() {
        return vec![f64::NAN; log_weights.len()];
    }
    log_weights.iter().map(|w| (w - lse).exp()).collect()
}

/// Natural log with the argument clamped to the smallest positive normal
/// double, so zero probabilities map to a large finite negative number
/// instead of -inf.
pub fn ln_clamped(p: f64) -> f64 {
    if p.is_nan() {
        return f64::NAN;
    }
    p.max(f64::MIN_POSITIVE).ln()
}

/// Natural log of the Gamma function (log |Gamma(z)|).
///
/// Uses a Lanczos approximation with reflection for z < 0.5.
pub fn log_gamma(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return f64::INFINITY;
    }
    if z == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if z <= 0.0 {
        let z_round = z.round();
        if (z - z_round).abs() < 1e-15 {
            return f64::NAN;
        }
    }
    if z < 0.5 {
        let sin_pi = (PI * z).sin();
        if sin_pi == 0.0 {
            return f64::NAN;
        }
        return PI.ln() - sin_pi.abs().ln() - log_gamma(1.0 - z);
    }

    let z_minus = z - 1.0;
    let mut x = LANCZOS_COEFFS[0];
    for (i, coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        x += coeff / (z_minus + i as f64);
    }
    let t = z_minus + LANCZOS_G + 0.5;
    LOG_SQRT_2PI + (z_minus + 0.5) * t.ln() - t + x.ln()
}

/// log Beta(a, b) = log Gamma(a) + log Gamma(b) - log Gamma(a+b).
pub fn log_beta(a: f64, b: f64) -> f64 {
    log_gamma(a) + log_gamma(b) - log_gamma(a + b)
}

/// Digamma function ψ(x) = d/dx log Gamma(x).
///
/// Uses the upward recurrence until x >= 10 followed by the asymptotic
/// expansion, and the reflection formula for negative arguments.
/// Non-positive integers are poles and return NaN.
pub fn digamma(x: f64) -> f64 {
    if x.is_nan() || x == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return f64::INFINITY;
    }
    if x <= 0.0 {
        if x == x.floor() {
            return f64::NAN;
        }
        // ψ(x) = ψ(1 - x) - π cot(πx)
        return digamma(1.0 - x) - PI / (PI * x).tan();
    }

    let mut value = 0.0;
    let mut z = x;
    while z < DIGAMMA_ASYMPTOTIC_MIN {
        value -= 1.0 / z;
        z += 1.0;
    }

    let inv = 1.0 / z;
    let inv2 = inv * inv;
    // ln z - 1/(2z) - Σ B_2n / (2n z^2n)
    let series = inv2
        * (1.0 / 12.0
            - inv2
                * (1.0 / 120.0
                    - inv2 * (1.0 / 252.0 - inv2 * (1.0 / 240.0 - inv2 * (1.0 / 132.0)))));
    value + z.ln() - 0.5 * inv - series
}
