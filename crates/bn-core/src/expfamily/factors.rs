//! Factors and their variational messages.
//!
//! Each node owns one factor: the conditional of its value given the nodes
//! it depends on. A factor produces three things from the current moments
//! of the nodes it touches:
//!
//! - the message to its owner, `E_{-x}[ln f]` as natural parameters of x;
//! - the message to every node it reads, the same expectation taken with
//!   respect to everything except that node;
//! - its expected log value `E_q[ln f]`, the likelihood part of the ELBO.
//!
//! Discrete parents select a row; their messages are per-state expected
//! log values with the other discrete parents marginalised. Rows of a
//! categorical factor are either fixed log-probabilities or Dirichlet
//! nodes. Gaussian rows are `x ~ N(b + Σ β_j y_j, 1/τ)` where `b`, `β_j`
//! and `τ` are fixed values or nodes, so the same factor serves as a fixed
//! conditional-linear-Gaussian, as a Normal prior and as the likelihood of
//! a learning plate.

use bn_common::NodeId;
use bn_math::dirichlet::log_multivariate_beta;
use bn_math::{ln_clamped, GammaParams};
use serde::{Deserialize, Serialize};

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Read access to the current moments of every node.
pub trait MomentSource {
    fn moments(&self, node: NodeId) -> &[f64];
}

/// A scalar parameter: fixed, or read from a node's moments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    Fixed(f64),
    Node(NodeId),
}

impl Scalar {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Scalar::Node(id) => Some(id),
            Scalar::Fixed(_) => None,
        }
    }

    /// `(E[v], E[v²])` for a Gaussian-valued parameter.
    fn gaussian_moments<S: MomentSource + ?Sized>(self, src: &S) -> (f64, f64) {
        match self {
            Scalar::Fixed(v) => (v, v * v),
            Scalar::Node(id) => {
                let m = src.moments(id);
                (m[0], m[1])
            }
        }
    }

    /// `(E[ln τ], E[τ])` for a precision.
    fn precision_moments<S: MomentSource + ?Sized>(self, src: &S) -> (f64, f64) {
        match self {
            Scalar::Fixed(t) => (t.ln(), t),
            Scalar::Node(id) => {
                let m = src.moments(id);
                (m[0], m[1])
            }
        }
    }
}

/// One row of a probability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityRow {
    /// Log-probabilities.
    Fixed(Vec<f64>),
    /// A Dirichlet node over the row.
    Node(NodeId),
}

impl ProbabilityRow {
    /// Fixed row from probabilities; zeros map to a large negative log.
    pub fn from_probabilities(probabilities: &[f64]) -> Self {
        ProbabilityRow::Fixed(probabilities.iter().map(|p| ln_clamped(*p)).collect())
    }

    fn log_probabilities<'a, S: MomentSource + ?Sized>(&'a self, src: &'a S) -> &'a [f64] {
        match self {
            ProbabilityRow::Fixed(logs) => logs,
            ProbabilityRow::Node(id) => src.moments(*id),
        }
    }
}

/// A multinomial parent selecting rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteParent {
    pub node: NodeId,
    pub states: usize,
}

/// Conditional probability table of a categorical node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalFactor {
    pub states: usize,
    pub discrete_parents: Vec<DiscreteParent>,
    pub rows: Vec<ProbabilityRow>,
}

/// Regression parameters for one configuration of the discrete parents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianRow {
    pub intercept: Scalar,
    pub coefficients: Vec<Scalar>,
    pub precision: Scalar,
}

/// Conditional-linear-Gaussian density of a Gaussian node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianFactor {
    pub discrete_parents: Vec<DiscreteParent>,
    pub continuous_parents: Vec<NodeId>,
    pub rows: Vec<GaussianRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "factor", rename_all = "snake_case")]
pub enum Factor {
    Categorical(CategoricalFactor),
    Gaussian(GaussianFactor),
    DirichletPrior { alpha: Vec<f64> },
    GammaPrior { shape: f64, rate: f64 },
}

impl Factor {
    /// Every node this factor reads besides its owner, without repeats.
    pub fn neighbors(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = Vec::new();
        let mut push = |id: NodeId| {
            if !out.contains(&id) {
                out.push(id);
            }
        };
        match self {
            Factor::Categorical(f) => {
                f.discrete_parents.iter().for_each(|p| push(p.node));
                for row in &f.rows {
                    if let ProbabilityRow::Node(id) = row {
                        push(*id);
                    }
                }
            }
            Factor::Gaussian(f) => {
                f.discrete_parents.iter().for_each(|p| push(p.node));
                f.continuous_parents.iter().for_each(|id| push(*id));
                for row in &f.rows {
                    row.intercept.node().into_iter().for_each(&mut push);
                    row.coefficients
                        .iter()
                        .filter_map(|c| c.node())
                        .for_each(&mut push);
                    row.precision.node().into_iter().for_each(&mut push);
                }
            }
            Factor::DirichletPrior { .. } | Factor::GammaPrior { .. } => {}
        }
        out
    }

    /// Natural-parameter message to the owner.
    pub fn self_message<S: MomentSource + ?Sized>(&self, src: &S) -> Vec<f64> {
        match self {
            Factor::Categorical(f) => f.self_message(src),
            Factor::Gaussian(f) => f.self_message(src),
            Factor::DirichletPrior { alpha } => alpha.iter().map(|a| a - 1.0).collect(),
            Factor::GammaPrior { shape, rate } => vec![shape - 1.0, -rate],
        }
    }

    /// Natural-parameter message to neighbour `target`.
    pub fn message_to<S: MomentSource + ?Sized>(
        &self,
        owner: NodeId,
        target: NodeId,
        src: &S,
    ) -> Vec<f64> {
        match self {
            Factor::Categorical(f) => f.message_to(src.moments(owner), target, src),
            Factor::Gaussian(f) => f.message_to(src.moments(owner), target, src),
            Factor::DirichletPrior { .. } | Factor::GammaPrior { .. } => Vec::new(),
        }
    }

    /// `E_q[ln f]` under the current moments.
    pub fn expected_log<S: MomentSource + ?Sized>(&self, owner: NodeId, src: &S) -> f64 {
        let x = src.moments(owner);
        match self {
            Factor::Categorical(f) => f.expected_log(x, src),
            Factor::Gaussian(f) => f.expected_log(x, src),
            Factor::DirichletPrior { alpha } => {
                let cross: f64 = alpha.iter().zip(x).map(|(a, l)| (a - 1.0) * l).sum();
                cross - log_multivariate_beta(alpha)
            }
            Factor::GammaPrior { shape, rate } => GammaParams {
                shape: *shape,
                rate: *rate,
            }
            .expected_log_density([x[0], x[1]]),
        }
    }
}

/// Probability of every joint configuration of the discrete parents under
/// their current q, first parent fastest. The parent at `skip` contributes
/// weight one, giving the weights conditional on its state.
fn configuration_weights<S: MomentSource + ?Sized>(
    parents: &[DiscreteParent],
    src: &S,
    skip: Option<usize>,
) -> Vec<f64> {
    let mut weights = vec![1.0];
    for (k, parent) in parents.iter().enumerate() {
        let q = src.moments(parent.node);
        let mut next = Vec::with_capacity(weights.len() * parent.states);
        for v in 0..parent.states {
            let p = if skip == Some(k) { 1.0 } else { q[v] };
            next.extend(weights.iter().map(|w| w * p));
        }
        weights = next;
    }
    weights
}

/// State of parent `k` in configuration `config`.
fn parent_state(parents: &[DiscreteParent], k: usize, config: usize) -> usize {
    let stride: usize = parents[..k].iter().map(|p| p.states).product();
    (config / stride) % parents[k].states
}

/// Per-state message to discrete parent `k` from per-row expected logs.
fn discrete_parent_message<S: MomentSource + ?Sized>(
    parents: &[DiscreteParent],
    k: usize,
    src: &S,
    row_expected_log: &[f64],
) -> Vec<f64> {
    let weights = configuration_weights(parents, src, Some(k));
    let mut out = vec![0.0; parents[k].states];
    for (c, (w, e)) in weights.iter().zip(row_expected_log).enumerate() {
        if *w != 0.0 {
            out[parent_state(parents, k, c)] += w * e;
        }
    }
    out
}

fn accumulate(total: &mut Vec<f64>, part: &[f64]) {
    if total.is_empty() {
        total.extend_from_slice(part);
    } else {
        total.iter_mut().zip(part).for_each(|(t, p)| *t += p);
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl CategoricalFactor {
    fn self_message<S: MomentSource + ?Sized>(&self, src: &S) -> Vec<f64> {
        let weights = configuration_weights(&self.discrete_parents, src, None);
        let mut out = vec![0.0; self.states];
        for (c, w) in weights.iter().enumerate() {
            if *w == 0.0 {
                continue;
            }
            let logs = self.rows[c].log_probabilities(src);
            out.iter_mut().zip(logs).for_each(|(o, l)| *o += w * l);
        }
        out
    }

    fn row_expected_logs<S: MomentSource + ?Sized>(&self, x: &[f64], src: &S) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| dot(x, row.log_probabilities(src)))
            .collect()
    }

    fn message_to<S: MomentSource + ?Sized>(&self, x: &[f64], target: NodeId, src: &S) -> Vec<f64> {
        let mut out = Vec::new();
        if let Some(k) = self.discrete_parents.iter().position(|p| p.node == target) {
            let per_row = self.row_expected_logs(x, src);
            accumulate(
                &mut out,
                &discrete_parent_message(&self.discrete_parents, k, src, &per_row),
            );
        }
        if self.rows.contains(&ProbabilityRow::Node(target)) {
            let weights = configuration_weights(&self.discrete_parents, src, None);
            for (c, row) in self.rows.iter().enumerate() {
                if *row == ProbabilityRow::Node(target) {
                    let counts = x.iter().map(|p| weights[c] * p).collect::<Vec<_>>();
                    accumulate(&mut out, &counts);
                }
            }
        }
        out
    }

    fn expected_log<S: MomentSource + ?Sized>(&self, x: &[f64], src: &S) -> f64 {
        let weights = configuration_weights(&self.discrete_parents, src, None);
        weights
            .iter()
            .zip(&self.rows)
            .filter(|(w, _)| **w != 0.0)
            .map(|(w, row)| w * dot(x, row.log_probabilities(src)))
            .sum()
    }
}

/// Expectations of one Gaussian row under the current q.
struct RowStats {
    e_tau: f64,
    e_ln_tau: f64,
    e_b: f64,
    e_beta: Vec<f64>,
    e_beta2: Vec<f64>,
    /// E[b + Σ β_j y_j]
    e_mean: f64,
    /// E[(b + Σ β_j y_j)²]
    e_mean2: f64,
}

impl RowStats {
    fn new<S: MomentSource + ?Sized>(row: &GaussianRow, ys: &[(f64, f64)], src: &S) -> Self {
        let (e_ln_tau, e_tau) = row.precision.precision_moments(src);
        let (e_b, e_b2) = row.intercept.gaussian_moments(src);
        let (e_beta, e_beta2): (Vec<f64>, Vec<f64>) = row
            .coefficients
            .iter()
            .map(|c| c.gaussian_moments(src))
            .unzip();

        let mut e_mean = e_b;
        let mut variance = e_b2 - e_b * e_b;
        for ((b1, b2), (y1, y2)) in e_beta.iter().zip(&e_beta2).zip(ys) {
            e_mean += b1 * y1;
            variance += b2 * y2 - b1 * b1 * y1 * y1;
        }
        Self {
            e_tau,
            e_ln_tau,
            e_b,
            e_beta,
            e_beta2,
            e_mean,
            e_mean2: e_mean * e_mean + variance,
        }
    }

    /// E[(x - mean)²]
    fn expected_square(&self, x: &[f64]) -> f64 {
        x[1] - 2.0 * x[0] * self.e_mean + self.e_mean2
    }

    fn expected_log(&self, x: &[f64]) -> f64 {
        0.5 * self.e_ln_tau - 0.5 * LN_2PI - 0.5 * self.e_tau * self.expected_square(x)
    }
}

impl GaussianFactor {
    fn continuous_moments<S: MomentSource + ?Sized>(&self, src: &S) -> Vec<(f64, f64)> {
        self.continuous_parents
            .iter()
            .map(|id| {
                let m = src.moments(*id);
                (m[0], m[1])
            })
            .collect()
    }

    fn stats<S: MomentSource + ?Sized>(&self, src: &S) -> (Vec<(f64, f64)>, Vec<RowStats>) {
        let ys = self.continuous_moments(src);
        let stats = self.rows.iter().map(|r| RowStats::new(r, &ys, src)).collect();
        (ys, stats)
    }

    fn self_message<S: MomentSource + ?Sized>(&self, src: &S) -> Vec<f64> {
        let weights = configuration_weights(&self.discrete_parents, src, None);
        let (_, stats) = self.stats(src);
        let mut out = vec![0.0, 0.0];
        for (w, s) in weights.iter().zip(&stats) {
            out[0] += w * s.e_tau * s.e_mean;
            out[1] -= w * s.e_tau * 0.5;
        }
        out
    }

    fn message_to<S: MomentSource + ?Sized>(&self, x: &[f64], target: NodeId, src: &S) -> Vec<f64> {
        let (ys, stats) = self.stats(src);
        let mut out = Vec::new();

        if let Some(k) = self.discrete_parents.iter().position(|p| p.node == target) {
            let per_row = stats.iter().map(|s| s.expected_log(x)).collect::<Vec<_>>();
            accumulate(
                &mut out,
                &discrete_parent_message(&self.discrete_parents, k, src, &per_row),
            );
            return out;
        }

        let weights = configuration_weights(&self.discrete_parents, src, None);

        if let Some(j) = self.continuous_parents.iter().position(|id| *id == target) {
            let mut m = [0.0, 0.0];
            for (w, s) in weights.iter().zip(&stats) {
                let residual = x[0] - s.e_mean + s.e_beta[j] * ys[j].0;
                m[0] += w * s.e_tau * s.e_beta[j] * residual;
                m[1] -= w * 0.5 * s.e_tau * s.e_beta2[j];
            }
            accumulate(&mut out, &m);
        }

        for ((row, s), w) in self.rows.iter().zip(&stats).zip(&weights) {
            if row.intercept == Scalar::Node(target) {
                let residual = x[0] - s.e_mean + s.e_b;
                accumulate(&mut out, &[w * s.e_tau * residual, -w * 0.5 * s.e_tau]);
            }
            for (j, coef) in row.coefficients.iter().enumerate() {
                if *coef == Scalar::Node(target) {
                    let (y1, y2) = ys[j];
                    let residual = x[0] - s.e_mean + s.e_beta[j] * y1;
                    accumulate(&mut out, &[w * s.e_tau * y1 * residual, -w * 0.5 * s.e_tau * y2]);
                }
            }
            if row.precision == Scalar::Node(target) {
                accumulate(&mut out, &[w * 0.5, -w * 0.5 * s.expected_square(x)]);
            }
        }
        out
    }

    fn expected_log<S: MomentSource + ?Sized>(&self, x: &[f64], src: &S) -> f64 {
        let weights = configuration_weights(&self.discrete_parents, src, None);
        let (_, stats) = self.stats(src);
        weights
            .iter()
            .zip(&stats)
            .filter(|(w, _)| **w != 0.0)
            .map(|(w, s)| w * s.expected_log(x))
            .sum()
    }
}
