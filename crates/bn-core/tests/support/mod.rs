//! Shared fixtures for integration tests: a seeded ancestral sampler and
//! small ground-truth networks.

#![allow(dead_code)]

use bn_core::model::ClgRow;
use bn_core::{
    Assignment, BayesianNetwork, ConditionalDistribution, Dag, Value, VariableId,
    VariablesBuilder,
};
use bn_math::NormalParams;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Standard normal draw via Box-Muller.
pub fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn categorical(rng: &mut StdRng, probabilities: &[f64]) -> usize {
    let u = rng.random::<f64>();
    let mut acc = 0.0;
    for (i, p) in probabilities.iter().enumerate() {
        acc += p;
        if u < acc {
            return i;
        }
    }
    probabilities.len() - 1
}

/// One joint draw, parents before children.
pub fn sample(network: &BayesianNetwork, rng: &mut StdRng) -> Assignment {
    let mut out = Assignment::new();
    for &var in network.dag().topological_order() {
        let layout = network.layout(var).unwrap();
        let config = layout.configuration_of(&out).unwrap();
        let continuous: Vec<f64> = layout
            .continuous_parents()
            .iter()
            .map(|&p| out.get(p).and_then(Value::as_real).unwrap())
            .collect();
        let value = match network.distribution(var).unwrap() {
            ConditionalDistribution::Multinomial { rows } => {
                Value::State(categorical(rng, &rows[config]))
            }
            ConditionalDistribution::Normal { rows } => {
                let row = &rows[config];
                Value::Real(row.mean + row.variance.sqrt() * standard_normal(rng))
            }
            ConditionalDistribution::ConditionalLinearGaussian { rows } => {
                let row = &rows[config];
                Value::Real(row.mean(&continuous) + row.variance.sqrt() * standard_normal(rng))
            }
        };
        out.set(var, value);
    }
    out
}

pub fn sample_n(network: &BayesianNetwork, n: usize, seed: u64) -> Vec<Assignment> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| sample(network, &mut rng)).collect()
}

/// Drop one variable from every instance.
pub fn hide(data: &[Assignment], var: VariableId) -> Vec<Assignment> {
    data.iter()
        .map(|a| {
            let mut a = a.clone();
            a.remove(var);
            a
        })
        .collect()
}

/// Latent binary Z with a multinomial child X1 and a Gaussian child X2.
pub fn naive_bayes() -> BayesianNetwork {
    let mut vb = VariablesBuilder::new();
    let z = vb.new_multinomial("Z", 2).unwrap();
    let x1 = vb.new_multinomial("X1", 2).unwrap();
    let x2 = vb.new_gaussian("X2").unwrap();
    let mut dag = Dag::new(vb.build());
    dag.add_parent(x1, z).unwrap();
    dag.add_parent(x2, z).unwrap();
    let mut bn = BayesianNetwork::new(dag.seal().unwrap()).unwrap();
    bn.set_distribution(
        z,
        ConditionalDistribution::Multinomial {
            rows: vec![vec![0.4, 0.6]],
        },
    )
    .unwrap();
    bn.set_distribution(
        x1,
        ConditionalDistribution::Multinomial {
            rows: vec![vec![0.8, 0.2], vec![0.25, 0.75]],
        },
    )
    .unwrap();
    bn.set_distribution(
        x2,
        ConditionalDistribution::Normal {
            rows: vec![
                NormalParams::new(-3.0, 1.0).unwrap(),
                NormalParams::new(3.0, 1.0).unwrap(),
            ],
        },
    )
    .unwrap();
    bn
}

/// Y ~ N(1, 1); X | Y ~ N(0.5 + 2 Y, 0.25).
pub fn linear_gaussian() -> BayesianNetwork {
    let mut vb = VariablesBuilder::new();
    let y = vb.new_gaussian("Y").unwrap();
    let x = vb.new_gaussian("X").unwrap();
    let mut dag = Dag::new(vb.build());
    dag.add_parent(x, y).unwrap();
    let mut bn = BayesianNetwork::new(dag.seal().unwrap()).unwrap();
    bn.set_distribution(
        y,
        ConditionalDistribution::Normal {
            rows: vec![NormalParams::new(1.0, 1.0).unwrap()],
        },
    )
    .unwrap();
    bn.set_distribution(
        x,
        ConditionalDistribution::ConditionalLinearGaussian {
            rows: vec![ClgRow {
                intercept: 0.5,
                coefficients: vec![2.0],
                variance: 0.25,
            }],
        },
    )
    .unwrap();
    bn
}

pub fn total_variation(p: &[f64], q: &[f64]) -> f64 {
    0.5 * p.iter().zip(q).map(|(a, b)| (a - b).abs()).sum::<f64>()
}
