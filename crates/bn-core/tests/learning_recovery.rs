//! Parameter recovery from data sampled off known networks.
//!
//! Statistical regression tests: seeded samples, tolerance-based checks.

mod support;

use bn_core::{
    Assignment, ConditionalDistribution, InferenceConfig, LearningConfig, ParameterLearner,
    UpdateSchedule, Value, VariableId,
};
use bn_math::{dirichlet, DirichletParams};
use support::total_variation;

fn table(dist: &ConditionalDistribution) -> &[Vec<f64>] {
    match dist {
        ConditionalDistribution::Multinomial { rows } => rows,
        other => panic!("expected a table, got {}", other.kind_name()),
    }
}

#[test]
fn test_naive_bayes_with_latent_class() {
    let truth = support::naive_bayes();
    let (z, x1, x2) = (VariableId(0), VariableId(1), VariableId(2));
    let data = support::hide(&support::sample_n(&truth, 5000, 42), z);

    let config = LearningConfig::new(
        InferenceConfig::new(500)
            .with_schedule(UpdateSchedule::Colored)
            .with_random_init(7)
            .with_elbo_test(true),
    );
    let learned = ParameterLearner::new(config)
        .unwrap()
        .learn(truth.dag(), &data)
        .unwrap();
    assert!(learned.report.state.is_terminal());
    assert!(learned.log_marginal_probability.is_finite());

    let ConditionalDistribution::Normal { rows: gaussians } =
        learned.network.distribution(x2).unwrap()
    else {
        panic!("expected normal rows for X2");
    };
    // Latent labels are only identified up to permutation; align on X2.
    let perm: [usize; 2] = if gaussians[0].mean < gaussians[1].mean {
        [0, 1]
    } else {
        [1, 0]
    };

    let z_true = &table(truth.distribution(z).unwrap())[0];
    let z_learned = &table(learned.network.distribution(z).unwrap())[0];
    let z_aligned = [z_learned[perm[0]], z_learned[perm[1]]];
    assert!(total_variation(z_true, &z_aligned) < 0.05, "{:?}", z_learned);

    let x1_true = table(truth.distribution(x1).unwrap());
    let x1_learned = table(learned.network.distribution(x1).unwrap());
    for k in 0..2 {
        let tv = total_variation(&x1_true[k], &x1_learned[perm[k]]);
        assert!(tv < 0.05, "row {}: {:?}", k, x1_learned);
    }

    for (k, want) in [(0, -3.0), (1, 3.0)] {
        let row = &gaussians[perm[k]];
        assert!((row.mean - want).abs() < 0.15, "{:?}", gaussians);
        assert!((row.variance - 1.0).abs() < 0.15, "{:?}", gaussians);
    }
}

#[test]
fn test_latent_class_with_default_schedule() {
    let truth = support::naive_bayes();
    let (z, x2) = (VariableId(0), VariableId(2));
    let data = support::hide(&support::sample_n(&truth, 2000, 42), z);

    let config = LearningConfig::new(InferenceConfig::new(500).with_random_init(7));
    let learned = ParameterLearner::new(config)
        .unwrap()
        .learn(truth.dag(), &data)
        .unwrap();
    assert!(learned.report.state.is_terminal());
    for pair in learned.report.elbo_trace.windows(2) {
        let slack = 1e-9 * pair[0].abs().max(1.0);
        assert!(pair[1] >= pair[0] - slack, "ELBO dropped: {:?}", pair);
    }

    let ConditionalDistribution::Normal { rows: gaussians } =
        learned.network.distribution(x2).unwrap()
    else {
        panic!("expected normal rows for X2");
    };
    let mut means: Vec<f64> = gaussians.iter().map(|r| r.mean).collect();
    means.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert!((means[0] + 3.0).abs() < 0.2, "{:?}", gaussians);
    assert!((means[1] - 3.0).abs() < 0.2, "{:?}", gaussians);

    let z_learned = &table(learned.network.distribution(z).unwrap())[0];
    let mut z_sorted = z_learned.clone();
    z_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert!((z_sorted[0] - 0.4).abs() < 0.05, "{:?}", z_learned);
}

#[test]
fn test_fully_observed_tables_match_conjugate_update() {
    let truth = support::naive_bayes();
    let (z, x1) = (VariableId(0), VariableId(1));
    let data = support::sample_n(&truth, 500, 3);

    let learner = ParameterLearner::new(LearningConfig::new(
        InferenceConfig::new(100).with_threshold(1e-9),
    ))
    .unwrap();
    let learned = learner.learn(truth.dag(), &data).unwrap();

    let mut counts = [[0.0f64; 2]; 2];
    for instance in &data {
        let zi = instance.get(z).and_then(Value::as_state).unwrap();
        let xi = instance.get(x1).and_then(Value::as_state).unwrap();
        counts[zi][xi] += 1.0;
    }
    let prior = DirichletParams::uniform(2).unwrap();
    let rows = table(learned.network.distribution(x1).unwrap());
    for (zi, row) in rows.iter().enumerate() {
        let expected = dirichlet::posterior_params(&prior, &counts[zi])
            .unwrap()
            .mean();
        for (got, want) in row.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-9, "{:?} vs {:?}", row, expected);
        }
    }
}

#[test]
fn test_linear_gaussian_regression() {
    let truth = support::linear_gaussian();
    let (y, x) = (VariableId(0), VariableId(1));
    let data = support::sample_n(&truth, 2000, 11);

    let config = LearningConfig::new(
        InferenceConfig::new(500)
            .with_schedule(UpdateSchedule::Colored)
            .with_threshold(1e-4)
            .with_elbo_test(true),
    );
    let learned = ParameterLearner::new(config)
        .unwrap()
        .learn(truth.dag(), &data)
        .unwrap();

    match learned.network.distribution(x).unwrap() {
        ConditionalDistribution::ConditionalLinearGaussian { rows } => {
            assert!((rows[0].intercept - 0.5).abs() < 0.1, "{:?}", rows);
            assert!((rows[0].coefficients[0] - 2.0).abs() < 0.05, "{:?}", rows);
            assert!((rows[0].variance - 0.25).abs() < 0.03, "{:?}", rows);
        }
        other => panic!("unexpected {}", other.kind_name()),
    }
    match learned.network.distribution(y).unwrap() {
        ConditionalDistribution::Normal { rows } => {
            assert!((rows[0].mean - 1.0).abs() < 0.1);
            assert!((rows[0].variance - 1.0).abs() < 0.1);
        }
        other => panic!("unexpected {}", other.kind_name()),
    }
}

#[test]
fn test_missing_values_are_marginalised() {
    let truth = support::naive_bayes();
    let x1 = VariableId(1);
    let mut data = support::sample_n(&truth, 2000, 5);
    // Hide X1 in every third instance.
    for instance in data.iter_mut().step_by(3) {
        instance.remove(x1);
    }

    let learner = ParameterLearner::new(LearningConfig::new(
        InferenceConfig::new(300)
            .with_schedule(UpdateSchedule::Colored)
            .with_threshold(1e-6),
    ))
    .unwrap();
    let learned = learner.learn(truth.dag(), &data).unwrap();
    let x1_true = table(truth.distribution(x1).unwrap());
    let x1_learned = table(learned.network.distribution(x1).unwrap());
    for k in 0..2 {
        assert!(total_variation(&x1_true[k], &x1_learned[k]) < 0.05);
    }
    assert!(learned.network.equal_networks(&truth, 0.15));
}

#[test]
fn test_invalid_instance_rejected() {
    let truth = support::naive_bayes();
    let data = vec![Assignment::new().with(VariableId(0), Value::State(9))];
    let learner = ParameterLearner::new(LearningConfig::new(InferenceConfig::new(10))).unwrap();
    assert!(learner.learn(truth.dag(), &data).is_err());
}
