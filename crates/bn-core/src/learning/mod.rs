//! Bayesian parameter learning for a fixed structure.
//!
//! A batch of instances is expanded into a plate with shared conjugate
//! parameter nodes, the VMP engine runs over it, and the learned network
//! is read off the parameter posterior means. The final ELBO bounds the
//! log marginal likelihood of the data.

pub mod plate;

use bn_common::{Error, NodeId, Result, RunId};
use bn_config::{validate_learning, InferenceConfig, LearningConfig, UpdateSchedule};
use bn_math::NormalParams;

use crate::config_error;
use crate::dag::SealedDag;
use crate::inference::{InferenceReport, VmpEngine};
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::model::{Assignment, BayesianNetwork, ClgRow, ConditionalDistribution};

pub use plate::{ParameterNodes, Plate, RowNodes};

/// Result of a learning run.
#[derive(Debug, Clone)]
pub struct LearnedNetwork {
    pub network: BayesianNetwork,
    pub report: InferenceReport,
    /// Lower bound on `ln p(data)`.
    pub log_marginal_probability: f64,
}

#[derive(Debug, Clone)]
pub struct ParameterLearner {
    config: LearningConfig,
}

impl ParameterLearner {
    pub fn new(config: LearningConfig) -> Result<Self> {
        validate_learning(&config).map_err(config_error)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Engine settings used for the plate.
    ///
    /// The plate always runs under [`UpdateSchedule::Colored`]. A mean and
    /// its precision, or a latent copy and its CPT row, sit in each other's
    /// Markov blanket; updating both from one snapshot settles into a
    /// two-cycle instead of a fixed point.
    pub fn plate_config(&self) -> InferenceConfig {
        self.config
            .inference
            .clone()
            .with_schedule(UpdateSchedule::Colored)
    }

    /// Learn every conditional distribution of `dag` from `data`.
    /// Missing values are treated as latent.
    pub fn learn(&self, dag: &SealedDag, data: &[Assignment]) -> Result<LearnedNetwork> {
        let inference = self.plate_config();
        let run_id = RunId::new();
        let ctx = LogContext::new(&run_id, inference.schedule);
        log_event!(
            ctx,
            INFO,
            event_names::LEARN_STARTED,
            Stage::Learn,
            "building plate",
            variables = dag.variables().len(),
            instances = data.len()
        );

        let plate = Plate::build(dag, data, &self.config.priors)?;
        let parameter_nodes = plate
            .parameters
            .iter()
            .map(|p| match p {
                ParameterNodes::Multinomial { rows } => rows.len(),
                ParameterNodes::Gaussian { rows } => rows
                    .iter()
                    .map(|r| 2 + r.coefficients.len())
                    .sum::<usize>(),
            })
            .sum::<usize>();

        let mut engine = VmpEngine::new(plate.model, inference)?;
        let report = engine.compile_model()?;

        let mut network = BayesianNetwork::new(dag.clone())?;
        for variable in dag.variables() {
            let dist = match &plate.parameters[variable.id().index()] {
                ParameterNodes::Multinomial { rows } => ConditionalDistribution::Multinomial {
                    rows: rows
                        .iter()
                        .map(|&id| dirichlet_mean(&engine, id))
                        .collect::<Result<Vec<_>>>()?,
                },
                ParameterNodes::Gaussian { rows } => {
                    let layout = &plate.layouts[variable.id().index()];
                    if layout.has_continuous_parents() {
                        ConditionalDistribution::ConditionalLinearGaussian {
                            rows: rows
                                .iter()
                                .map(|r| clg_row(&engine, r))
                                .collect::<Result<Vec<_>>>()?,
                        }
                    } else {
                        ConditionalDistribution::Normal {
                            rows: rows
                                .iter()
                                .map(|r| normal_row(&engine, r))
                                .collect::<Result<Vec<_>>>()?,
                        }
                    }
                }
            };
            network.set_distribution(variable.id(), dist)?;
        }

        log_event!(
            ctx,
            INFO,
            event_names::LEARN_FINISHED,
            Stage::Learn,
            "parameters learned",
            engine_run = tracing::field::display(&report.run_id),
            state = tracing::field::display(report.state),
            rounds = report.rounds,
            parameter_nodes = parameter_nodes,
            elbo = report.elbo
        );

        Ok(LearnedNetwork {
            network,
            log_marginal_probability: report.elbo,
            report,
        })
    }
}

fn dirichlet_mean(engine: &VmpEngine, id: NodeId) -> Result<Vec<f64>> {
    engine
        .node_posterior(id)?
        .dirichlet_mean()
        .ok_or_else(|| wrong_kind(id, "Dirichlet"))
}

fn posterior_mean(engine: &VmpEngine, id: NodeId) -> Result<f64> {
    engine
        .node_posterior(id)?
        .mean()
        .ok_or_else(|| wrong_kind(id, "scalar"))
}

/// Variance read as the reciprocal of the expected precision.
fn variance(engine: &VmpEngine, row: &RowNodes) -> Result<f64> {
    let precision = posterior_mean(engine, row.precision)?;
    if precision > 0.0 && precision.is_finite() {
        Ok(1.0 / precision)
    } else {
        Err(Error::NumericalInstability(format!(
            "learned precision {} of node {}",
            precision, row.precision
        )))
    }
}

fn normal_row(engine: &VmpEngine, row: &RowNodes) -> Result<NormalParams> {
    let mean = posterior_mean(engine, row.intercept)?;
    let variance = variance(engine, row)?;
    NormalParams::new(mean, variance).ok_or_else(|| {
        Error::NumericalInstability(format!("learned normal N({}, {})", mean, variance))
    })
}

fn clg_row(engine: &VmpEngine, row: &RowNodes) -> Result<ClgRow> {
    Ok(ClgRow {
        intercept: posterior_mean(engine, row.intercept)?,
        coefficients: row
            .coefficients
            .iter()
            .map(|&b| posterior_mean(engine, b))
            .collect::<Result<Vec<_>>>()?,
        variance: variance(engine, row)?,
    })
}

fn wrong_kind(id: NodeId, expected: &str) -> Error {
    Error::NumericalInstability(format!("node {} does not hold a {} posterior", id, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Dag;
    use crate::model::Value;
    use crate::variables::VariablesBuilder;
    use bn_config::{InferenceConfig, ParameterPriors};
    use bn_math::{dirichlet, DirichletParams};

    fn learner() -> ParameterLearner {
        let config = LearningConfig::new(InferenceConfig::new(200).with_threshold(1e-9));
        ParameterLearner::new(config).unwrap()
    }

    #[test]
    fn test_plate_runs_colored_whatever_the_config_says() {
        let sync = LearningConfig::new(
            InferenceConfig::new(50).with_schedule(UpdateSchedule::Synchronous),
        );
        let plate = ParameterLearner::new(sync).unwrap().plate_config();
        assert_eq!(plate.schedule, UpdateSchedule::Colored);
        assert_eq!(plate.max_iterations, 50);
    }

    #[test]
    fn test_fully_observed_counts() {
        let mut vb = VariablesBuilder::new();
        let a = vb.new_multinomial("A", 2).unwrap();
        let b = vb.new_multinomial("B", 3).unwrap();
        let mut dag = Dag::new(vb.build());
        dag.add_parent(b, a).unwrap();
        let dag = dag.seal().unwrap();

        let rows = [(0, 0), (0, 0), (0, 2), (1, 1), (1, 1), (1, 1), (1, 0)];
        let data: Vec<Assignment> = rows
            .iter()
            .map(|&(x, y)| {
                Assignment::new()
                    .with(a, Value::State(x))
                    .with(b, Value::State(y))
            })
            .collect();

        let learned = learner().learn(&dag, &data).unwrap();
        let prior = DirichletParams::uniform(3).unwrap();
        let expected = dirichlet::posterior_params(&prior, &[2.0, 0.0, 1.0])
            .unwrap()
            .mean();
        let ConditionalDistribution::Multinomial { rows } =
            learned.network.distribution(b).unwrap()
        else {
            panic!("expected a table");
        };
        for (got, want) in rows[0].iter().zip(&expected) {
            assert!((got - want).abs() < 1e-9);
        }
        assert!(learned.log_marginal_probability < 0.0);
        assert!(learned.report.state.is_terminal());
    }

    #[test]
    fn test_gaussian_with_weak_prior() {
        let mut vb = VariablesBuilder::new();
        let x = vb.new_gaussian("X").unwrap();
        let dag = Dag::new(vb.build()).seal().unwrap();
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let data: Vec<Assignment> = values
            .iter()
            .map(|&v| Assignment::new().with(x, Value::Real(v)))
            .collect();

        let priors = ParameterPriors {
            gamma_shape: 1e-3,
            gamma_rate: 1e-3,
            ..ParameterPriors::default()
        };
        let config = LearningConfig::new(
            InferenceConfig::new(500)
                .with_threshold(1e-10)
                .with_schedule(bn_config::UpdateSchedule::Colored),
        )
        .with_priors(priors);
        let learned = ParameterLearner::new(config).unwrap().learn(&dag, &data).unwrap();
        let ConditionalDistribution::Normal { rows } = learned.network.distribution(x).unwrap() else {
            panic!("expected a normal");
        };
        assert!((rows[0].mean - 4.5).abs() < 1e-3);
        // Mean-field fixed point: v = (SS/2 + v/2) / (n/2) with SS = 42, n = 8.
        assert!((rows[0].variance - 6.0).abs() < 0.01);
    }

    #[test]
    fn test_invalid_priors_rejected() {
        let config = LearningConfig::new(InferenceConfig::new(10)).with_priors(ParameterPriors {
            dirichlet_concentration: 0.0,
            ..ParameterPriors::default()
        });
        assert!(matches!(
            ParameterLearner::new(config),
            Err(Error::InvalidConfigValue { .. })
        ));
    }
}
