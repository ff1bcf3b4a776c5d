//! Bayesian network core library.
//!
//! This library provides:
//! - A variable registry sealed through a builder
//! - DAG structure with acyclicity and type checks, static and two-slice dynamic
//! - Bayesian networks with conditional distributions per parent configuration
//! - Conversion to an exponential-family factor graph
//! - A variational message passing engine with ELBO tracking
//! - Bayesian parameter learning from complete or partially observed data
//! - Structured logging for runs

pub mod dag;
pub mod dynamic;
pub mod expfamily;
pub mod inference;
pub mod learning;
pub mod logging;
pub mod model;
pub mod variables;

pub use bn_common::{Error, ErrorCategory, NodeId, Result, RunId, VariableId};
pub use bn_config::{InferenceConfig, Initialization, LearningConfig, UpdateSchedule};

pub use dag::{Dag, ParentSet, SealedDag};
pub use dynamic::{DynamicDag, UnrolledDag};
pub use expfamily::{EfModel, EfModelBuilder, Family};
pub use inference::{EngineState, InferenceReport, Posterior, VmpEngine};
pub use learning::{LearnedNetwork, ParameterLearner};
pub use model::{Assignment, BayesianNetwork, ConditionalDistribution, Value};
pub use variables::{StateSpace, Variable, Variables, VariablesBuilder};

/// Map a configuration validation failure into the shared error type.
pub(crate) fn config_error(err: bn_config::ValidationError) -> Error {
    match err {
        bn_config::ValidationError::InvalidValue { field, message } => {
            Error::InvalidConfigValue { field, message }
        }
        other => Error::Config(other.to_string()),
    }
}
