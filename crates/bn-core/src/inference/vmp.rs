//! Variational message passing engine.
//!
//! Lifecycle: `Uninitialized` → `Compiling` → `Converged` or
//! `MaxIterationsReached`. Posteriors and the ELBO are only readable in a
//! terminal state; [`VmpEngine::reset`] returns to `Uninitialized`.

use bn_common::{Error, NodeId, Result, RunId, VariableId};
use bn_config::{validate_inference, InferenceConfig, Initialization, UpdateSchedule};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::expfamily::{EfModel, Family};
use crate::inference::message::MessageBuffer;
use crate::inference::node::Node;
use crate::inference::posterior::Posterior;
use crate::inference::schedule::{self, Pass};
use crate::logging::{event_names, LogContext, Stage};
use crate::model::{Assignment, BayesianNetwork};
use crate::{config_error, log_event};

/// Engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Uninitialized,
    Compiling,
    Converged,
    MaxIterationsReached,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Converged | EngineState::MaxIterationsReached)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Compiling => "compiling",
            EngineState::Converged => "converged",
            EngineState::MaxIterationsReached => "max_iterations_reached",
        };
        write!(f, "{}", s)
    }
}

/// Summary of one `compile_model` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceReport {
    pub run_id: RunId,
    pub state: EngineState,
    pub rounds: usize,
    pub elbo: f64,
    /// ELBO after every completed round.
    pub elbo_trace: Vec<f64>,
    pub nodes: usize,
    pub observed_nodes: usize,
    /// SHA-256 of the canonical engine configuration.
    pub config_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Variational message passing over an [`EfModel`].
#[derive(Debug)]
pub struct VmpEngine {
    model: EfModel,
    config: InferenceConfig,
    evidence: Assignment,
    nodes: Vec<Node>,
    state: EngineState,
    report: Option<InferenceReport>,
}

impl VmpEngine {
    pub fn new(model: EfModel, config: InferenceConfig) -> Result<Self> {
        validate_inference(&config).map_err(config_error)?;
        Ok(Self {
            model,
            config,
            evidence: Assignment::new(),
            nodes: Vec::new(),
            state: EngineState::Uninitialized,
            report: None,
        })
    }

    /// Engine over the exponential-family form of a network.
    pub fn from_network(network: &BayesianNetwork, config: InferenceConfig) -> Result<Self> {
        Self::new(EfModel::from_network(network)?, config)
    }

    pub fn model(&self) -> &EfModel {
        &self.model
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn evidence(&self) -> &Assignment {
        &self.evidence
    }

    /// Report of the last completed run.
    pub fn report(&self) -> Option<&InferenceReport> {
        self.report.as_ref()
    }

    /// Replace the evidence used by the next `compile_model`.
    pub fn set_evidence(&mut self, evidence: Assignment) -> Result<()> {
        if self.state != EngineState::Uninitialized {
            return Err(Error::InferenceState(format!(
                "cannot set evidence while {}; call reset() first",
                self.state
            )));
        }
        evidence.validate(self.model.variables())?;
        for (var, _) in evidence.iter() {
            if self.model.node_for(var).is_none() {
                return Err(Error::InvalidEvidence {
                    variable: self.model.variables().name_of(var),
                    reason: "variable has no node in this model".to_string(),
                });
            }
        }
        self.evidence = evidence;
        Ok(())
    }

    /// Run message passing until convergence or the iteration cap.
    pub fn compile_model(&mut self) -> Result<InferenceReport> {
        if self.state != EngineState::Uninitialized {
            return Err(Error::InferenceState(format!(
                "engine is {}; call reset() before compiling again",
                self.state
            )));
        }
        self.state = EngineState::Compiling;
        match self.run() {
            Ok(report) => {
                self.state = report.state;
                self.report = Some(report.clone());
                Ok(report)
            }
            Err(err) => {
                self.state = EngineState::Uninitialized;
                self.nodes.clear();
                Err(err)
            }
        }
    }

    /// Drop posteriors and return to `Uninitialized`. Evidence is kept.
    pub fn reset(&mut self) {
        self.state = EngineState::Uninitialized;
        self.nodes.clear();
        self.report = None;
    }

    /// Evidence lower bound of the last run.
    pub fn elbo(&self) -> Result<f64> {
        self.require_terminal("ELBO")?;
        self.report
            .as_ref()
            .map(|r| r.elbo)
            .ok_or_else(|| Error::InferenceState("no completed run".to_string()))
    }

    /// Posterior of a network variable.
    pub fn posterior(&self, var: VariableId) -> Result<Posterior> {
        self.model.variables().variable(var)?;
        let node = self.model.node_for(var).ok_or_else(|| {
            Error::UnknownVariable(format!("{} has no node in this model", var))
        })?;
        self.node_posterior(node)
    }

    /// Posterior of any node, including parameter and replicated nodes.
    pub fn node_posterior(&self, node: NodeId) -> Result<Posterior> {
        self.require_terminal("posterior")?;
        self.nodes
            .get(node.index())
            .ok_or_else(|| Error::UnknownVariable(format!("node {}", node)))?
            .posterior()
    }

    /// Runtime nodes of the last run; empty before compiling.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn require_terminal(&self, what: &str) -> Result<()> {
        if self.state.is_terminal() {
            Ok(())
        } else {
            Err(Error::InferenceState(format!(
                "{} is only available after compile_model (engine is {})",
                what, self.state
            )))
        }
    }

    fn run(&mut self) -> Result<InferenceReport> {
        let run_id = RunId::new();
        let ctx = LogContext::new(&run_id, self.config.schedule);
        let started_at = Utc::now();

        self.initialize()?;
        let pinned: Vec<bool> = self.nodes.iter().map(Node::is_pinned).collect();
        let passes = match self.config.schedule {
            UpdateSchedule::Synchronous => schedule::synchronous(&self.model, &pinned),
            UpdateSchedule::Colored => schedule::colored(&self.model, &pinned),
        };
        let observed_nodes = pinned.iter().filter(|p| **p).count();
        let parallel = self.config.parallel && cfg!(feature = "parallel");

        log_event!(
            ctx,
            INFO,
            event_names::VMP_COMPILE_STARTED,
            Stage::Compile,
            "starting message passing",
            nodes = self.nodes.len(),
            observed = observed_nodes,
            passes_per_round = passes.len(),
            parallel = parallel
        );

        let threshold = self.config.convergence_threshold;
        let cap = self.config.max_local_iterations;
        let mut trace: Vec<f64> = Vec::new();
        let mut state = EngineState::MaxIterationsReached;

        for round in 1..=self.config.max_iterations {
            for pass in &passes {
                run_pass(&mut self.nodes, pass, parallel)?;
            }

            let elbo = total_elbo(&self.nodes, parallel);
            if !elbo.is_finite() {
                return Err(Error::NumericalInstability(format!(
                    "ELBO is {} after round {}",
                    elbo, round
                )));
            }
            let active = self.nodes.iter().filter(|n| !n.is_done(threshold, cap)).count();
            log_event!(
                ctx,
                DEBUG,
                event_names::VMP_ROUND_COMPLETED,
                Stage::Round,
                "round completed",
                round = round,
                elbo = elbo,
                active_nodes = active
            );

            let previous = trace.last().copied();
            if let Some(prev) = previous {
                let slack = 1e-9 * prev.abs().max(1.0);
                if self.config.schedule == UpdateSchedule::Colored && elbo < prev - slack {
                    log_event!(
                        ctx,
                        WARN,
                        event_names::VMP_ELBO_DECREASED,
                        Stage::Round,
                        "ELBO decreased",
                        round = round,
                        previous = prev,
                        elbo = elbo
                    );
                }
            }
            trace.push(elbo);

            let elbo_settled = self.config.test_elbo
                && previous.is_some_and(|prev| (elbo - prev).abs() < threshold);
            if active == 0 || elbo_settled {
                state = EngineState::Converged;
                break;
            }
        }

        let rounds = trace.len();
        let elbo = trace.last().copied().unwrap_or(f64::NAN);
        match state {
            EngineState::Converged => log_event!(
                ctx,
                INFO,
                event_names::VMP_CONVERGED,
                Stage::Round,
                "message passing converged",
                rounds = rounds,
                elbo = elbo
            ),
            _ => log_event!(
                ctx,
                WARN,
                event_names::VMP_MAX_ITERATIONS,
                Stage::Round,
                "iteration cap reached before convergence",
                rounds = rounds,
                elbo = elbo
            ),
        }

        Ok(InferenceReport {
            run_id,
            state,
            rounds,
            elbo,
            elbo_trace: trace,
            nodes: self.nodes.len(),
            observed_nodes,
            config_hash: bn_config::snapshot::fingerprint(&self.config),
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Build runtime nodes, pin evidence and set starting parameters.
    fn initialize(&mut self) -> Result<()> {
        self.nodes = self
            .model
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, spec)| Node::from_spec(NodeId(i), spec))
            .collect();

        for (i, spec) in self.model.nodes().iter().enumerate() {
            if let Some(value) = spec.observed {
                self.nodes[i].pin(value)?;
            }
        }
        for (var, value) in self.evidence.iter() {
            if let Some(id) = self.model.node_for(var) {
                self.nodes[id.index()].pin(value)?;
            }
        }

        let mut rng = match self.config.initialization {
            Initialization::Forward => None,
            Initialization::Random => Some(StdRng::seed_from_u64(
                self.config.seed.unwrap_or_else(rand::random),
            )),
        };

        // Arena order is topological, so forward initialisation sees
        // initialised parents.
        for i in 0..self.nodes.len() {
            if self.nodes[i].is_pinned() {
                continue;
            }
            let natural = match (self.nodes[i].family(), rng.as_mut()) {
                (Family::Categorical { states }, Some(rng)) => random_categorical(rng, states),
                _ => self.nodes[i].factor().self_message(self.nodes.as_slice()),
            };
            self.nodes[i].initialize(natural)?;
        }
        Ok(())
    }
}

/// Log-probabilities of a draw from a flat Dirichlet.
fn random_categorical(rng: &mut StdRng, states: usize) -> Vec<f64> {
    let draws: Vec<f64> = (0..states)
        .map(|_| -(1.0 - rng.random::<f64>()).ln())
        .collect();
    let total: f64 = draws.iter().sum();
    draws
        .iter()
        .map(|d| bn_math::ln_clamped(d / total))
        .collect()
}

/// Read phase then write phase; no node changes until all messages exist.
fn run_pass(nodes: &mut [Node], pass: &Pass, parallel: bool) -> Result<()> {
    let buffer = collect_messages(nodes, pass, parallel);
    apply_messages(nodes, &buffer, parallel)
}

fn collect_messages(nodes: &[Node], pass: &Pass, parallel: bool) -> MessageBuffer {
    let accepts = pass.accepts.as_slice();

    #[cfg(feature = "parallel")]
    if parallel {
        return pass
            .senders
            .par_iter()
            .fold(MessageBuffer::new, |mut buffer, id| {
                buffer.extend(nodes[id.index()].messages_where(nodes, |t| accepts[t.index()]));
                buffer
            })
            .reduce(MessageBuffer::new, MessageBuffer::merge);
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    let mut buffer = MessageBuffer::new();
    for id in &pass.senders {
        buffer.extend(nodes[id.index()].messages_where(nodes, |t| accepts[t.index()]));
    }
    buffer
}

fn apply_messages(nodes: &mut [Node], buffer: &MessageBuffer, parallel: bool) -> Result<()> {
    let apply = |node: &mut Node| match buffer.get(node.id()) {
        Some(natural) => node.update_combined_message(natural),
        None => Ok(()),
    };

    #[cfg(feature = "parallel")]
    if parallel {
        return nodes.par_iter_mut().try_for_each(apply);
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    nodes.iter_mut().try_for_each(apply)
}

fn total_elbo(nodes: &[Node], parallel: bool) -> f64 {
    #[cfg(feature = "parallel")]
    if parallel {
        return nodes.par_iter().map(|n| n.compute_elbo(nodes)).sum();
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    nodes.iter().map(|n| n.compute_elbo(nodes)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Dag;
    use crate::model::{ConditionalDistribution, Value};
    use crate::variables::VariablesBuilder;

    fn two_node() -> BayesianNetwork {
        let mut vb = VariablesBuilder::new();
        let a = vb.new_multinomial("A", 2).unwrap();
        let b = vb.new_multinomial("B", 2).unwrap();
        let mut dag = Dag::new(vb.build());
        dag.add_parent(b, a).unwrap();
        let mut bn = BayesianNetwork::new(dag.seal().unwrap()).unwrap();
        bn.set_distribution(
            a,
            ConditionalDistribution::Multinomial {
                rows: vec![vec![0.3, 0.7]],
            },
        )
        .unwrap();
        bn.set_distribution(
            b,
            ConditionalDistribution::Multinomial {
                rows: vec![vec![0.9, 0.1], vec![0.2, 0.8]],
            },
        )
        .unwrap();
        bn
    }

    #[test]
    fn test_state_machine() {
        let bn = two_node();
        let mut engine = VmpEngine::from_network(&bn, InferenceConfig::new(50)).unwrap();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(matches!(
            engine.posterior(VariableId(0)),
            Err(Error::InferenceState(_))
        ));
        assert!(engine.elbo().is_err());

        let report = engine.compile_model().unwrap();
        assert!(report.state.is_terminal());
        assert_eq!(engine.state(), report.state);
        assert_eq!(report.elbo_trace.len(), report.rounds);

        assert!(matches!(engine.compile_model(), Err(Error::InferenceState(_))));
        assert!(matches!(
            engine.set_evidence(Assignment::new()),
            Err(Error::InferenceState(_))
        ));

        engine.reset();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(engine.report().is_none());
        engine.compile_model().unwrap();
    }

    #[test]
    fn test_fixed_point_without_evidence() {
        let bn = two_node();
        let mut engine = VmpEngine::from_network(&bn, InferenceConfig::new(200)).unwrap();
        engine.compile_model().unwrap();
        let qa = engine.posterior(VariableId(0)).unwrap();
        let qa = qa.probabilities().unwrap().to_vec();
        let qb = engine.posterior(VariableId(1)).unwrap();
        let qb = qb.probabilities().unwrap().to_vec();
        assert!((qa.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        // q(B) is proportional to exp(E_q(A)[ln p(B | A)]).
        let cpt = [[0.9f64, 0.1], [0.2, 0.8]];
        let logits: Vec<f64> = (0..2)
            .map(|b| qa[0] * cpt[0][b].ln() + qa[1] * cpt[1][b].ln())
            .collect();
        let expected = bn_math::normalize_log_probs(&logits);
        assert!((qb[0] - expected[0]).abs() < 1e-4);

        // Nothing observed: the bound cannot exceed ln 1.
        assert!(engine.elbo().unwrap() <= 1e-9);
    }

    #[test]
    fn test_evidence_is_pinned_and_validated() {
        let bn = two_node();
        let mut engine = VmpEngine::from_network(&bn, InferenceConfig::new(100)).unwrap();
        assert!(engine
            .set_evidence(Assignment::new().with(VariableId(1), Value::State(5)))
            .is_err());
        assert!(engine
            .set_evidence(Assignment::new().with(VariableId(9), Value::State(0)))
            .is_err());

        engine
            .set_evidence(Assignment::new().with(VariableId(1), Value::State(1)))
            .unwrap();
        engine.compile_model().unwrap();
        assert_eq!(
            engine.posterior(VariableId(1)).unwrap(),
            Posterior::Observed {
                value: Value::State(1)
            }
        );
        // Single free node: exact posterior P(A | B = 1).
        let pa = engine.posterior(VariableId(0)).unwrap();
        let pa = pa.probabilities().unwrap();
        let joint0 = 0.3 * 0.1;
        let joint1 = 0.7 * 0.8;
        assert!((pa[0] - joint0 / (joint0 + joint1)).abs() < 1e-6);
        let elbo = engine.elbo().unwrap();
        assert!((elbo - (joint0 + joint1).ln()).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bn = two_node();
        let config = InferenceConfig::new(10).with_threshold(-1.0);
        assert!(matches!(
            VmpEngine::from_network(&bn, config),
            Err(Error::InvalidConfigValue { .. })
        ));
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let bn = two_node();
        let evidence = Assignment::new().with(VariableId(1), Value::State(0));
        let mut results = Vec::new();
        for parallel in [false, true] {
            let config = InferenceConfig::new(100).with_parallel(parallel);
            let mut engine = VmpEngine::from_network(&bn, config).unwrap();
            engine.set_evidence(evidence.clone()).unwrap();
            results.push(engine.compile_model().unwrap().elbo);
        }
        assert!((results[0] - results[1]).abs() < 1e-9);
    }
}
