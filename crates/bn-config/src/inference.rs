//! Variational message passing engine options.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::validate::ValidationResult;

/// Default absolute tolerance for per-node parameter change and ELBO delta.
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 0.001;

/// How nodes are grouped between synchronisation barriers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateSchedule {
    /// Every node reads one snapshot, then all combined messages are applied.
    #[default]
    Synchronous,
    /// Nodes with disjoint Markov blankets are updated together, one colour
    /// class per barrier.
    Colored,
}

/// How free nodes are initialised before the first round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initialization {
    /// Each node starts from its own conditional given its parents' moments.
    #[default]
    Forward,
    /// Categorical nodes start from random distributions (seeded by `seed`).
    Random,
}

/// Engine configuration.
///
/// `max_iterations` has no default: callers must choose the cap explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InferenceConfig {
    /// Maximum number of full rounds before stopping as `MaxIterationsReached`.
    pub max_iterations: usize,

    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,

    /// Also stop when the ELBO changes by less than the threshold.
    #[serde(default)]
    pub test_elbo: bool,

    #[serde(default)]
    pub schedule: UpdateSchedule,

    /// Per-node cap on updates, after which the node reports done.
    #[serde(default)]
    pub max_local_iterations: Option<usize>,

    #[serde(default)]
    pub initialization: Initialization,

    #[serde(default)]
    pub seed: Option<u64>,

    /// Use the thread pool for message computation when available.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_convergence_threshold() -> f64 {
    DEFAULT_CONVERGENCE_THRESHOLD
}

fn default_parallel() -> bool {
    true
}

impl InferenceConfig {
    /// Configuration with the given iteration cap and defaults elsewhere.
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            test_elbo: false,
            schedule: UpdateSchedule::default(),
            max_local_iterations: None,
            initialization: Initialization::default(),
            seed: None,
            parallel: default_parallel(),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn with_elbo_test(mut self, enabled: bool) -> Self {
        self.test_elbo = enabled;
        self
    }

    pub fn with_schedule(mut self, schedule: UpdateSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_max_local_iterations(mut self, cap: usize) -> Self {
        self.max_local_iterations = Some(cap);
        self
    }

    /// Random initialisation with a fixed seed.
    pub fn with_random_init(mut self, seed: u64) -> Self {
        self.initialization = Initialization::Random;
        self.seed = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load from a `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        crate::read_config_file(path)
    }

    pub fn from_toml_str(content: &str) -> ValidationResult<Self> {
        crate::parse_toml(content)
    }

    pub fn from_json_str(content: &str) -> ValidationResult<Self> {
        crate::parse_json(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_toml() {
        let cfg = InferenceConfig::from_toml_str("max_iterations = 50").unwrap();
        assert_eq!(cfg, InferenceConfig::new(50));
        assert_eq!(cfg.convergence_threshold, 0.001);
        assert!(!cfg.test_elbo);
        assert_eq!(cfg.schedule, UpdateSchedule::Synchronous);
        assert_eq!(cfg.initialization, Initialization::Forward);
        assert!(cfg.parallel);
    }

    #[test]
    fn test_max_iterations_is_required() {
        assert!(InferenceConfig::from_toml_str("test_elbo = true").is_err());
        assert!(InferenceConfig::from_json_str("{}").is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = InferenceConfig::from_toml_str("max_iterations = 5\nmax_iter = 3");
        assert!(err.is_err());
    }

    #[test]
    fn test_json_with_enums() {
        let cfg = InferenceConfig::from_json_str(
            r#"{"max_iterations": 10, "schedule": "colored", "initialization": "random", "seed": 7}"#,
        )
        .unwrap();
        assert_eq!(cfg.schedule, UpdateSchedule::Colored);
        assert_eq!(cfg.initialization, Initialization::Random);
        assert_eq!(cfg.seed, Some(7));
    }

    #[test]
    fn test_builder_methods() {
        let cfg = InferenceConfig::new(3)
            .with_threshold(1e-6)
            .with_elbo_test(true)
            .with_schedule(UpdateSchedule::Colored)
            .with_max_local_iterations(2)
            .with_random_init(11)
            .with_parallel(false);
        assert_eq!(cfg.convergence_threshold, 1e-6);
        assert!(cfg.test_elbo);
        assert_eq!(cfg.max_local_iterations, Some(2));
        assert_eq!(cfg.seed, Some(11));
        assert!(!cfg.parallel);
    }
}
