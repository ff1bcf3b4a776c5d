//! Event vocabulary shared by the engine and the learner.
//!
//! Every event carries the run id, the stage and the update schedule so a
//! JSON log of several interleaved runs can be split back apart.

use bn_common::RunId;
use bn_config::UpdateSchedule;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phases of building and running a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Variable registry and DAG construction.
    Structure,
    /// Conversion to nodes and initialisation.
    Compile,
    /// Message-passing rounds.
    Round,
    /// Parameter learning driver.
    Learn,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Structure => "structure",
            Stage::Compile => "compile",
            Stage::Round => "round",
            Stage::Learn => "learn",
        })
    }
}

/// Stable event names. Changing one is a breaking change for log consumers.
pub mod event_names {
    pub const DAG_SEALED: &str = "dag.sealed";

    pub const VMP_COMPILE_STARTED: &str = "vmp.compile_started";
    pub const VMP_ROUND_COMPLETED: &str = "vmp.round_completed";
    pub const VMP_CONVERGED: &str = "vmp.converged";
    pub const VMP_MAX_ITERATIONS: &str = "vmp.max_iterations";
    pub const VMP_ELBO_DECREASED: &str = "vmp.elbo_decreased";

    pub const LEARN_STARTED: &str = "learn.started";
    pub const LEARN_FINISHED: &str = "learn.finished";

    /// Every name above, for consumers that validate their filters.
    pub const ALL: &[&str] = &[
        DAG_SEALED,
        VMP_COMPILE_STARTED,
        VMP_ROUND_COMPLETED,
        VMP_CONVERGED,
        VMP_MAX_ITERATIONS,
        VMP_ELBO_DECREASED,
        LEARN_STARTED,
        LEARN_FINISHED,
    ];
}

/// Fields stamped on every event of one run by [`crate::log_event!`].
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub schedule: &'static str,
}

impl LogContext {
    pub fn new(run_id: &RunId, schedule: UpdateSchedule) -> Self {
        LogContext {
            run_id: run_id.as_str().to_string(),
            schedule: schedule_name(schedule),
        }
    }
}

fn schedule_name(schedule: UpdateSchedule) -> &'static str {
    match schedule {
        UpdateSchedule::Synchronous => "synchronous",
        UpdateSchedule::Colored => "colored",
    }
}
