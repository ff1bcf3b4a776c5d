//! Variational message passing.
//!
//! Each round reads every node's moments, combines the messages addressed
//! to each free node, then updates all receivers at once. The read and
//! write phases never overlap, so the sequential and the rayon paths see
//! the same snapshot and produce the same result.

pub mod message;
pub mod node;
pub mod posterior;
pub mod schedule;
pub mod vmp;

pub use message::{Message, MessageBuffer};
pub use node::Node;
pub use posterior::Posterior;
pub use vmp::{EngineState, InferenceReport, VmpEngine};
