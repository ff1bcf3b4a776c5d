//! Identity types.
//!
//! Variables and inference nodes are addressed by dense, zero-based
//! indices into arenas; runs carry a short random identifier for log
//! correlation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a variable in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableId(pub usize);

impl VariableId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<usize> for VariableId {
    fn from(index: usize) -> Self {
        VariableId(index)
    }
}

/// Index of a node in the message-passing arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identifier for one inference or learning run.
///
/// Format: `run-<12 lowercase hex>`
/// Example: `run-3f9a0c41b27e`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        RunId(format!("run-{}", &hex[..12]))
    }

    /// Parse and validate a run ID string.
    pub fn parse(s: &str) -> Option<Self> {
        let suffix = s.strip_prefix("run-")?;
        if suffix.len() != 12 {
            return None;
        }
        if !suffix.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
            return None;
        }
        Some(RunId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
