//! Configuration snapshots for run reports and reproducibility.
//!
//! A snapshot captures the exact engine configuration used by a run so
//! that results can be audited and reproduced later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::inference::{InferenceConfig, Initialization, UpdateSchedule};
use crate::resolve::{ConfigPaths, ConfigSource};

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Path the configuration was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// Source of the configuration.
    pub source: String,

    /// SHA-256 of the canonical JSON form of the configuration.
    pub hash: String,

    pub summary: ConfigSummary,
}

/// Key configuration values for quick reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub max_iterations: usize,
    pub convergence_threshold: f64,
    pub test_elbo: bool,
    pub schedule: UpdateSchedule,
    pub initialization: Initialization,
}

impl ConfigSnapshot {
    /// Capture a configuration together with where it came from.
    pub fn capture(config: &InferenceConfig, paths: &ConfigPaths) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            path: paths.config.as_ref().map(|p| p.display().to_string()),
            source: paths.source.to_string(),
            hash: fingerprint(config),
            summary: ConfigSummary {
                max_iterations: config.max_iterations,
                convergence_threshold: config.convergence_threshold,
                test_elbo: config.test_elbo,
                schedule: config.schedule,
                initialization: config.initialization,
            },
        }
    }

    /// Capture a configuration built in code.
    pub fn programmatic(config: &InferenceConfig) -> Self {
        let paths = ConfigPaths {
            config: None,
            source: ConfigSource::BuiltinDefault,
        };
        Self::capture(config, &paths)
    }

    /// Serialize snapshot to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if this snapshot matches another (same config).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.hash == other.hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.hash[..12.min(self.hash.len())]
    }
}

/// Stable hash of an engine configuration.
pub fn fingerprint(config: &InferenceConfig) -> String {
    let canonical = serde_json::to_string(config).unwrap_or_default();
    hash_content(&canonical)
}

/// Hash content with SHA-256 and return hex string.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
