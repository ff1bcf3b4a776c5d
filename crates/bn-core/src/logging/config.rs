//! Where log output goes and how much of it there is.
//!
//! Filtering is expressed as `tracing_subscriber::EnvFilter` directives so
//! per-round engine chatter (`bn_core::inference=debug`) can be enabled
//! without turning on debug output for the whole process.
//!
//! Environment: `BNET_LOG` (a bare level or a full directive), then
//! `RUST_LOG`, and `BNET_LOG_FORMAT` (`human` | `json`).

use bn_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Directive used when nothing else is configured.
pub const DEFAULT_DIRECTIVE: &str = "bn_core=info";

/// Directive that adds one event per message-passing round.
pub const ROUND_DIRECTIVE: &str = "bn_core=info,bn_core::inference=debug";

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line, fields flattened.
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "pretty" => Ok(LogFormat::Human),
            "json" | "jsonl" => Ok(LogFormat::Json),
            other => Err(Error::InvalidConfigValue {
                field: "log_format".to_string(),
                message: format!("expected human or json, got {:?}", other),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Human => "human",
            LogFormat::Json => "json",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive string.
    pub directive: String,
    /// Prefix human output with timestamps. JSON output always has them.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            directive: DEFAULT_DIRECTIVE.to_string(),
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Resolve from the process environment. Malformed values fall back to
    /// the defaults rather than failing, so logging never blocks a run.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = LogConfig::default();
        if let Some(value) = get("BNET_LOG").or_else(|| get("RUST_LOG")) {
            config.directive = directive_for(&value);
        }
        if let Some(format) = get("BNET_LOG_FORMAT").and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        config
    }

    /// Also emit a debug event per message-passing round.
    pub fn with_rounds(mut self) -> Self {
        self.directive = ROUND_DIRECTIVE.to_string();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = directive.into();
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }
}

/// A bare level scopes to this crate; anything else is passed through.
fn directive_for(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        DEFAULT_DIRECTIVE.to_string()
    } else if LEVELS.contains(&value.to_ascii_lowercase().as_str()) {
        format!("bn_core={}", value.to_ascii_lowercase())
    } else {
        value.to_string()
    }
}
