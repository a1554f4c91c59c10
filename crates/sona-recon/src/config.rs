//! # Reconciliation Configuration
//!
//! Worker tuning knobs, loadable from a TOML file:
//!
//! ```toml
//! poll_interval_secs = 5
//! batch_size = 100
//! max_attempts = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ReconError, ReconResult};

/// Stock reconciliation worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Seconds between outbox polls.
    pub poll_interval_secs: u64,

    /// Maximum outbox entries taken per poll.
    pub batch_size: u32,

    /// Attempts before an entry is skipped with a warning.
    pub max_attempts: i64,
}

impl Default for ReconConfig {
    fn default() -> Self {
        ReconConfig {
            poll_interval_secs: 5,
            batch_size: 100,
            max_attempts: 10,
        }
    }
}

impl ReconConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> ReconResult<Self> {
        toml::from_str(text).map_err(|e| ReconError::Config(e.to_string()))
    }

    /// Loads a configuration file, falling back to defaults for absent keys.
    pub fn load(path: impl AsRef<Path>) -> ReconResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ReconError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml_str(&text)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
