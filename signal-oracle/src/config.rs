//! Configuration for signal verification.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Consensus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Minimum independent executions for a valid verdict
    pub min_executions: usize,
    /// Per-fetch timeout (ms)
    pub fetch_timeout_ms: u64,
    /// User agent sent by HTTP fetchers
    pub user_agent: String,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            min_executions: 3,
            fetch_timeout_ms: 10_000,
            user_agent: "certlayer-signal-oracle/0.1".to_string(),
        }
    }
}

impl ConsensusConfig {
    /// Per-fetch timeout as a duration.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}
